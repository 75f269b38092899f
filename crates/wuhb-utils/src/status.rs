//! Status codes exposed to callers
//!
//! [`Status`] is the closed public enumeration (success included) with the
//! integer values C callers see. [`WuhbError`] is the same set minus success,
//! used as the error half of every [`WuhbResult`].

use std::ffi::CStr;

/// Public status enumeration.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    /// Call succeeded
    Success = 0,
    /// The system module could not be acquired
    ModuleNotFound = -1,
    /// The module lacks the mandatory version export
    ModuleMissingExport = -2,
    /// The module's version could not be determined
    UnsupportedVersion = -3,
    /// An argument was rejected
    InvalidArgument = -10,
    /// Allocation failed (locally or in the module)
    NoMemory = -11,
    /// A bundle is already mounted under that name
    MountNameTaken = -12,
    /// No bundle is mounted under that name
    MountNotFound = -13,
    /// The file does not exist
    FileNotFound = -14,
    /// The handle is not open
    FileHandleNotFound = -15,
    /// The bundle could not be mounted
    MountFailed = -16,
    /// The library has not been initialized
    LibUninitialized = -20,
    /// The loaded module does not provide this command
    UnsupportedCommand = -21,
    /// Anything without a more specific diagnosis
    UnknownError = -1000,
}

impl Status {
    /// Every status, in declaration order.
    pub const ALL: [Status; 14] = [
        Status::Success,
        Status::ModuleNotFound,
        Status::ModuleMissingExport,
        Status::UnsupportedVersion,
        Status::InvalidArgument,
        Status::NoMemory,
        Status::MountNameTaken,
        Status::MountNotFound,
        Status::FileNotFound,
        Status::FileHandleNotFound,
        Status::MountFailed,
        Status::LibUninitialized,
        Status::UnsupportedCommand,
        Status::UnknownError,
    ];

    /// Integer value of this status.
    pub fn code(self) -> i32 {
        self as i32
    }

    /// Decode an integer; anything unrecognized is [`Status::UnknownError`].
    pub fn from_code(code: i32) -> Status {
        Status::ALL
            .into_iter()
            .find(|status| status.code() == code)
            .unwrap_or(Status::UnknownError)
    }

    /// Stable label, NUL-terminated for C callers.
    pub fn as_cstr(self) -> &'static CStr {
        match self {
            Status::Success => c"WUHB_UTILS_RESULT_SUCCESS",
            Status::ModuleNotFound => c"WUHB_UTILS_RESULT_MODULE_NOT_FOUND",
            Status::ModuleMissingExport => c"WUHB_UTILS_RESULT_MODULE_MISSING_EXPORT",
            Status::UnsupportedVersion => c"WUHB_UTILS_RESULT_UNSUPPORTED_VERSION",
            Status::InvalidArgument => c"WUHB_UTILS_RESULT_INVALID_ARGUMENT",
            Status::NoMemory => c"WUHB_UTILS_RESULT_NO_MEMORY",
            Status::MountNameTaken => c"WUHB_UTILS_RESULT_MOUNT_NAME_TAKEN",
            Status::MountNotFound => c"WUHB_UTILS_RESULT_MOUNT_NOT_FOUND",
            Status::FileNotFound => c"WUHB_UTILS_RESULT_FILE_NOT_FOUND",
            Status::FileHandleNotFound => c"WUHB_UTILS_RESULT_FILE_HANDLE_NOT_FOUND",
            Status::MountFailed => c"WUHB_UTILS_RESULT_MOUNT_FAILED",
            Status::LibUninitialized => c"WUHB_UTILS_RESULT_LIB_UNINITIALIZED",
            Status::UnsupportedCommand => c"WUHB_UTILS_RESULT_UNSUPPORTED_COMMAND",
            Status::UnknownError => c"WUHB_UTILS_RESULT_UNKNOWN_ERROR",
        }
    }

    /// Stable label.
    pub fn as_str(self) -> &'static str {
        // Labels are ASCII literals.
        self.as_cstr()
            .to_str()
            .unwrap_or("WUHB_UTILS_RESULT_UNKNOWN_ERROR")
    }

    /// Convert to a `Result`, mapping success to `Ok(())`.
    pub fn into_result(self) -> WuhbResult<()> {
        match WuhbError::from_status(self) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Label for a raw status code.
pub fn status_str(code: i32) -> &'static str {
    Status::from_code(code).as_str()
}

// ============================================================================
// Error Type
// ============================================================================

/// Result type for every facade call
pub type WuhbResult<T> = Result<T, WuhbError>;

/// Failure half of [`Status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, thiserror::Error)]
pub enum WuhbError {
    /// The system module could not be acquired
    #[error("module not found")]
    ModuleNotFound,
    /// The module lacks the mandatory version export
    #[error("module is missing a required export")]
    ModuleMissingExport,
    /// The module's version could not be determined
    #[error("unsupported module version")]
    UnsupportedVersion,
    /// An argument was rejected
    #[error("invalid argument")]
    InvalidArgument,
    /// Allocation failed
    #[error("out of memory")]
    NoMemory,
    /// A bundle is already mounted under that name
    #[error("mount name already taken")]
    MountNameTaken,
    /// No bundle is mounted under that name
    #[error("mount not found")]
    MountNotFound,
    /// The file does not exist
    #[error("file not found")]
    FileNotFound,
    /// The handle is not open
    #[error("file handle not found")]
    FileHandleNotFound,
    /// The bundle could not be mounted
    #[error("mount failed")]
    MountFailed,
    /// The library has not been initialized
    #[error("library is not initialized")]
    LibUninitialized,
    /// The loaded module does not provide this command
    #[error("command not supported by the loaded module")]
    UnsupportedCommand,
    /// Anything without a more specific diagnosis
    #[error("unknown error")]
    UnknownError,
}

impl WuhbError {
    /// Public status for this error.
    pub fn status(self) -> Status {
        match self {
            WuhbError::ModuleNotFound => Status::ModuleNotFound,
            WuhbError::ModuleMissingExport => Status::ModuleMissingExport,
            WuhbError::UnsupportedVersion => Status::UnsupportedVersion,
            WuhbError::InvalidArgument => Status::InvalidArgument,
            WuhbError::NoMemory => Status::NoMemory,
            WuhbError::MountNameTaken => Status::MountNameTaken,
            WuhbError::MountNotFound => Status::MountNotFound,
            WuhbError::FileNotFound => Status::FileNotFound,
            WuhbError::FileHandleNotFound => Status::FileHandleNotFound,
            WuhbError::MountFailed => Status::MountFailed,
            WuhbError::LibUninitialized => Status::LibUninitialized,
            WuhbError::UnsupportedCommand => Status::UnsupportedCommand,
            WuhbError::UnknownError => Status::UnknownError,
        }
    }

    /// Inverse of [`WuhbError::status`]; `None` for success.
    pub fn from_status(status: Status) -> Option<WuhbError> {
        Some(match status {
            Status::Success => return None,
            Status::ModuleNotFound => WuhbError::ModuleNotFound,
            Status::ModuleMissingExport => WuhbError::ModuleMissingExport,
            Status::UnsupportedVersion => WuhbError::UnsupportedVersion,
            Status::InvalidArgument => WuhbError::InvalidArgument,
            Status::NoMemory => WuhbError::NoMemory,
            Status::MountNameTaken => WuhbError::MountNameTaken,
            Status::MountNotFound => WuhbError::MountNotFound,
            Status::FileNotFound => WuhbError::FileNotFound,
            Status::FileHandleNotFound => WuhbError::FileHandleNotFound,
            Status::MountFailed => WuhbError::MountFailed,
            Status::LibUninitialized => WuhbError::LibUninitialized,
            Status::UnsupportedCommand => WuhbError::UnsupportedCommand,
            Status::UnknownError => WuhbError::UnknownError,
        })
    }
}

impl From<WuhbError> for Status {
    fn from(err: WuhbError) -> Self {
        err.status()
    }
}

impl<T> From<&WuhbResult<T>> for Status {
    fn from(result: &WuhbResult<T>) -> Self {
        match result {
            Ok(_) => Status::Success,
            Err(err) => err.status(),
        }
    }
}
