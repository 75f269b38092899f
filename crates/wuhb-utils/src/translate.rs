//! Per-operation translation of module error codes
//!
//! Each facade operation accepts only the module codes it documents. The same
//! module code can be meaningful for one operation and meaningless for
//! another; anything outside an operation's table is reported as
//! [`WuhbError::UnknownError`].

use wuhb_utils_abi::{ApiError, RawApiError};

use crate::binder::Capability;
use crate::status::{WuhbError, WuhbResult};

/// A forwarded facade operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Version query
    GetVersion,
    /// Mount a bundle
    MountBundle,
    /// Unmount a bundle
    UnmountBundle,
    /// Open a file
    FileOpen,
    /// Read from a handle
    FileRead,
    /// Close a handle
    FileClose,
    /// Existence check
    FileExists,
    /// RPX payload lookup
    GetRpxInfo,
}

const GET_VERSION: &[(ApiError, WuhbError)] = &[(ApiError::InvalidArg, WuhbError::InvalidArgument)];

const MOUNT_BUNDLE: &[(ApiError, WuhbError)] = &[
    (ApiError::InvalidArg, WuhbError::InvalidArgument),
    (ApiError::MountNameTaken, WuhbError::MountNameTaken),
];

const UNMOUNT_BUNDLE: &[(ApiError, WuhbError)] = &[
    (ApiError::InvalidArg, WuhbError::InvalidArgument),
    (ApiError::MountNotFound, WuhbError::MountNotFound),
];

const FILE_OPEN: &[(ApiError, WuhbError)] = &[
    (ApiError::InvalidArg, WuhbError::InvalidArgument),
    (ApiError::FileNotFound, WuhbError::FileNotFound),
    (ApiError::NoMemory, WuhbError::NoMemory),
];

const FILE_READ: &[(ApiError, WuhbError)] = &[
    (ApiError::InvalidArg, WuhbError::InvalidArgument),
    (ApiError::FileHandleNotFound, WuhbError::FileHandleNotFound),
];

const FILE_CLOSE: &[(ApiError, WuhbError)] =
    &[(ApiError::FileHandleNotFound, WuhbError::FileHandleNotFound)];

const FILE_EXISTS: &[(ApiError, WuhbError)] = &[(ApiError::InvalidArg, WuhbError::InvalidArgument)];

const GET_RPX_INFO: &[(ApiError, WuhbError)] = &[
    (ApiError::InvalidArg, WuhbError::InvalidArgument),
    (ApiError::MountFailed, WuhbError::MountFailed),
    (ApiError::FileNotFound, WuhbError::FileNotFound),
];

impl Operation {
    /// Module codes this operation recognizes, besides success.
    pub fn table(self) -> &'static [(ApiError, WuhbError)] {
        match self {
            Operation::GetVersion => GET_VERSION,
            Operation::MountBundle => MOUNT_BUNDLE,
            Operation::UnmountBundle => UNMOUNT_BUNDLE,
            Operation::FileOpen => FILE_OPEN,
            Operation::FileRead => FILE_READ,
            Operation::FileClose => FILE_CLOSE,
            Operation::FileExists => FILE_EXISTS,
            Operation::GetRpxInfo => GET_RPX_INFO,
        }
    }

    /// Translate a raw module result for this operation.
    pub fn translate(self, raw: RawApiError) -> WuhbResult<()> {
        let Some(code) = ApiError::from_raw(raw) else {
            tracing::debug!(operation = ?self, raw, "unrecognized module error code");
            return Err(WuhbError::UnknownError);
        };
        if code == ApiError::None {
            return Ok(());
        }
        match self.table().iter().find(|(api, _)| *api == code) {
            Some(&(_, err)) => Err(err),
            None => {
                tracing::debug!(
                    operation = ?self,
                    code = ?code,
                    "module error outside operation table"
                );
                Err(WuhbError::UnknownError)
            }
        }
    }
}

impl From<Capability> for Operation {
    fn from(capability: Capability) -> Self {
        match capability {
            Capability::MountBundle => Operation::MountBundle,
            Capability::UnmountBundle => Operation::UnmountBundle,
            Capability::FileOpen => Operation::FileOpen,
            Capability::FileRead => Operation::FileRead,
            Capability::FileClose => Operation::FileClose,
            Capability::FileExists => Operation::FileExists,
            Capability::GetRpxInfo => Operation::GetRpxInfo,
        }
    }
}
