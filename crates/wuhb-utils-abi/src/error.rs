//! Error codes reported by the module itself

/// Raw error value as returned across the ABI.
///
/// Kept as a plain integer because a module may return codes this client
/// does not know about.
pub type RawApiError = i32;

/// Errors the module can report from an exported call.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiError {
    /// Call succeeded
    None = 0,
    /// An argument was null or malformed
    InvalidArg = -1,
    /// A bundle is already mounted under that name
    MountNameTaken = -2,
    /// No bundle is mounted under that name
    MountNotFound = -3,
    /// The requested file does not exist
    FileNotFound = -4,
    /// The handle is not (or no longer) open
    FileHandleNotFound = -5,
    /// The module ran out of memory
    NoMemory = -6,
    /// The bundle could not be mounted
    MountFailed = -7,
}

impl ApiError {
    /// Decode a raw code; unknown values yield `None`.
    pub fn from_raw(raw: RawApiError) -> Option<Self> {
        Some(match raw {
            0 => ApiError::None,
            -1 => ApiError::InvalidArg,
            -2 => ApiError::MountNameTaken,
            -3 => ApiError::MountNotFound,
            -4 => ApiError::FileNotFound,
            -5 => ApiError::FileHandleNotFound,
            -6 => ApiError::NoMemory,
            -7 => ApiError::MountFailed,
            _ => return None,
        })
    }

    /// The raw integer value.
    pub fn as_raw(self) -> RawApiError {
        self as RawApiError
    }
}

/// A bundle source selector outside the known range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid bundle source: {0}")]
pub struct InvalidBundleSource(pub i32);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_raw_known_codes() {
        for code in [
            ApiError::None,
            ApiError::InvalidArg,
            ApiError::MountNameTaken,
            ApiError::MountNotFound,
            ApiError::FileNotFound,
            ApiError::FileHandleNotFound,
            ApiError::NoMemory,
            ApiError::MountFailed,
        ] {
            assert_eq!(ApiError::from_raw(code.as_raw()), Some(code));
        }
    }

    #[test]
    fn test_from_raw_unknown_code() {
        assert_eq!(ApiError::from_raw(-8), None);
        assert_eq!(ApiError::from_raw(1), None);
        assert_eq!(ApiError::from_raw(i32::MIN), None);
    }
}
