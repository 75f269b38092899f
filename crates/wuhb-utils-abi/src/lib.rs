//! WUHB Utils ABI - types shared with the bundle-utilities system module
//!
//! This crate holds the C-compatible types that cross the boundary between the
//! client library and the remotely loaded `homebrew_wuhb_utils` module:
//!
//! - [`ApiError`]: the module's own small error enumeration
//! - [`BundleSource`]: how a bundle path is addressed
//! - [`RpxInfo`]: location of the executable payload inside a bundle
//! - [`exports`]: exported symbol names and their function signatures
//!
//! Nothing here performs any I/O; the types are plain data.

#![warn(missing_docs)]

mod error;
pub mod exports;

pub use error::{ApiError, InvalidBundleSource, RawApiError};

/// Protocol version reported by the module.
pub type Version = u32;

/// Opaque file handle issued by the module.
///
/// The client never interprets the bits; it only passes the token back.
pub type FileHandle = u32;

// ============================================================================
// Bundle Source
// ============================================================================

/// Addressing mode for a bundle path.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BundleSource {
    /// Portable file API, paths like `fs:/vol/external01/my.wuhb`
    #[default]
    FileDescriptor = 0,
    /// Native file API, paths like `/vol/external01/my.wuhb`
    FileDescriptorCafeOs = 1,
}

impl BundleSource {
    /// Decode a raw selector coming from C.
    pub fn from_raw(raw: i32) -> Result<Self, InvalidBundleSource> {
        match raw {
            0 => Ok(BundleSource::FileDescriptor),
            1 => Ok(BundleSource::FileDescriptorCafeOs),
            other => Err(InvalidBundleSource(other)),
        }
    }

    /// Raw selector value as passed across the ABI.
    pub fn as_raw(self) -> i32 {
        self as i32
    }
}

// ============================================================================
// RPX Info
// ============================================================================

/// Byte range of the `/code/*.rpx` payload inside a bundle.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RpxInfo {
    /// Length of the payload in bytes
    pub length: u64,
    /// Offset of the payload from the start of the bundle
    pub offset: u64,
}
