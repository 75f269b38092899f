//! C ABI for the WUHB bundle utilities client
//!
//! Exposes the `WUHBUtils_*` function set over one process-wide session:
//! - Status codes are `int32_t` values of [`Status`]
//! - Pointer arguments are forwarded to the module unchanged
//! - Buffers from `WUHBUtils_ReadWholeFile` are released with `free()`
//!
//! The session is configured from the environment (`WUHB_UTILS_MODULE`,
//! `WUHB_UTILS_MODULE_PATH`) the first time any function is called.

#![warn(rust_2018_idioms)]
#![allow(non_snake_case)]

pub mod calls;
mod malloc;

pub use malloc::MallocAllocator;

use std::ffi::c_char;

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use wuhb_utils::{BinderConfig, Session, Status};
use wuhb_utils_abi::{FileHandle, RpxInfo, Version};

static SESSION: Lazy<Mutex<Session>> = Lazy::new(|| {
    let config = BinderConfig::from_env().unwrap_or_else(|err| {
        tracing::warn!(error = %err, "ignoring invalid module configuration");
        BinderConfig::default()
    });
    Mutex::new(Session::new(&config))
});

// ============================================================================
// Status
// ============================================================================

/// Stable label for a status code
///
/// Unrecognized codes yield the unknown-error label. The returned string is
/// static and must not be freed.
#[no_mangle]
pub extern "C" fn WUHBUtils_GetStatusStr(status: i32) -> *const c_char {
    Status::from_code(status).as_cstr().as_ptr()
}

// ============================================================================
// Lifecycle
// ============================================================================

/// Bind the module and discover its version
///
/// # Returns
/// * `WUHB_UTILS_RESULT_SUCCESS` on success
/// * `WUHB_UTILS_RESULT_MODULE_NOT_FOUND` if the module cannot be loaded
/// * `WUHB_UTILS_RESULT_MODULE_MISSING_EXPORT` if the version export is missing
/// * `WUHB_UTILS_RESULT_UNSUPPORTED_VERSION` if the version query fails
#[no_mangle]
pub extern "C" fn WUHBUtils_InitLibrary() -> Status {
    calls::init_library(&mut SESSION.lock())
}

/// Always succeeds; the module stays bound.
#[no_mangle]
pub extern "C" fn WUHBUtils_DeInitLibrary() -> Status {
    calls::deinit_library(&mut SESSION.lock())
}

/// Query the module's API version
///
/// Loads the module on first use without initializing the library. A missing
/// module or version export is reported before a NULL `out_version`.
///
/// # Safety
/// `out_version` must be null or valid for writes.
#[no_mangle]
pub unsafe extern "C" fn WUHBUtils_GetVersion(out_version: *mut Version) -> Status {
    calls::get_version(&mut SESSION.lock(), out_version)
}

// ============================================================================
// Bundles
// ============================================================================

/// Mount a bundle under `name`
///
/// `source` is `0` for portable paths (`fs:/vol/external01/app.wuhb`) and `1`
/// for native paths (`/vol/external01/app.wuhb`).
///
/// # Safety
/// Pointers must satisfy the module's contract.
///
/// # Example (C)
/// ```c
/// int32_t res;
/// if (WUHBUtils_MountBundle("app", "fs:/vol/external01/app.wuhb", 0, &res) == 0 && res >= 0) {
///     // "app:/..." is readable
/// }
/// ```
#[no_mangle]
pub unsafe extern "C" fn WUHBUtils_MountBundle(
    name: *const c_char,
    path: *const c_char,
    source: i32,
    out_res: *mut i32,
) -> Status {
    calls::mount_bundle(&SESSION.lock(), name, path, source, out_res)
}

/// Unmount the bundle mounted under `name`
///
/// # Safety
/// Pointers must satisfy the module's contract.
#[no_mangle]
pub unsafe extern "C" fn WUHBUtils_UnmountBundle(
    name: *const c_char,
    out_res: *mut i32,
) -> Status {
    calls::unmount_bundle(&SESSION.lock(), name, out_res)
}

/// Locate the executable payload inside a bundle
///
/// # Safety
/// Pointers must satisfy the module's contract.
#[no_mangle]
pub unsafe extern "C" fn WUHBUtils_GetRPXInfo(
    bundle_path: *const c_char,
    source: i32,
    out_info: *mut RpxInfo,
) -> Status {
    calls::get_rpx_info(&SESSION.lock(), bundle_path, source, out_info)
}

// ============================================================================
// Files
// ============================================================================

/// Open a file inside a mounted bundle
///
/// # Safety
/// Pointers must satisfy the module's contract.
#[no_mangle]
pub unsafe extern "C" fn WUHBUtils_FileOpen(
    name: *const c_char,
    out_handle: *mut FileHandle,
) -> Status {
    calls::file_open(&SESSION.lock(), name, out_handle)
}

/// Read up to `size` bytes; `*out_res` receives the byte count
///
/// # Safety
/// `buffer` must be valid for `size` bytes of writes; pointers must satisfy
/// the module's contract.
#[no_mangle]
pub unsafe extern "C" fn WUHBUtils_FileRead(
    handle: FileHandle,
    buffer: *mut u8,
    size: u32,
    out_res: *mut i32,
) -> Status {
    calls::file_read(&SESSION.lock(), handle, buffer, size, out_res)
}

/// Close a file handle
#[no_mangle]
pub extern "C" fn WUHBUtils_FileClose(handle: FileHandle) -> Status {
    calls::file_close(&SESSION.lock(), handle)
}

/// Check whether a file exists; `*out_res` is non-zero if it does
///
/// # Safety
/// Pointers must satisfy the module's contract.
#[no_mangle]
pub unsafe extern "C" fn WUHBUtils_FileExists(name: *const c_char, out_res: *mut i32) -> Status {
    calls::file_exists(&SESSION.lock(), name, out_res)
}

/// Read a whole file into a newly allocated buffer
///
/// # Returns
/// * `WUHB_UTILS_RESULT_SUCCESS` with `*out_buf`/`*out_size` set; the buffer
///   must be released with `free()` (it is NULL for an empty file)
/// * `WUHB_UTILS_RESULT_INVALID_ARGUMENT` if `out_buf` or `out_size` is NULL
/// * `WUHB_UTILS_RESULT_NO_MEMORY` if the buffer could not grow
/// * any status of `WUHBUtils_FileOpen`, `WUHBUtils_FileRead` or
///   `WUHBUtils_FileClose`
///
/// # Safety
/// `out_buf` and `out_size` must be null or valid for writes.
///
/// # Example (C)
/// ```c
/// uint8_t *buf;
/// uint32_t size;
/// if (WUHBUtils_ReadWholeFile("app:/meta/meta.ini", &buf, &size) == 0) {
///     parse(buf, size);
///     free(buf);
/// }
/// ```
#[no_mangle]
pub unsafe extern "C" fn WUHBUtils_ReadWholeFile(
    path: *const c_char,
    out_buf: *mut *mut u8,
    out_size: *mut u32,
) -> Status {
    calls::read_whole_file(&SESSION.lock(), path, out_buf, out_size)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CStr;
    use std::ptr;

    fn label(code: i32) -> &'static str {
        unsafe { CStr::from_ptr(WUHBUtils_GetStatusStr(code)) }
            .to_str()
            .unwrap()
    }

    #[test]
    fn test_status_labels() {
        assert_eq!(label(0), "WUHB_UTILS_RESULT_SUCCESS");
        assert_eq!(label(-20), "WUHB_UTILS_RESULT_LIB_UNINITIALIZED");
        assert_eq!(label(-21), "WUHB_UTILS_RESULT_UNSUPPORTED_COMMAND");
        assert_eq!(label(12345), "WUHB_UTILS_RESULT_UNKNOWN_ERROR");
    }

    #[test]
    fn test_read_whole_file_rejects_null_outputs() {
        let mut size = 0u32;
        let path = c"app:/x".as_ptr();
        let status = unsafe { WUHBUtils_ReadWholeFile(path, ptr::null_mut(), &mut size) };
        assert_eq!(status, Status::InvalidArgument);
    }

    #[test]
    fn test_get_version_reports_missing_module_before_null_output() {
        let status = unsafe { WUHBUtils_GetVersion(ptr::null_mut()) };
        assert_eq!(status, Status::ModuleNotFound);
    }

    #[test]
    fn test_deinit_always_succeeds() {
        assert_eq!(WUHBUtils_DeInitLibrary(), Status::Success);
    }
}
