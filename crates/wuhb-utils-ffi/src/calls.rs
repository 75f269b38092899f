//! C-ABI call bodies over an explicit session
//!
//! The exported `WUHBUtils_*` functions lock the process-wide session and
//! delegate here. Keeping the bodies generic over the loader lets them run
//! against any [`Session`].

use std::ffi::c_char;
use std::mem::MaybeUninit;

use wuhb_utils::reader::{self, FileAccess};
use wuhb_utils::{Capability, ModuleLoader, Session, Status, WuhbError, WuhbResult};
use wuhb_utils_abi::{BundleSource, FileHandle, RpxInfo, Version};

use crate::malloc::MallocAllocator;

/// `WUHBUtils_InitLibrary`
pub fn init_library<L: ModuleLoader>(session: &mut Session<L>) -> Status {
    Status::from(&session.init_library())
}

/// `WUHBUtils_DeInitLibrary`
pub fn deinit_library<L: ModuleLoader>(session: &mut Session<L>) -> Status {
    Status::from(&session.deinit_library())
}

/// `WUHBUtils_GetVersion`
///
/// The version export is resolved before `out_version` is checked, so a
/// missing module is reported ahead of a null pointer.
///
/// # Safety
/// `out_version` must be null or writable.
pub unsafe fn get_version<L: ModuleLoader>(
    session: &mut Session<L>,
    out_version: *mut Version,
) -> Status {
    if let Err(err) = session.resolve_version() {
        return err.status();
    }
    if out_version.is_null() {
        return Status::InvalidArgument;
    }
    match session.get_version() {
        Ok(version) => {
            *out_version = version;
            Status::Success
        }
        Err(err) => err.status(),
    }
}

/// `WUHBUtils_MountBundle`
///
/// # Safety
/// Pointers are forwarded to the module unchanged.
pub unsafe fn mount_bundle<L: ModuleLoader>(
    session: &Session<L>,
    name: *const c_char,
    path: *const c_char,
    source: i32,
    out_res: *mut i32,
) -> Status {
    let result = bundle_source(session, Capability::MountBundle, source)
        .and_then(|source| session.mount_bundle_raw(name, path, source, out_res));
    Status::from(&result)
}

/// `WUHBUtils_UnmountBundle`
///
/// # Safety
/// Pointers are forwarded to the module unchanged.
pub unsafe fn unmount_bundle<L: ModuleLoader>(
    session: &Session<L>,
    name: *const c_char,
    out_res: *mut i32,
) -> Status {
    Status::from(&session.unmount_bundle_raw(name, out_res))
}

/// `WUHBUtils_FileOpen`
///
/// # Safety
/// Pointers are forwarded to the module unchanged.
pub unsafe fn file_open<L: ModuleLoader>(
    session: &Session<L>,
    name: *const c_char,
    out_handle: *mut FileHandle,
) -> Status {
    Status::from(&session.file_open_raw(name, out_handle))
}

/// `WUHBUtils_FileRead`
///
/// # Safety
/// Pointers are forwarded to the module unchanged.
pub unsafe fn file_read<L: ModuleLoader>(
    session: &Session<L>,
    handle: FileHandle,
    buffer: *mut u8,
    size: u32,
    out_res: *mut i32,
) -> Status {
    Status::from(&session.file_read_raw(handle, buffer, size, out_res))
}

/// `WUHBUtils_FileClose`
pub fn file_close<L: ModuleLoader>(session: &Session<L>, handle: FileHandle) -> Status {
    Status::from(&session.file_close(handle))
}

/// `WUHBUtils_FileExists`
///
/// # Safety
/// Pointers are forwarded to the module unchanged.
pub unsafe fn file_exists<L: ModuleLoader>(
    session: &Session<L>,
    name: *const c_char,
    out_res: *mut i32,
) -> Status {
    Status::from(&session.file_exists_raw(name, out_res))
}

/// `WUHBUtils_GetRPXInfo`
///
/// # Safety
/// Pointers are forwarded to the module unchanged.
pub unsafe fn get_rpx_info<L: ModuleLoader>(
    session: &Session<L>,
    path: *const c_char,
    source: i32,
    out_info: *mut RpxInfo,
) -> Status {
    let result = bundle_source(session, Capability::GetRpxInfo, source)
        .and_then(|source| session.get_rpx_info_raw(path, source, out_info));
    Status::from(&result)
}

/// `WUHBUtils_ReadWholeFile`
///
/// On success `*out_buf` owns a `malloc` block the caller frees, or is null
/// when the file is empty.
///
/// # Safety
/// `out_buf` and `out_size` must be null or writable; `path` is forwarded to
/// the module unchanged.
pub unsafe fn read_whole_file<L: ModuleLoader>(
    session: &Session<L>,
    path: *const c_char,
    out_buf: *mut *mut u8,
    out_size: *mut u32,
) -> Status {
    if out_buf.is_null() || out_size.is_null() {
        return Status::InvalidArgument;
    }

    // The module receives `path` itself; the reader never looks at its copy.
    let files = RawPathFiles { session, path };
    let buffer = match reader::read_whole_file(&files, "", MallocAllocator) {
        Ok(buffer) => buffer,
        Err(err) => return err.status(),
    };

    let Ok(size) = u32::try_from(buffer.len()) else {
        tracing::warn!(len = buffer.len(), "file too large for a 32-bit size");
        return Status::UnknownError;
    };
    let (ptr, _, _) = buffer.into_raw_parts();
    *out_buf = ptr.map_or(std::ptr::null_mut(), |p| p.as_ptr());
    *out_size = size;
    Status::Success
}

/// Gate first, then validate the raw source selector.
fn bundle_source<L: ModuleLoader>(
    session: &Session<L>,
    capability: Capability,
    raw: i32,
) -> WuhbResult<BundleSource> {
    session.gate(capability)?;
    BundleSource::from_raw(raw).map_err(|err| {
        tracing::debug!(error = %err, "rejecting bundle source");
        WuhbError::InvalidArgument
    })
}

/// File access that hands the caller's path pointer to the module as-is.
struct RawPathFiles<'a, L: ModuleLoader> {
    session: &'a Session<L>,
    path: *const c_char,
}

impl<L: ModuleLoader> FileAccess for RawPathFiles<'_, L> {
    fn open(&self, _path: &str) -> WuhbResult<FileHandle> {
        let mut handle = 0;
        unsafe { self.session.file_open_raw(self.path, &mut handle)? };
        Ok(handle)
    }

    fn read(&self, handle: FileHandle, buf: &mut [MaybeUninit<u8>]) -> WuhbResult<i32> {
        self.session.file_read_uninit(handle, buf)
    }

    fn close(&self, handle: FileHandle) -> WuhbResult<()> {
        self.session.file_close(handle)
    }
}
