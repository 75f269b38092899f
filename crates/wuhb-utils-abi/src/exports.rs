//! Exported symbols of the `homebrew_wuhb_utils` module
//!
//! Every export uses the C calling convention and returns a [`RawApiError`].
//! Output values are written through pointer parameters.

use std::ffi::c_char;

use crate::{BundleSource, FileHandle, RawApiError, RpxInfo, Version};

/// Default name the module is registered under.
pub const MODULE_NAME: &str = "homebrew_wuhb_utils";

/// `WUU_GetVersion(out_version)`
pub const GET_VERSION: &str = "WUU_GetVersion";
/// `WUU_MountBundle(name, path, source, out_res)`
pub const MOUNT_BUNDLE: &str = "WUU_MountBundle";
/// `WUU_UnmountBundle(name, out_res)`
pub const UNMOUNT_BUNDLE: &str = "WUU_UnmountBundle";
/// `WUU_FileOpen(name, out_handle)`
pub const FILE_OPEN: &str = "WUU_FileOpen";
/// `WUU_FileRead(handle, buffer, size, out_res)`
pub const FILE_READ: &str = "WUU_FileRead";
/// `WUU_FileClose(handle)`
pub const FILE_CLOSE: &str = "WUU_FileClose";
/// `WUU_FileExists(name, out_res)`
pub const FILE_EXISTS: &str = "WUU_FileExists";
/// `WUU_GetRPXInfo(path, source, out_info)`
pub const GET_RPX_INFO: &str = "WUU_GetRPXInfo";

/// Signature of [`GET_VERSION`].
pub type GetVersionFn = unsafe extern "C" fn(out_version: *mut Version) -> RawApiError;

/// Signature of [`MOUNT_BUNDLE`].
pub type MountBundleFn = unsafe extern "C" fn(
    name: *const c_char,
    path: *const c_char,
    source: BundleSource,
    out_res: *mut i32,
) -> RawApiError;

/// Signature of [`UNMOUNT_BUNDLE`].
pub type UnmountBundleFn =
    unsafe extern "C" fn(name: *const c_char, out_res: *mut i32) -> RawApiError;

/// Signature of [`FILE_OPEN`].
pub type FileOpenFn =
    unsafe extern "C" fn(name: *const c_char, out_handle: *mut FileHandle) -> RawApiError;

/// Signature of [`FILE_READ`].
pub type FileReadFn = unsafe extern "C" fn(
    handle: FileHandle,
    buffer: *mut u8,
    size: u32,
    out_res: *mut i32,
) -> RawApiError;

/// Signature of [`FILE_CLOSE`].
pub type FileCloseFn = unsafe extern "C" fn(handle: FileHandle) -> RawApiError;

/// Signature of [`FILE_EXISTS`].
pub type FileExistsFn = unsafe extern "C" fn(name: *const c_char, out_res: *mut i32) -> RawApiError;

/// Signature of [`GET_RPX_INFO`].
pub type GetRpxInfoFn = unsafe extern "C" fn(
    path: *const c_char,
    source: BundleSource,
    out_info: *mut RpxInfo,
) -> RawApiError;
