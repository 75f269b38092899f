//! In-process stand-in for the bundle utilities module
//!
//! Every export is a plain `extern "C"` function working on thread-local
//! state, so each test thread gets its own independent module.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::ffi::{c_char, c_void, CStr};

use wuhb_utils::{ExportTable, InProcessLoader, Session};
use wuhb_utils_abi::exports;
use wuhb_utils_abi::{ApiError, BundleSource, FileHandle, RpxInfo, Version};

/// Bundle path the `app` mount of [`mounted_session`] comes from.
pub const APP_BUNDLE: &str = "fs:/vol/external01/app.wuhb";

/// Observable state of the fake module.
#[derive(Debug)]
pub struct FakeState {
    pub version: Version,
    pub version_result: i32,
    /// Known bundle paths and their RPX payloads
    pub bundles: HashMap<String, RpxInfo>,
    pub mounts: HashSet<String>,
    /// File contents keyed by full path (`mount:/path`)
    pub files: HashMap<String, Vec<u8>>,
    /// Open handles: path and read position
    pub handles: HashMap<FileHandle, (String, usize)>,
    pub next_handle: FileHandle,
    /// Upper bound on bytes returned by a single read
    pub read_limit: Option<usize>,
    /// Reads after this many successful ones fail with file-handle-not-found
    pub fail_reads_after: Option<usize>,
    /// Result codes returned instead of running an export
    pub forced: HashMap<&'static str, i32>,
    pub calls: HashMap<&'static str, usize>,
    /// Size argument of every read call
    pub read_sizes: Vec<u32>,
    pub last_mount_source: Option<BundleSource>,
}

impl Default for FakeState {
    fn default() -> Self {
        Self {
            version: 1,
            version_result: 0,
            bundles: HashMap::new(),
            mounts: HashSet::new(),
            files: HashMap::new(),
            handles: HashMap::new(),
            next_handle: 0x100,
            read_limit: None,
            fail_reads_after: None,
            forced: HashMap::new(),
            calls: HashMap::new(),
            read_sizes: Vec::new(),
            last_mount_source: None,
        }
    }
}

thread_local! {
    static STATE: RefCell<FakeState> = RefCell::new(FakeState::default());
}

/// Reset the calling thread's module state.
pub fn reset() {
    STATE.with(|s| *s.borrow_mut() = FakeState::default());
}

/// Run `f` against the calling thread's module state.
pub fn with_state<R>(f: impl FnOnce(&mut FakeState) -> R) -> R {
    STATE.with(|s| f(&mut s.borrow_mut()))
}

/// Number of calls made to `export`.
pub fn calls(export: &str) -> usize {
    with_state(|s| s.calls.get(export).copied().unwrap_or(0))
}

/// Calls made to every export except the version query.
pub fn operation_calls() -> usize {
    with_state(|s| {
        s.calls
            .iter()
            .filter(|(name, _)| **name != exports::GET_VERSION)
            .map(|(_, count)| *count)
            .sum()
    })
}

pub fn add_file(path: &str, content: Vec<u8>) {
    with_state(|s| s.files.insert(path.to_string(), content));
}

pub fn add_bundle(path: &str, rpx: RpxInfo) {
    with_state(|s| s.bundles.insert(path.to_string(), rpx));
}

pub fn force(export: &'static str, code: i32) {
    with_state(|s| s.forced.insert(export, code));
}

pub fn open_handles() -> usize {
    with_state(|s| s.handles.len())
}

/// Deterministic content of `len` bytes.
pub fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 253) as u8 ^ (i >> 8) as u8).collect()
}

fn enter(export: &'static str) -> Option<i32> {
    with_state(|s| {
        *s.calls.entry(export).or_insert(0) += 1;
        s.forced.get(export).copied()
    })
}

unsafe fn string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    Some(CStr::from_ptr(ptr).to_string_lossy().into_owned())
}

const OK: i32 = ApiError::None as i32;

unsafe extern "C" fn get_version(out: *mut Version) -> i32 {
    if let Some(code) = enter(exports::GET_VERSION) {
        return code;
    }
    if out.is_null() {
        return ApiError::InvalidArg.as_raw();
    }
    with_state(|s| {
        *out = s.version;
        s.version_result
    })
}

unsafe extern "C" fn mount_bundle(
    name: *const c_char,
    path: *const c_char,
    source: BundleSource,
    out_res: *mut i32,
) -> i32 {
    if let Some(code) = enter(exports::MOUNT_BUNDLE) {
        return code;
    }
    let (Some(name), Some(path)) = (string(name), string(path)) else {
        return ApiError::InvalidArg.as_raw();
    };
    if out_res.is_null() {
        return ApiError::InvalidArg.as_raw();
    }
    with_state(|s| {
        s.last_mount_source = Some(source);
        if s.mounts.contains(&name) {
            return ApiError::MountNameTaken.as_raw();
        }
        if s.bundles.contains_key(&path) {
            s.mounts.insert(name);
            *out_res = 0;
        } else {
            *out_res = -1;
        }
        OK
    })
}

unsafe extern "C" fn unmount_bundle(name: *const c_char, out_res: *mut i32) -> i32 {
    if let Some(code) = enter(exports::UNMOUNT_BUNDLE) {
        return code;
    }
    let Some(name) = string(name) else {
        return ApiError::InvalidArg.as_raw();
    };
    with_state(|s| {
        if !s.mounts.remove(&name) {
            return ApiError::MountNotFound.as_raw();
        }
        *out_res = 0;
        OK
    })
}

fn mounted(state: &FakeState, path: &str) -> bool {
    match path.split_once(":/") {
        Some((mount, _)) => state.mounts.contains(mount),
        None => false,
    }
}

unsafe extern "C" fn file_open(name: *const c_char, out_handle: *mut FileHandle) -> i32 {
    if let Some(code) = enter(exports::FILE_OPEN) {
        return code;
    }
    let Some(name) = string(name) else {
        return ApiError::InvalidArg.as_raw();
    };
    with_state(|s| {
        if !mounted(s, &name) || !s.files.contains_key(&name) {
            return ApiError::FileNotFound.as_raw();
        }
        let handle = s.next_handle;
        s.next_handle += 1;
        s.handles.insert(handle, (name, 0));
        *out_handle = handle;
        OK
    })
}

unsafe extern "C" fn file_read(
    handle: FileHandle,
    buffer: *mut u8,
    size: u32,
    out_res: *mut i32,
) -> i32 {
    if let Some(code) = enter(exports::FILE_READ) {
        return code;
    }
    if buffer.is_null() || out_res.is_null() {
        return ApiError::InvalidArg.as_raw();
    }
    with_state(|s| {
        s.read_sizes.push(size);
        if let Some(limit) = s.fail_reads_after {
            if s.read_sizes.len() > limit {
                return ApiError::FileHandleNotFound.as_raw();
            }
        }
        let read_limit = s.read_limit;
        let Some((path, pos)) = s.handles.get_mut(&handle) else {
            return ApiError::FileHandleNotFound.as_raw();
        };
        let content = &s.files[path.as_str()];
        let mut count = (content.len() - *pos).min(size as usize);
        if let Some(limit) = read_limit {
            count = count.min(limit);
        }
        std::ptr::copy_nonoverlapping(content[*pos..].as_ptr(), buffer, count);
        *pos += count;
        *out_res = count as i32;
        OK
    })
}

unsafe extern "C" fn file_close(handle: FileHandle) -> i32 {
    if let Some(code) = enter(exports::FILE_CLOSE) {
        return code;
    }
    with_state(|s| match s.handles.remove(&handle) {
        Some(_) => OK,
        None => ApiError::FileHandleNotFound.as_raw(),
    })
}

unsafe extern "C" fn file_exists(name: *const c_char, out_res: *mut i32) -> i32 {
    if let Some(code) = enter(exports::FILE_EXISTS) {
        return code;
    }
    let Some(name) = string(name) else {
        return ApiError::InvalidArg.as_raw();
    };
    with_state(|s| {
        *out_res = (mounted(s, &name) && s.files.contains_key(&name)) as i32;
        OK
    })
}

unsafe extern "C" fn get_rpx_info(
    path: *const c_char,
    _source: BundleSource,
    out_info: *mut RpxInfo,
) -> i32 {
    if let Some(code) = enter(exports::GET_RPX_INFO) {
        return code;
    }
    let Some(path) = string(path) else {
        return ApiError::InvalidArg.as_raw();
    };
    with_state(|s| match s.bundles.get(&path) {
        Some(info) => {
            *out_info = *info;
            OK
        }
        None => ApiError::FileNotFound.as_raw(),
    })
}

/// Export table of the full module, minus the symbols in `omit`.
pub fn exports_without(omit: &[&str]) -> ExportTable {
    let all: [(&str, *const c_void); 8] = [
        (exports::GET_VERSION, get_version as *const c_void),
        (exports::MOUNT_BUNDLE, mount_bundle as *const c_void),
        (exports::UNMOUNT_BUNDLE, unmount_bundle as *const c_void),
        (exports::FILE_OPEN, file_open as *const c_void),
        (exports::FILE_READ, file_read as *const c_void),
        (exports::FILE_CLOSE, file_close as *const c_void),
        (exports::FILE_EXISTS, file_exists as *const c_void),
        (exports::GET_RPX_INFO, get_rpx_info as *const c_void),
    ];
    let mut table = ExportTable::new();
    for (name, address) in all {
        if !omit.contains(&name) {
            table = table.with(name, address);
        }
    }
    table
}

pub fn loader_without(omit: &[&str]) -> InProcessLoader {
    InProcessLoader::new().with_module(exports::MODULE_NAME, exports_without(omit))
}

/// Fresh state and an uninitialized session over the full module.
pub fn session() -> Session<InProcessLoader> {
    session_without(&[])
}

pub fn session_without(omit: &[&str]) -> Session<InProcessLoader> {
    reset();
    Session::with_loader(loader_without(omit), exports::MODULE_NAME)
}

/// Initialized session with bundle `app` mounted from [`APP_BUNDLE`].
pub fn mounted_session() -> Session<InProcessLoader> {
    let mut session = session();
    add_bundle(
        APP_BUNDLE,
        RpxInfo {
            length: 0x2000,
            offset: 0x400,
        },
    );
    session.init_library().unwrap();
    let res = session.mount_bundle("app", APP_BUNDLE, BundleSource::FileDescriptor);
    assert_eq!(res, Ok(0));
    session
}
