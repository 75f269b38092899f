//! Bundle and file facade
//!
//! [`Session`] is the public entry point: it owns a [`ModuleBinding`] and
//! exposes every module operation. Each call passes the two-tier gate,
//! forwards its arguments unchanged and translates the module's result code
//! through that operation's table.
//!
//! The `*_raw` variants forward raw pointers exactly as given, for callers
//! (such as a C ABI layer) that already hold them. The safe variants take
//! Rust strings and slices and convert them first; a string containing a NUL
//! byte is rejected locally with [`WuhbError::InvalidArgument`].

use std::ffi::{c_char, CString};
use std::mem::MaybeUninit;

use wuhb_utils_abi::{BundleSource, FileHandle, RawApiError, RpxInfo, Version};

use crate::binder::{Capability, ModuleBinding};
use crate::config::{BinderConfig, ConfigError};
use crate::loader::{DynamicLoader, ModuleLoader};
use crate::reader::{self, BufferAllocator, FileAccess, GrowBuffer, SystemAllocator};
use crate::status::{WuhbError, WuhbResult};
use crate::translate::Operation;

/// A client session bound (or bindable) to the bundle utilities module.
pub struct Session<L: ModuleLoader = DynamicLoader> {
    binding: ModuleBinding<L>,
}

impl Session<DynamicLoader> {
    /// Session that loads the module described by `config` from disk.
    pub fn new(config: &BinderConfig) -> Self {
        Self::with_loader(config.loader(), config.module_name.clone())
    }

    /// Session configured from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self::new(&BinderConfig::from_env()?))
    }
}

impl<L: ModuleLoader> Session<L> {
    /// Session acquiring `module_name` through `loader`. Nothing is loaded
    /// until [`Session::init_library`].
    pub fn with_loader(loader: L, module_name: impl Into<String>) -> Self {
        Self {
            binding: ModuleBinding::new(loader, module_name),
        }
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Bind the module and discover its version.
    ///
    /// May be called again; every call re-acquires the module and refreshes
    /// the capability set.
    pub fn init_library(&mut self) -> WuhbResult<()> {
        self.binding.bind().map(|_| ())
    }

    /// Kept for API symmetry. The binding stays in place; dropping the
    /// session is what releases the module.
    pub fn deinit_library(&mut self) -> WuhbResult<()> {
        Ok(())
    }

    /// Ask the module for its version.
    ///
    /// Works before [`Session::init_library`] but does not initialize the
    /// session: gated operations keep failing until it is called.
    pub fn get_version(&mut self) -> WuhbResult<Version> {
        self.binding.query_version()
    }

    /// Resolve the version export without calling it.
    pub fn resolve_version(&mut self) -> WuhbResult<()> {
        self.binding.resolve_version()
    }

    /// Version discovered by the last successful init.
    pub fn version(&self) -> Option<Version> {
        self.binding.version()
    }

    /// Whether the session has been initialized.
    pub fn is_initialized(&self) -> bool {
        self.binding.is_bound()
    }

    /// Whether `capability` is currently callable.
    pub fn has(&self, capability: Capability) -> bool {
        self.binding.has(capability)
    }

    /// Apply the two-tier gate to `capability` without calling anything.
    pub fn gate(&self, capability: Capability) -> WuhbResult<()> {
        self.binding.gate(capability)
    }

    /// Every currently callable capability.
    pub fn capabilities(&self) -> Vec<Capability> {
        self.binding.capabilities()
    }

    /// The underlying binding.
    pub fn binding(&self) -> &ModuleBinding<L> {
        &self.binding
    }

    // ========================================================================
    // Raw forwarding
    // ========================================================================

    /// Forward `MountBundle`.
    ///
    /// # Safety
    /// The pointers must satisfy the module's contract for this call.
    pub unsafe fn mount_bundle_raw(
        &self,
        name: *const c_char,
        path: *const c_char,
        source: BundleSource,
        out_res: *mut i32,
    ) -> WuhbResult<()> {
        let f = self.binding.exports().mount_bundle;
        self.forward(
            Capability::MountBundle,
            f,
            |f| unsafe { f(name, path, source, out_res) },
        )
    }

    /// Forward `UnmountBundle`.
    ///
    /// # Safety
    /// The pointers must satisfy the module's contract for this call.
    pub unsafe fn unmount_bundle_raw(
        &self,
        name: *const c_char,
        out_res: *mut i32,
    ) -> WuhbResult<()> {
        let f = self.binding.exports().unmount_bundle;
        self.forward(
            Capability::UnmountBundle,
            f,
            |f| unsafe { f(name, out_res) },
        )
    }

    /// Forward `FileOpen`.
    ///
    /// # Safety
    /// The pointers must satisfy the module's contract for this call.
    pub unsafe fn file_open_raw(
        &self,
        name: *const c_char,
        out_handle: *mut FileHandle,
    ) -> WuhbResult<()> {
        let f = self.binding.exports().file_open;
        self.forward(Capability::FileOpen, f, |f| unsafe { f(name, out_handle) })
    }

    /// Forward `FileRead`.
    ///
    /// # Safety
    /// `buffer` must be writable for `size` bytes (or whatever the module
    /// accepts), and `out_res` must satisfy the module's contract.
    pub unsafe fn file_read_raw(
        &self,
        handle: FileHandle,
        buffer: *mut u8,
        size: u32,
        out_res: *mut i32,
    ) -> WuhbResult<()> {
        let f = self.binding.exports().file_read;
        self.forward(
            Capability::FileRead,
            f,
            |f| unsafe { f(handle, buffer, size, out_res) },
        )
    }

    /// Forward `FileExists`.
    ///
    /// # Safety
    /// The pointers must satisfy the module's contract for this call.
    pub unsafe fn file_exists_raw(&self, name: *const c_char, out_res: *mut i32) -> WuhbResult<()> {
        let f = self.binding.exports().file_exists;
        self.forward(Capability::FileExists, f, |f| unsafe { f(name, out_res) })
    }

    /// Forward `GetRPXInfo`.
    ///
    /// # Safety
    /// The pointers must satisfy the module's contract for this call.
    pub unsafe fn get_rpx_info_raw(
        &self,
        path: *const c_char,
        source: BundleSource,
        out_info: *mut RpxInfo,
    ) -> WuhbResult<()> {
        let f = self.binding.exports().get_rpx_info;
        self.forward(
            Capability::GetRpxInfo,
            f,
            |f| unsafe { f(path, source, out_info) },
        )
    }

    /// Gate `capability`, invoke its export and translate the result through
    /// the matching operation's table.
    fn forward<F>(
        &self,
        capability: Capability,
        f: Option<F>,
        call: impl FnOnce(F) -> RawApiError,
    ) -> WuhbResult<()> {
        let f = self.binding.require(capability, f)?;
        Operation::from(capability).translate(call(f))
    }

    // ========================================================================
    // Safe operations
    // ========================================================================

    /// Mount the bundle at `path` under `name`. Returns the module's result
    /// value.
    pub fn mount_bundle(&self, name: &str, path: &str, source: BundleSource) -> WuhbResult<i32> {
        self.binding.gate(Capability::MountBundle)?;
        let name = c_string(name)?;
        let path = c_string(path)?;
        let mut res = 0;
        unsafe { self.mount_bundle_raw(name.as_ptr(), path.as_ptr(), source, &mut res)? };
        Ok(res)
    }

    /// Unmount the bundle mounted under `name`. Returns the module's result
    /// value.
    pub fn unmount_bundle(&self, name: &str) -> WuhbResult<i32> {
        self.binding.gate(Capability::UnmountBundle)?;
        let name = c_string(name)?;
        let mut res = 0;
        unsafe { self.unmount_bundle_raw(name.as_ptr(), &mut res)? };
        Ok(res)
    }

    /// Open a file inside a mounted bundle.
    pub fn file_open(&self, name: &str) -> WuhbResult<FileHandle> {
        self.binding.gate(Capability::FileOpen)?;
        let name = c_string(name)?;
        let mut handle = 0;
        unsafe { self.file_open_raw(name.as_ptr(), &mut handle)? };
        Ok(handle)
    }

    /// Read into `buf`. Returns the byte count the module reported.
    pub fn file_read(&self, handle: FileHandle, buf: &mut [u8]) -> WuhbResult<i32> {
        let size = clamp_len(buf.len());
        let mut res = 0;
        unsafe { self.file_read_raw(handle, buf.as_mut_ptr(), size, &mut res)? };
        Ok(res)
    }

    /// Read into uninitialized memory.
    ///
    /// On success the first `n` elements of `buf` (the returned count, when
    /// positive) have been written by the module.
    pub fn file_read_uninit(
        &self,
        handle: FileHandle,
        buf: &mut [MaybeUninit<u8>],
    ) -> WuhbResult<i32> {
        let size = clamp_len(buf.len());
        let mut res = 0;
        unsafe { self.file_read_raw(handle, buf.as_mut_ptr().cast::<u8>(), size, &mut res)? };
        Ok(res)
    }

    /// Close a handle.
    pub fn file_close(&self, handle: FileHandle) -> WuhbResult<()> {
        let f = self.binding.exports().file_close;
        self.forward(Capability::FileClose, f, |f| unsafe { f(handle) })
    }

    /// Check whether a file exists.
    pub fn file_exists(&self, name: &str) -> WuhbResult<bool> {
        self.binding.gate(Capability::FileExists)?;
        let name = c_string(name)?;
        let mut res = 0;
        unsafe { self.file_exists_raw(name.as_ptr(), &mut res)? };
        Ok(res != 0)
    }

    /// Locate the executable payload inside the bundle at `path`.
    pub fn get_rpx_info(&self, path: &str, source: BundleSource) -> WuhbResult<RpxInfo> {
        self.binding.gate(Capability::GetRpxInfo)?;
        let path = c_string(path)?;
        let mut info = RpxInfo::default();
        unsafe { self.get_rpx_info_raw(path.as_ptr(), source, &mut info)? };
        Ok(info)
    }

    /// Read a whole file into a buffer sized exactly to its content.
    pub fn read_whole_file(&self, path: &str) -> WuhbResult<GrowBuffer> {
        self.read_whole_file_in(path, SystemAllocator)
    }

    /// [`Session::read_whole_file`] with buffers taken from `alloc`.
    pub fn read_whole_file_in<A: BufferAllocator>(
        &self,
        path: &str,
        alloc: A,
    ) -> WuhbResult<GrowBuffer<A>> {
        reader::read_whole_file(self, path, alloc)
    }
}

impl<L: ModuleLoader> FileAccess for Session<L> {
    fn open(&self, path: &str) -> WuhbResult<FileHandle> {
        self.file_open(path)
    }

    fn read(&self, handle: FileHandle, buf: &mut [MaybeUninit<u8>]) -> WuhbResult<i32> {
        self.file_read_uninit(handle, buf)
    }

    fn close(&self, handle: FileHandle) -> WuhbResult<()> {
        self.file_close(handle)
    }
}

impl<L: ModuleLoader> std::fmt::Debug for Session<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("binding", &self.binding)
            .finish()
    }
}

fn c_string(s: &str) -> WuhbResult<CString> {
    CString::new(s).map_err(|_| WuhbError::InvalidArgument)
}

fn clamp_len(len: usize) -> u32 {
    u32::try_from(len).unwrap_or(u32::MAX)
}
