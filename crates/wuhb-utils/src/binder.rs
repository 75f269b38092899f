//! Versioned capability binding
//!
//! [`ModuleBinding`] acquires the system module, resolves the mandatory
//! version export plus every optional export it can find, and records the
//! protocol version the module reports. Facade calls go through
//! [`ModuleBinding::require`], which applies the two-tier gate:
//!
//! 1. no version discovered yet -> [`WuhbError::LibUninitialized`]
//! 2. export missing, or version below the capability's minimum ->
//!    [`WuhbError::UnsupportedCommand`]
//!
//! A missing optional export never fails the bind. A newer client talking to
//! an older module keeps working for whatever the older module provides.

use wuhb_utils_abi::exports::{
    self, FileCloseFn, FileExistsFn, FileOpenFn, FileReadFn, GetRpxInfoFn, GetVersionFn,
    MountBundleFn, UnmountBundleFn,
};
use wuhb_utils_abi::Version;

use crate::loader::{resolve_export, ModuleExports, ModuleLoader};
use crate::status::{WuhbError, WuhbResult};
use crate::translate::Operation;

// ============================================================================
// Capabilities
// ============================================================================

/// One optional remote operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Capability {
    /// `WUU_MountBundle`
    MountBundle,
    /// `WUU_UnmountBundle`
    UnmountBundle,
    /// `WUU_FileOpen`
    FileOpen,
    /// `WUU_FileRead`
    FileRead,
    /// `WUU_FileClose`
    FileClose,
    /// `WUU_FileExists`
    FileExists,
    /// `WUU_GetRPXInfo`
    GetRpxInfo,
}

impl Capability {
    /// Every optional capability, in resolution order.
    pub const ALL: [Capability; 7] = [
        Capability::MountBundle,
        Capability::UnmountBundle,
        Capability::FileOpen,
        Capability::FileRead,
        Capability::FileClose,
        Capability::FileExists,
        Capability::GetRpxInfo,
    ];

    /// Exported symbol name.
    pub fn export_name(self) -> &'static str {
        match self {
            Capability::MountBundle => exports::MOUNT_BUNDLE,
            Capability::UnmountBundle => exports::UNMOUNT_BUNDLE,
            Capability::FileOpen => exports::FILE_OPEN,
            Capability::FileRead => exports::FILE_READ,
            Capability::FileClose => exports::FILE_CLOSE,
            Capability::FileExists => exports::FILE_EXISTS,
            Capability::GetRpxInfo => exports::GET_RPX_INFO,
        }
    }

    /// First module version that provides this capability.
    pub fn min_version(self) -> Version {
        match self {
            Capability::MountBundle
            | Capability::UnmountBundle
            | Capability::FileOpen
            | Capability::FileRead
            | Capability::FileClose
            | Capability::FileExists
            | Capability::GetRpxInfo => 1,
        }
    }

    /// Short human-readable name.
    pub fn as_str(self) -> &'static str {
        match self {
            Capability::MountBundle => "mount",
            Capability::UnmountBundle => "unmount",
            Capability::FileOpen => "file-open",
            Capability::FileRead => "file-read",
            Capability::FileClose => "file-close",
            Capability::FileExists => "file-exists",
            Capability::GetRpxInfo => "rpx-info",
        }
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolved optional exports. `None` means the module does not provide it.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Exports {
    pub(crate) mount_bundle: Option<MountBundleFn>,
    pub(crate) unmount_bundle: Option<UnmountBundleFn>,
    pub(crate) file_open: Option<FileOpenFn>,
    pub(crate) file_read: Option<FileReadFn>,
    pub(crate) file_close: Option<FileCloseFn>,
    pub(crate) file_exists: Option<FileExistsFn>,
    pub(crate) get_rpx_info: Option<GetRpxInfoFn>,
}

impl Exports {
    fn resolve(module: &impl ModuleExports) -> Self {
        unsafe {
            Exports {
                mount_bundle: optional(module, Capability::MountBundle),
                unmount_bundle: optional(module, Capability::UnmountBundle),
                file_open: optional(module, Capability::FileOpen),
                file_read: optional(module, Capability::FileRead),
                file_close: optional(module, Capability::FileClose),
                file_exists: optional(module, Capability::FileExists),
                get_rpx_info: optional(module, Capability::GetRpxInfo),
            }
        }
    }

    fn has(&self, capability: Capability) -> bool {
        match capability {
            Capability::MountBundle => self.mount_bundle.is_some(),
            Capability::UnmountBundle => self.unmount_bundle.is_some(),
            Capability::FileOpen => self.file_open.is_some(),
            Capability::FileRead => self.file_read.is_some(),
            Capability::FileClose => self.file_close.is_some(),
            Capability::FileExists => self.file_exists.is_some(),
            Capability::GetRpxInfo => self.get_rpx_info.is_some(),
        }
    }
}

/// # Safety
/// `F` must be the signature of `capability`'s export.
unsafe fn optional<F: Copy>(module: &impl ModuleExports, capability: Capability) -> Option<F> {
    match resolve_export(module, capability.export_name()) {
        Ok(f) => Some(f),
        Err(err) => {
            tracing::warn!(
                export = capability.export_name(),
                error = %err,
                "optional export not found"
            );
            None
        }
    }
}

// ============================================================================
// Binding
// ============================================================================

/// Bound state of the system module.
///
/// Owns the acquired module; every resolved pointer is valid for as long as
/// the binding holds it.
pub struct ModuleBinding<L: ModuleLoader> {
    loader: L,
    module_name: String,
    module: Option<L::Module>,
    get_version: Option<GetVersionFn>,
    exports: Exports,
    version: Option<Version>,
}

impl<L: ModuleLoader> ModuleBinding<L> {
    /// Create an unbound binding for the module registered as `module_name`.
    pub fn new(loader: L, module_name: impl Into<String>) -> Self {
        Self {
            loader,
            module_name: module_name.into(),
            module: None,
            get_version: None,
            exports: Exports::default(),
            version: None,
        }
    }

    /// Acquire the module, query its version, and resolve optional exports.
    ///
    /// Calling this again re-acquires the module and refreshes every pointer;
    /// the previously held module is released afterwards.
    pub fn bind(&mut self) -> WuhbResult<Version> {
        let module = self.loader.acquire(&self.module_name).map_err(|err| {
            tracing::error!(module = %self.module_name, error = %err, "acquiring module failed");
            WuhbError::ModuleNotFound
        })?;

        let get_version: GetVersionFn =
            unsafe { resolve_export(&module, exports::GET_VERSION) }.map_err(|err| {
                tracing::error!(
                    module = %self.module_name,
                    error = %err,
                    "version export not found"
                );
                WuhbError::ModuleMissingExport
            })?;

        let version = query_version(get_version).map_err(|err| {
            tracing::error!(module = %self.module_name, error = %err, "version query failed");
            WuhbError::UnsupportedVersion
        })?;

        let exports = Exports::resolve(&module);

        // Replacing the module drops the old acquisition only after the new
        // one is in place.
        self.module = Some(module);
        self.get_version = Some(get_version);
        self.exports = exports;
        self.version = Some(version);

        tracing::info!(
            module = %self.module_name,
            version,
            capabilities = self.capabilities().len(),
            "module bound"
        );
        Ok(version)
    }

    /// Query the module's version without touching the recorded one.
    ///
    /// Resolves the version export first if it has never been resolved, so
    /// this works before [`ModuleBinding::bind`].
    pub fn query_version(&mut self) -> WuhbResult<Version> {
        let get_version = self.version_export()?;
        query_version(get_version)
    }

    /// Resolve the version export if it is still unresolved, without calling
    /// it.
    pub fn resolve_version(&mut self) -> WuhbResult<()> {
        self.version_export().map(|_| ())
    }

    fn version_export(&mut self) -> WuhbResult<GetVersionFn> {
        if let Some(f) = self.get_version {
            return Ok(f);
        }
        let module = self.loader.acquire(&self.module_name).map_err(|err| {
            tracing::warn!(module = %self.module_name, error = %err, "acquiring module failed");
            WuhbError::ModuleNotFound
        })?;
        let get_version: GetVersionFn =
            unsafe { resolve_export(&module, exports::GET_VERSION) }.map_err(|err| {
                tracing::warn!(
                    module = %self.module_name,
                    error = %err,
                    "version export not found"
                );
                WuhbError::ModuleMissingExport
            })?;
        self.module = Some(module);
        self.get_version = Some(get_version);
        Ok(get_version)
    }

    /// Apply the two-tier gate to `capability` and hand out its pointer.
    pub(crate) fn require<F>(&self, capability: Capability, f: Option<F>) -> WuhbResult<F> {
        let version = self.version.ok_or(WuhbError::LibUninitialized)?;
        match f {
            Some(f) if version >= capability.min_version() => Ok(f),
            _ => Err(WuhbError::UnsupportedCommand),
        }
    }

    /// The gate alone, for callers that validate arguments before calling.
    pub fn gate(&self, capability: Capability) -> WuhbResult<()> {
        self.require(capability, self.exports.has(capability).then_some(()))
    }

    pub(crate) fn exports(&self) -> &Exports {
        &self.exports
    }

    /// Check whether `capability` would pass the gate right now.
    pub fn has(&self, capability: Capability) -> bool {
        match self.version {
            Some(version) => self.exports.has(capability) && version >= capability.min_version(),
            None => false,
        }
    }

    /// Capabilities currently available, in resolution order.
    pub fn capabilities(&self) -> Vec<Capability> {
        Capability::ALL
            .into_iter()
            .filter(|&capability| self.has(capability))
            .collect()
    }

    /// Version recorded by the last successful bind.
    pub fn version(&self) -> Option<Version> {
        self.version
    }

    /// Whether a version has been discovered.
    pub fn is_bound(&self) -> bool {
        self.version.is_some()
    }

    /// Name the module is acquired under.
    pub fn module_name(&self) -> &str {
        &self.module_name
    }

    /// The currently held module, if any.
    pub fn module(&self) -> Option<&L::Module> {
        self.module.as_ref()
    }

    /// The loader this binding acquires through.
    pub fn loader(&self) -> &L {
        &self.loader
    }
}

impl<L: ModuleLoader> std::fmt::Debug for ModuleBinding<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleBinding")
            .field("module_name", &self.module_name)
            .field("acquired", &self.module.is_some())
            .field("version", &self.version)
            .field("capabilities", &self.capabilities())
            .finish()
    }
}

fn query_version(get_version: GetVersionFn) -> WuhbResult<Version> {
    let mut version: Version = 0;
    let raw = unsafe { get_version(&mut version) };
    Operation::GetVersion.translate(raw)?;
    Ok(version)
}
