//! Module acquisition and symbol lookup
//!
//! The binder never talks to the platform loader directly. It goes through
//! two small traits:
//! - [`ModuleLoader`]: turns a module name into an acquired module
//! - [`ModuleExports`]: looks up exported symbol addresses in that module
//!
//! Two loaders are provided: [`DynamicLoader`] for shared libraries on disk
//! and [`InProcessLoader`] for modules linked into the running process.

mod dynamic;
mod in_process;

use std::ffi::c_void;
use std::ptr::NonNull;
use thiserror::Error;

pub use dynamic::{DynamicLoader, Library};
pub use in_process::{ExportTable, InProcessLoader, InProcessModule};

/// Errors that can occur while acquiring a module or resolving a symbol
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LoadError {
    /// Module not found or could not be loaded
    #[error("Module not found: {path}")]
    NotFound {
        /// Name or path that was attempted
        path: String,
    },

    /// Symbol not found in module
    #[error("Symbol not found: {symbol} in {library}")]
    SymbolNotFound {
        /// Symbol name that was not found
        symbol: String,
        /// Module name or path
        library: String,
    },

    /// Platform-specific error
    #[error("Platform error: {0}")]
    PlatformError(String),

    /// Invalid path encoding
    #[error("Invalid UTF-8 in path: {0}")]
    InvalidPath(String),
}

/// An acquired module whose exports can be looked up by name.
pub trait ModuleExports {
    /// Address of the exported symbol `symbol`.
    fn find_export(&self, symbol: &str) -> Result<NonNull<c_void>, LoadError>;

    /// Name or path the module was acquired from.
    fn name(&self) -> &str;
}

/// Acquires modules by name.
pub trait ModuleLoader {
    /// Module type handed out by this loader. Dropping it releases the module.
    type Module: ModuleExports;

    /// Acquire the module registered as `name`.
    fn acquire(&self, name: &str) -> Result<Self::Module, LoadError>;
}

/// Look up `symbol` and reinterpret its address as the function pointer `F`.
///
/// # Safety
///
/// The caller must ensure:
/// - `F` is a function pointer type
/// - the export's real signature matches `F`
/// - the module stays acquired while the pointer is in use
pub unsafe fn resolve_export<F: Copy>(
    module: &impl ModuleExports,
    symbol: &str,
) -> Result<F, LoadError> {
    debug_assert_eq!(
        std::mem::size_of::<F>(),
        std::mem::size_of::<*mut c_void>(),
        "resolve_export target must be a function pointer"
    );
    let address = module.find_export(symbol)?;
    Ok(std::mem::transmute_copy(&address.as_ptr()))
}
