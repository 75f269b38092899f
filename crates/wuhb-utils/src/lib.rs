//! WUHB bundle utilities client
//!
//! Binds at runtime to the `homebrew_wuhb_utils` system module and exposes
//! its bundle and file operations under a stable, versioned API:
//! - Capability binding: the version export is mandatory, every other
//!   export is optional and gated by the module's reported version
//! - Per-operation translation of module error codes into [`Status`]
//! - An adaptive whole-file reader built on the module's handle-based reads
//!
//! ```ignore
//! use wuhb_utils::{BinderConfig, BundleSource, Session};
//!
//! let mut session = Session::new(&BinderConfig::from_env()?);
//! session.init_library()?;
//! session.mount_bundle("app", "fs:/vol/external01/app.wuhb", BundleSource::FileDescriptor)?;
//! let icon = session.read_whole_file("app:/meta/iconTex.tga")?;
//! session.unmount_bundle("app")?;
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod binder;
pub mod config;
pub mod loader;
pub mod reader;
pub mod session;
pub mod status;
pub mod translate;

pub use binder::{Capability, ModuleBinding};
pub use config::{BinderConfig, ConfigError};
pub use loader::{
    DynamicLoader, ExportTable, InProcessLoader, LoadError, ModuleExports, ModuleLoader,
};
pub use reader::{read_whole_file, BufferAllocator, FileAccess, GrowBuffer, SystemAllocator};
pub use session::Session;
pub use status::{status_str, Status, WuhbError, WuhbResult};
pub use translate::Operation;

pub use wuhb_utils_abi::{ApiError, BundleSource, FileHandle, RpxInfo, Version};
