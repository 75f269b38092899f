//! Modules linked into the running process
//!
//! Some hosts link the module's implementation directly instead of loading it
//! from disk. [`InProcessLoader`] serves such modules from tables of export
//! addresses registered up front.

use std::collections::HashMap;
use std::ffi::c_void;
use std::ptr::NonNull;
use std::sync::Arc;

use super::{LoadError, ModuleExports, ModuleLoader};

/// Export addresses of one in-process module, keyed by symbol name.
#[derive(Debug, Clone, Default)]
pub struct ExportTable {
    // Stored as integers so the table is Send + Sync.
    exports: HashMap<String, usize>,
}

impl ExportTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `address` under `symbol`. Null addresses are ignored.
    pub fn insert(&mut self, symbol: impl Into<String>, address: *const c_void) {
        if !address.is_null() {
            self.exports.insert(symbol.into(), address as usize);
        }
    }

    /// Builder-style [`ExportTable::insert`].
    pub fn with(mut self, symbol: impl Into<String>, address: *const c_void) -> Self {
        self.insert(symbol, address);
        self
    }

    /// Remove a symbol, returning whether it was present.
    pub fn remove(&mut self, symbol: &str) -> bool {
        self.exports.remove(symbol).is_some()
    }

    /// Check if a symbol is registered.
    pub fn contains(&self, symbol: &str) -> bool {
        self.exports.contains_key(symbol)
    }

    /// Number of registered symbols.
    pub fn len(&self) -> usize {
        self.exports.len()
    }

    /// Check if the table is empty.
    pub fn is_empty(&self) -> bool {
        self.exports.is_empty()
    }
}

/// A module acquired from an [`InProcessLoader`].
///
/// Each acquisition holds a reference on the shared table; dropping the
/// module releases it.
#[derive(Debug, Clone)]
pub struct InProcessModule {
    name: String,
    table: Arc<ExportTable>,
}

impl InProcessModule {
    /// The shared table backing this module.
    pub fn table(&self) -> &Arc<ExportTable> {
        &self.table
    }
}

impl ModuleExports for InProcessModule {
    fn find_export(&self, symbol: &str) -> Result<NonNull<c_void>, LoadError> {
        self.table
            .exports
            .get(symbol)
            .and_then(|&address| NonNull::new(address as *mut c_void))
            .ok_or_else(|| LoadError::SymbolNotFound {
                symbol: symbol.to_string(),
                library: self.name.clone(),
            })
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Loader over modules registered in-process.
#[derive(Debug, Clone, Default)]
pub struct InProcessLoader {
    modules: HashMap<String, Arc<ExportTable>>,
}

impl InProcessLoader {
    /// Create a loader with no modules.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a module under `name`, replacing any previous registration.
    pub fn register(&mut self, name: impl Into<String>, table: ExportTable) {
        self.modules.insert(name.into(), Arc::new(table));
    }

    /// Builder-style [`InProcessLoader::register`].
    pub fn with_module(mut self, name: impl Into<String>, table: ExportTable) -> Self {
        self.register(name, table);
        self
    }

    /// Number of live acquisitions of `name` (excluding the loader's own reference).
    pub fn live_acquisitions(&self, name: &str) -> usize {
        self.modules
            .get(name)
            .map(|table| Arc::strong_count(table) - 1)
            .unwrap_or(0)
    }
}

impl ModuleLoader for InProcessLoader {
    type Module = InProcessModule;

    fn acquire(&self, name: &str) -> Result<InProcessModule, LoadError> {
        let table = self.modules.get(name).ok_or_else(|| LoadError::NotFound {
            path: name.to_string(),
        })?;
        Ok(InProcessModule {
            name: name.to_string(),
            table: Arc::clone(table),
        })
    }
}
