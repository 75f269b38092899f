//! Binder configuration
//!
//! Which module to bind and where the dynamic loader looks for it. Read from a
//! TOML file or from the environment.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::loader::DynamicLoader;

/// Environment variable overriding the module name (or path).
pub const MODULE_ENV: &str = "WUHB_UTILS_MODULE";

/// Environment variable holding extra search directories, in the platform's
/// path-list syntax.
pub const MODULE_PATH_ENV: &str = "WUHB_UTILS_MODULE_PATH";

/// Errors that can occur while loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file
    #[error("Failed to read config: {0}")]
    IoError(#[from] std::io::Error),

    /// Failed to parse TOML
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Validation error
    #[error("Invalid config: {0}")]
    ValidationError(String),
}

/// How the system module is located.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct BinderConfig {
    /// Module name, or a path to the module file
    pub module_name: String,

    /// Directories searched before the system loader's own search
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub search_paths: Vec<PathBuf>,
}

impl Default for BinderConfig {
    fn default() -> Self {
        Self {
            module_name: wuhb_utils_abi::exports::MODULE_NAME.to_string(),
            search_paths: Vec::new(),
        }
    }
}

impl BinderConfig {
    /// Parse a configuration from a file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Parse a configuration from a string
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        let config: BinderConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults with the process environment applied
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env(|key| std::env::var_os(key))?;
        Ok(config)
    }

    /// Apply [`MODULE_ENV`] and [`MODULE_PATH_ENV`] as returned by `lookup`.
    ///
    /// The module variable replaces the name; path entries are appended after
    /// any configured search paths.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<std::ffi::OsString>,
    {
        if let Some(module) = lookup(MODULE_ENV) {
            self.module_name = module.into_string().map_err(|_| {
                ConfigError::ValidationError(format!("{} is not valid UTF-8", MODULE_ENV))
            })?;
        }
        if let Some(paths) = lookup(MODULE_PATH_ENV) {
            self.search_paths.extend(
                std::env::split_paths(&paths).filter(|p| !p.as_os_str().is_empty()),
            );
        }
        self.validate()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.module_name.is_empty() {
            return Err(ConfigError::ValidationError(
                "module_name cannot be empty".to_string(),
            ));
        }
        if self.module_name.contains('\0') {
            return Err(ConfigError::ValidationError(
                "module_name cannot contain a NUL byte".to_string(),
            ));
        }
        Ok(())
    }

    /// Dynamic loader searching this configuration's paths
    pub fn loader(&self) -> DynamicLoader {
        DynamicLoader::with_search_paths(self.search_paths.clone())
    }
}
