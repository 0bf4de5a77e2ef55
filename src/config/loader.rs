// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::store::ConfigStore;
use crate::config::validate::validate_store;
use crate::errors::{PipewrightError, Result};

/// Default config file name, looked up in the current working directory.
pub const DEFAULT_CONFIG_FILE: &str = "Pipewright.toml";

/// Load a configuration file from a given path into a [`ConfigStore`].
///
/// This only performs TOML deserialization and the structural checks done by
/// [`ConfigStore::load`]; it does **not** validate sections or pipelines. Use
/// [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<ConfigStore> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|e| {
        PipewrightError::ConfigError(format!("cannot read config file {:?}: {e}", path))
    })?;

    ConfigStore::from_toml_str(&contents)
}

/// Load a configuration file from path and run validation.
///
/// This is the recommended entry point for the rest of the application:
///
/// - Reads TOML (insertion order preserved).
/// - Applies `[settings]` defaults.
/// - Checks reserved section shapes and pipeline composition cycles, so that
///   no task runs against a malformed tree.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigStore> {
    let store = load_from_path(&path)?;
    validate_store(&store)?;
    Ok(store)
}

/// Helper to resolve a default config path.
pub fn default_config_path() -> PathBuf {
    PathBuf::from(DEFAULT_CONFIG_FILE)
}
