// src/config/mod.rs

//! Configuration loading and validation for pipewright.
//!
//! Responsibilities:
//! - Define the config value tree (`node.rs`) and the immutable store
//!   (`store.rs`).
//! - Define typed views of the reserved sections (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate section shapes and pipeline composition (`validate.rs`).

pub mod loader;
pub mod model;
pub mod node;
pub mod store;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path};
pub use model::{Settings, ToolSpec, VersionRuleSpec, WatchRule};
pub use node::{ConfigNode, Mapping, Scalar};
pub use store::ConfigStore;
pub use validate::validate_store;
