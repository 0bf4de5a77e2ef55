// src/config/model.rs

//! Typed views over the reserved sections of the config document.
//!
//! ```toml
//! [settings]
//! debounce_ms = 300
//!
//! [pipelines]
//! build-css = ["clean:css", "less", "usebanner:css"]
//! default = ["build-css"]
//!
//! [watch.less]
//! files = ["less/*.less"]
//! pipeline = "build-css"
//!
//! [versions.js]
//! prefix = "Selectpicker.VERSION = '"
//! files = ["js/bootstrap-select.js"]
//!
//! [tools.less]
//! cmd = "lessc [src] [dest]"
//! ```
//!
//! Everything outside these sections is free-form data or a task definition.

use serde::Deserialize;

use crate::config::node::{optional_str, ConfigNode, Mapping};
use crate::errors::{PipewrightError, Result};
use crate::types::SourceFilter;

pub const SETTINGS_KEY: &str = "settings";
pub const PIPELINES_KEY: &str = "pipelines";
pub const WATCH_KEY: &str = "watch";
pub const VERSIONS_KEY: &str = "versions";
pub const TOOLS_KEY: &str = "tools";

/// Top-level keys that never name a task.
pub const RESERVED_KEYS: &[&str] = &[
    SETTINGS_KEY,
    PIPELINES_KEY,
    WATCH_KEY,
    VERSIONS_KEY,
    TOOLS_KEY,
];

/// Default version prefix: matches `version: "1.2.3"` and `"version": "1.2.3"`.
pub const DEFAULT_VERSION_PREFIX: &str = r#"['"]?version['"]?:[ "']*"#;

/// `[settings]` section.
///
/// Read straight from TOML, so its values cannot contain templates.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    /// Quiet window after the last file event before a rebuild starts.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// How long cancellation waits for an in-flight rebuild.
    #[serde(default = "default_grace_period_ms")]
    pub grace_period_ms: u64,

    /// Fail with `EmptySourceSet` when a target matches no files.
    #[serde(default)]
    pub strict_sources: bool,

    /// Fail with `NoMatchFound` when a version rule replaces nothing.
    #[serde(default)]
    pub strict_versions: bool,

    /// Pipeline run by `pipewright run` with no argument.
    #[serde(default = "default_pipeline")]
    pub default_pipeline: String,
}

fn default_debounce_ms() -> u64 {
    300
}

fn default_grace_period_ms() -> u64 {
    5000
}

fn default_pipeline() -> String {
    "default".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            grace_period_ms: default_grace_period_ms(),
            strict_sources: false,
            strict_versions: false,
            default_pipeline: default_pipeline(),
        }
    }
}

/// A resolved `[watch.<name>]` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchRule {
    pub name: String,
    pub files: Vec<String>,
    pub exclude: Vec<String>,
    pub pipeline: String,
}

impl WatchRule {
    pub fn from_resolved(name: &str, node: &ConfigNode) -> Result<Self> {
        let owner = format!("{WATCH_KEY}.{name}");
        let map = expect_mapping(node, &owner)?;

        let files = required(map, "files", &owner)?.to_string_list(&format!("{owner}.files"))?;
        let exclude = match map.get("exclude") {
            Some(node) => node.to_string_list(&format!("{owner}.exclude"))?,
            None => Vec::new(),
        };
        let pipeline = optional_str(map, "pipeline", &owner)?
            .or(optional_str(map, "tasks", &owner)?)
            .ok_or_else(|| {
                PipewrightError::ConfigError(format!("{owner} must name a `pipeline`"))
            })?;

        if files.is_empty() {
            return Err(PipewrightError::ConfigError(format!(
                "{owner}.files must list at least one pattern"
            )));
        }

        Ok(Self {
            name: name.to_string(),
            files,
            exclude,
            pipeline,
        })
    }
}

/// A resolved `[versions.<name>]` entry (without the target version).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionRuleSpec {
    pub name: String,
    pub prefix: String,
    pub files: Vec<String>,
}

impl VersionRuleSpec {
    pub fn from_resolved(name: &str, node: &ConfigNode) -> Result<Self> {
        let owner = format!("{VERSIONS_KEY}.{name}");
        let map = expect_mapping(node, &owner)?;

        let prefix = optional_str(map, "prefix", &owner)?
            .unwrap_or_else(|| DEFAULT_VERSION_PREFIX.to_string());
        let files = required(map, "files", &owner)?.to_string_list(&format!("{owner}.files"))?;

        Ok(Self {
            name: name.to_string(),
            prefix,
            files,
        })
    }
}

/// A resolved `[tools.<kind>]` entry describing an external command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolSpec {
    pub kind: String,
    pub cmd: String,
    pub filter: Option<SourceFilter>,
}

impl ToolSpec {
    pub fn from_resolved(kind: &str, node: &ConfigNode) -> Result<Self> {
        let owner = format!("{TOOLS_KEY}.{kind}");
        let map = expect_mapping(node, &owner)?;

        let cmd = optional_str(map, "cmd", &owner)?
            .ok_or_else(|| PipewrightError::ConfigError(format!("{owner} must define `cmd`")))?;
        let filter = optional_str(map, "filter", &owner)?
            .map(|s| s.parse::<SourceFilter>())
            .transpose()
            .map_err(|e| PipewrightError::ConfigError(format!("{owner}.filter: {e}")))?;

        Ok(Self {
            kind: kind.to_string(),
            cmd,
            filter,
        })
    }
}

pub(crate) fn expect_mapping<'a>(node: &'a ConfigNode, owner: &str) -> Result<&'a Mapping> {
    node.as_mapping().ok_or_else(|| {
        PipewrightError::ConfigError(format!("{owner} must be a table (got {})", node.kind()))
    })
}

fn required<'a>(map: &'a Mapping, key: &str, owner: &str) -> Result<&'a ConfigNode> {
    map.get(key)
        .ok_or_else(|| PipewrightError::ConfigError(format!("{owner} is missing `{key}`")))
}
