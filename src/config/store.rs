// src/config/store.rs

use crate::config::model::{Settings, SETTINGS_KEY};
use crate::config::node::{ConfigNode, Mapping};
use crate::errors::{PipewrightError, Result};

/// Immutable config tree, built once at startup and shared by reference.
///
/// Template strings are stored verbatim; interpreting them is left to
/// [`crate::template::Resolver`] so that earlier nodes may reference later
/// ones.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    root: Mapping,
    settings: Settings,
}

impl ConfigStore {
    /// Build a store from a parsed TOML document.
    ///
    /// Only structural problems are reported here (template keys, a bad
    /// `[settings]` table); section shapes are checked by
    /// [`crate::config::validate`].
    pub fn load(mut raw: toml::Table) -> Result<Self> {
        let settings = match raw.remove(SETTINGS_KEY) {
            Some(value @ toml::Value::Table(_)) => value.try_into::<Settings>().map_err(|e| {
                PipewrightError::ConfigError(format!("invalid [{SETTINGS_KEY}] section: {e}"))
            })?,
            Some(other) => {
                return Err(PipewrightError::ConfigError(format!(
                    "[{SETTINGS_KEY}] must be a table (got {})",
                    other.type_str()
                )));
            }
            None => Settings::default(),
        };

        let root = match ConfigNode::from_toml(toml::Value::Table(raw))? {
            ConfigNode::Mapping(map) => map,
            other => {
                return Err(PipewrightError::ConfigError(format!(
                    "config root must be a table (got {})",
                    other.kind()
                )));
            }
        };

        Ok(Self { root, settings })
    }

    /// Parse TOML text and build a store.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let table: toml::Table = toml::from_str(contents)?;
        Self::load(table)
    }

    /// Build a store from an already converted mapping.
    pub fn from_mapping(root: Mapping, settings: Settings) -> Self {
        Self { root, settings }
    }

    pub fn root(&self) -> &Mapping {
        &self.root
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// A top-level mapping section, if present.
    pub fn section(&self, key: &str) -> Option<&ConfigNode> {
        self.root.get(key)
    }

    /// Look up a dotted path.
    ///
    /// `.` descends into mappings; numeric segments index sequences.
    pub fn get(&self, path: &str) -> Result<&ConfigNode> {
        let not_found = || PipewrightError::PathNotFound(path.to_string());

        let mut segments = path.split('.');
        let first = segments.next().filter(|s| !s.is_empty()).ok_or_else(not_found)?;
        let mut node = self.root.get(first).ok_or_else(not_found)?;

        for segment in segments {
            node = match node {
                ConfigNode::Mapping(map) => map.get(segment),
                ConfigNode::Sequence(items) => {
                    segment.parse::<usize>().ok().and_then(|i| items.get(i))
                }
                _ => None,
            }
            .ok_or_else(not_found)?;
        }

        Ok(node)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.get(path).is_ok()
    }
}
