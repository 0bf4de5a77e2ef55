// src/config/node.rs

//! The Config Store's value tree.

use std::fmt;

use indexmap::IndexMap;

use crate::errors::{PipewrightError, Result};
use crate::template::OPEN;

/// Ordered mapping; declaration order of targets and steps is significant.
pub type Mapping = IndexMap<String, ConfigNode>;

#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::String(s) => f.write_str(s),
            Scalar::Integer(i) => write!(f, "{i}"),
            Scalar::Float(x) => write!(f, "{x}"),
            Scalar::Bool(b) => write!(f, "{b}"),
        }
    }
}

/// A node of the declarative config tree.
///
/// `TemplateRef` holds the raw string of a value containing at least one
/// `{{ ... }}` placeholder. It only ever appears as a value, never as a key.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigNode {
    Scalar(Scalar),
    Sequence(Vec<ConfigNode>),
    Mapping(Mapping),
    TemplateRef(String),
}

impl ConfigNode {
    /// Build a string node, classifying it as a template when it contains a
    /// placeholder opener.
    pub fn string(s: impl Into<String>) -> Self {
        let s = s.into();
        if s.contains(OPEN) {
            ConfigNode::TemplateRef(s)
        } else {
            ConfigNode::Scalar(Scalar::String(s))
        }
    }

    /// Convert a parsed TOML value.
    ///
    /// Fails if a table key looks like a template.
    pub fn from_toml(value: toml::Value) -> Result<Self> {
        Ok(match value {
            toml::Value::String(s) => ConfigNode::string(s),
            toml::Value::Integer(i) => ConfigNode::Scalar(Scalar::Integer(i)),
            toml::Value::Float(x) => ConfigNode::Scalar(Scalar::Float(x)),
            toml::Value::Boolean(b) => ConfigNode::Scalar(Scalar::Bool(b)),
            toml::Value::Datetime(dt) => ConfigNode::Scalar(Scalar::String(dt.to_string())),
            toml::Value::Array(items) => ConfigNode::Sequence(
                items
                    .into_iter()
                    .map(ConfigNode::from_toml)
                    .collect::<Result<Vec<_>>>()?,
            ),
            toml::Value::Table(table) => ConfigNode::Mapping(mapping_from_toml(table)?),
        })
    }

    /// Short name of the variant, for error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            ConfigNode::Scalar(Scalar::String(_)) => "string",
            ConfigNode::Scalar(Scalar::Integer(_)) => "integer",
            ConfigNode::Scalar(Scalar::Float(_)) => "float",
            ConfigNode::Scalar(Scalar::Bool(_)) => "boolean",
            ConfigNode::Sequence(_) => "sequence",
            ConfigNode::Mapping(_) => "mapping",
            ConfigNode::TemplateRef(_) => "template",
        }
    }

    /// True if no `TemplateRef` remains anywhere below this node.
    pub fn is_concrete(&self) -> bool {
        match self {
            ConfigNode::Scalar(_) => true,
            ConfigNode::TemplateRef(_) => false,
            ConfigNode::Sequence(items) => items.iter().all(ConfigNode::is_concrete),
            ConfigNode::Mapping(map) => map.values().all(ConfigNode::is_concrete),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ConfigNode::Scalar(Scalar::String(s)) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ConfigNode::Scalar(Scalar::Bool(b)) => Some(*b),
            ConfigNode::Scalar(Scalar::String(s)) => s.parse().ok(),
            _ => None,
        }
    }

    pub fn as_mapping(&self) -> Option<&Mapping> {
        match self {
            ConfigNode::Mapping(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&[ConfigNode]> {
        match self {
            ConfigNode::Sequence(items) => Some(items),
            _ => None,
        }
    }

    /// Render a resolved scalar or sequence for embedding inside a string.
    ///
    /// Sequences render as their items joined by `,`; mappings cannot be
    /// embedded.
    pub fn render_inline(&self) -> Option<String> {
        match self {
            ConfigNode::Scalar(s) => Some(s.to_string()),
            ConfigNode::Sequence(items) => items
                .iter()
                .map(ConfigNode::render_inline)
                .collect::<Option<Vec<_>>>()
                .map(|parts| parts.join(",")),
            ConfigNode::Mapping(_) | ConfigNode::TemplateRef(_) => None,
        }
    }

    /// Interpret a resolved node as a list of strings.
    ///
    /// A single scalar is a one-element list; nested sequences are flattened
    /// (a list element that referenced another list).
    pub fn to_string_list(&self, what: &str) -> Result<Vec<String>> {
        let mut out = Vec::new();
        collect_strings(self, what, &mut out)?;
        Ok(out)
    }
}

fn collect_strings(node: &ConfigNode, what: &str, out: &mut Vec<String>) -> Result<()> {
    match node {
        ConfigNode::Scalar(s) => out.push(s.to_string()),
        ConfigNode::Sequence(items) => {
            for item in items {
                collect_strings(item, what, out)?;
            }
        }
        other => {
            return Err(PipewrightError::ConfigError(format!(
                "{what} must be a string or a list of strings (got {})",
                other.kind()
            )));
        }
    }
    Ok(())
}

fn mapping_from_toml(table: toml::Table) -> Result<Mapping> {
    let mut map = Mapping::with_capacity(table.len());
    for (key, value) in table {
        if key.contains(OPEN) {
            return Err(PipewrightError::ConfigError(format!(
                "template placeholders are not allowed in keys (found '{key}')"
            )));
        }
        map.insert(key, ConfigNode::from_toml(value)?);
    }
    Ok(map)
}

impl From<&str> for ConfigNode {
    fn from(s: &str) -> Self {
        ConfigNode::string(s)
    }
}

impl From<bool> for ConfigNode {
    fn from(b: bool) -> Self {
        ConfigNode::Scalar(Scalar::Bool(b))
    }
}

impl From<i64> for ConfigNode {
    fn from(i: i64) -> Self {
        ConfigNode::Scalar(Scalar::Integer(i))
    }
}

/// Look up an optional string field of a resolved mapping.
pub fn optional_str(map: &Mapping, key: &str, owner: &str) -> Result<Option<String>> {
    match map.get(key) {
        None => Ok(None),
        Some(ConfigNode::Scalar(s)) => Ok(Some(s.to_string())),
        Some(other) => Err(PipewrightError::ConfigError(format!(
            "{owner}.{key} must be a string (got {})",
            other.kind()
        ))),
    }
}

/// Look up an optional boolean field of a resolved mapping.
pub fn optional_bool(map: &Mapping, key: &str, owner: &str) -> Result<Option<bool>> {
    match map.get(key) {
        None => Ok(None),
        Some(node) => node.as_bool().map(Some).ok_or_else(|| {
            PipewrightError::ConfigError(format!(
                "{owner}.{key} must be a boolean (got {})",
                node.kind()
            ))
        }),
    }
}
