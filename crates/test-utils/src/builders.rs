#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use pipewright::config::ConfigStore;
use pipewright::fs::FileSystem;
use pipewright::project::Project;
use toml::{Table, Value};

/// Builds a config document by dotted path, the way a `Pipewright.toml`
/// would spell it.
///
/// ```ignore
/// let store = ConfigBuilder::new()
///     .set("pkg.version", "1.2.3")
///     .set("copy.assets", Value::Array(vec!["a.txt".into()]))
///     .pipeline("default", &["copy"])
///     .build();
/// ```
#[derive(Debug, Clone, Default)]
pub struct ConfigBuilder {
    doc: Table,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from TOML text.
    pub fn from_toml(text: &str) -> Self {
        Self {
            doc: toml::from_str(text).expect("builder seed must be valid TOML"),
        }
    }

    /// Set `value` at a dotted path, creating intermediate tables.
    pub fn set(mut self, path: &str, value: impl Into<Value>) -> Self {
        let mut parts: Vec<&str> = path.split('.').collect();
        let last = parts.pop().expect("path must not be empty");

        let mut table = &mut self.doc;
        for part in parts {
            let entry = table
                .entry(part.to_string())
                .or_insert_with(|| Value::Table(Table::new()));
            table = entry
                .as_table_mut()
                .unwrap_or_else(|| panic!("'{part}' in '{path}' is not a table"));
        }
        table.insert(last.to_string(), value.into());
        self
    }

    /// Set a list of strings at a dotted path.
    pub fn set_list(self, path: &str, items: &[&str]) -> Self {
        self.set(path, strings(items))
    }

    pub fn pipeline(self, name: &str, steps: &[&str]) -> Self {
        self.set_list(&format!("pipelines.{name}"), steps)
    }

    pub fn watch(self, rule: &str, files: &[&str], pipeline: &str) -> Self {
        self.set_list(&format!("watch.{rule}.files"), files)
            .set(&format!("watch.{rule}.pipeline"), pipeline)
    }

    pub fn version_rule(self, rule: &str, files: &[&str]) -> Self {
        self.set_list(&format!("versions.{rule}.files"), files)
    }

    pub fn setting(self, key: &str, value: impl Into<Value>) -> Self {
        self.set(&format!("settings.{key}"), value)
    }

    pub fn to_toml_string(&self) -> String {
        toml::to_string(&self.doc).expect("table always serializes")
    }

    pub fn build(self) -> ConfigStore {
        ConfigStore::load(self.doc).expect("failed to build a valid store from builder")
    }

    /// Validated project over `fs` rooted at `root`.
    pub fn project(self, fs: Arc<dyn FileSystem>, root: impl Into<PathBuf>) -> Project {
        Project::from_store(self.build(), fs, root).expect("builder config must validate")
    }
}

fn strings(items: &[&str]) -> Value {
    Value::Array(items.iter().map(|s| Value::String(s.to_string())).collect())
}
