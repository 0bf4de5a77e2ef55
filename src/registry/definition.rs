// src/registry/definition.rs

//! Task and target definitions read out of the config tree.

use crate::config::model::expect_mapping;
use crate::config::node::{optional_bool, optional_str, ConfigNode, Mapping};
use crate::errors::{PipewrightError, Result};
use crate::types::{SourceFilter, TaskName};

/// Task-level key naming the tool kind that runs the task.
pub const TOOL_KEY: &str = "tool";
/// Task- and target-level key holding tool options.
pub const OPTIONS_KEY: &str = "options";

const TARGET_KEYS: &[&str] = &[
    "src", "dest", "cwd", "ext", "expand", "flatten", "filter", OPTIONS_KEY,
];

/// A task as declared: its tool kind and its targets in declaration order.
///
/// Target bodies are not resolved here; templates inside them are only
/// evaluated when the target is actually used.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskDefinition {
    pub name: TaskName,
    pub tool: String,
    pub targets: Vec<String>,
}

impl TaskDefinition {
    pub fn has_target(&self, target: &str) -> bool {
        self.targets.iter().any(|t| t == target)
    }
}

/// Concrete (template-free) description of one target.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TargetSpec {
    pub src: Vec<String>,
    pub dest: Option<String>,
    pub cwd: Option<String>,
    pub ext: Option<String>,
    pub expand: bool,
    pub flatten: bool,
    pub filter: Option<SourceFilter>,
    pub options: Mapping,
}

impl TargetSpec {
    /// Interpret a resolved target node.
    ///
    /// A bare string or list is shorthand for `{ src = ... }`.
    pub fn from_resolved(identity: &str, node: &ConfigNode) -> Result<Self> {
        let map = match node {
            ConfigNode::Scalar(_) | ConfigNode::Sequence(_) => {
                return Ok(Self {
                    src: node.to_string_list(&format!("{identity}.src"))?,
                    ..Self::default()
                });
            }
            other => expect_mapping(other, identity)?,
        };

        if let Some(unknown) = map.keys().find(|k| !TARGET_KEYS.contains(&k.as_str())) {
            return Err(PipewrightError::ConfigError(format!(
                "unknown key `{unknown}` in target {identity} (expected one of {})",
                TARGET_KEYS.join(", ")
            )));
        }

        let src = match map.get("src") {
            Some(node) => node.to_string_list(&format!("{identity}.src"))?,
            None => Vec::new(),
        };
        let filter = optional_str(map, "filter", identity)?
            .map(|s| s.parse::<SourceFilter>())
            .transpose()
            .map_err(|e| PipewrightError::ConfigError(format!("{identity}.filter: {e}")))?;
        let options = match map.get(OPTIONS_KEY) {
            Some(node) => expect_mapping(node, &format!("{identity}.{OPTIONS_KEY}"))?.clone(),
            None => Mapping::new(),
        };

        Ok(Self {
            src,
            dest: optional_str(map, "dest", identity)?,
            cwd: optional_str(map, "cwd", identity)?,
            ext: optional_str(map, "ext", identity)?,
            expand: optional_bool(map, "expand", identity)?.unwrap_or(false),
            flatten: optional_bool(map, "flatten", identity)?.unwrap_or(false),
            filter,
            options,
        })
    }
}

/// A target with its task context and merged options.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedTarget {
    pub task: TaskName,
    pub target: String,
    pub tool: String,
    pub spec: TargetSpec,
}

impl ResolvedTarget {
    /// `task:target`, the name used in logs and errors.
    pub fn identity(&self) -> String {
        format!("{}:{}", self.task, self.target)
    }
}

/// Shallow-merge task-wide options under target options; target keys win.
pub fn merge_options(task_options: &Mapping, target_options: &Mapping) -> Mapping {
    let mut merged = task_options.clone();
    for (key, value) in target_options {
        merged.insert(key.clone(), value.clone());
    }
    merged
}
