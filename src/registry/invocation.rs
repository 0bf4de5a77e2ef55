// src/registry/invocation.rs

use std::path::PathBuf;

use crate::config::node::{ConfigNode, Mapping};
use crate::types::TaskName;

/// Fully concrete unit of work handed to a tool.
///
/// Paths are relative to the process working directory (the project root
/// joined with the target's `cwd`).
#[derive(Debug, Clone, PartialEq)]
pub struct TargetInvocation {
    pub task: TaskName,
    pub target: String,
    pub tool: String,
    pub src: Vec<PathBuf>,
    pub dest: Option<PathBuf>,
    pub options: Mapping,
}

impl TargetInvocation {
    pub fn identity(&self) -> String {
        format!("{}:{}", self.task, self.target)
    }

    pub fn option(&self, key: &str) -> Option<&ConfigNode> {
        self.options.get(key)
    }

    /// String form of a scalar option.
    pub fn option_str(&self, key: &str) -> Option<String> {
        match self.options.get(key)? {
            ConfigNode::Scalar(s) => Some(s.to_string()),
            _ => None,
        }
    }
}
