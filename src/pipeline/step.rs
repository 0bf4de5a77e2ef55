// src/pipeline/step.rs

use std::fmt;

use crate::errors::{PipewrightError, Result};

/// One entry of a pipeline: a bare name or `task:target`.
///
/// A bare name refers to a pipeline when one exists with that name, and to a
/// task (all of its targets) otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StepRef {
    Name(String),
    Target { task: String, target: String },
}

impl StepRef {
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        let invalid = || PipewrightError::ConfigError(format!("invalid pipeline step '{raw}'"));

        match raw.split_once(':') {
            None if !raw.is_empty() => Ok(StepRef::Name(raw.to_string())),
            None => Err(invalid()),
            Some((task, target)) => {
                let (task, target) = (task.trim(), target.trim());
                if task.is_empty() || target.is_empty() || target.contains(':') {
                    return Err(invalid());
                }
                Ok(StepRef::Target {
                    task: task.to_string(),
                    target: target.to_string(),
                })
            }
        }
    }

    /// The task this step names, if it is not a pipeline.
    pub fn task(&self) -> &str {
        match self {
            StepRef::Name(name) => name,
            StepRef::Target { task, .. } => task,
        }
    }
}

impl fmt::Display for StepRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepRef::Name(name) => f.write_str(name),
            StepRef::Target { task, target } => write!(f, "{task}:{target}"),
        }
    }
}

/// A step after pipeline flattening: always a task, optionally narrowed to
/// one target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskStep {
    pub task: String,
    pub target: Option<String>,
}

impl fmt::Display for TaskStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.target {
            Some(target) => write!(f, "{}:{target}", self.task),
            None => f.write_str(&self.task),
        }
    }
}
