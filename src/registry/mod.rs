// src/registry/mod.rs

//! Task/target registry.
//!
//! Looks tasks up in the config tree, resolves their targets through the
//! [`Resolver`] and expands source patterns into [`TargetInvocation`]s.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use crate::config::model::RESERVED_KEYS;
use crate::config::node::{ConfigNode, Mapping};
use crate::errors::{PipewrightError, Result};
use crate::fs::FileSystem;
use crate::template::Resolver;
use crate::types::SourceFilter;

pub mod definition;
pub mod expand;
pub mod invocation;

pub use definition::{merge_options, ResolvedTarget, TargetSpec, TaskDefinition};
pub use invocation::TargetInvocation;

use definition::{OPTIONS_KEY, TOOL_KEY};

#[derive(Debug)]
pub struct Registry {
    resolver: Arc<Resolver>,
    fs: Arc<dyn FileSystem>,
    root: PathBuf,
    strict: bool,
}

impl Registry {
    pub fn new(resolver: Arc<Resolver>, fs: Arc<dyn FileSystem>, root: impl Into<PathBuf>) -> Self {
        Self {
            resolver,
            fs,
            root: root.into(),
            strict: false,
        }
    }

    /// Fail with `EmptySourceSet` when a target matches no files.
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn resolver(&self) -> &Arc<Resolver> {
        &self.resolver
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// True if `name` is a top-level mapping that can act as a task.
    pub fn is_task(&self, name: &str) -> bool {
        !RESERVED_KEYS.contains(&name)
            && matches!(
                self.resolver.store().section(name),
                Some(ConfigNode::Mapping(_))
            )
    }

    /// Read a task's tool kind and target names.
    pub fn definition(&self, task: &str) -> Result<TaskDefinition> {
        if RESERVED_KEYS.contains(&task) {
            return Err(PipewrightError::ConfigError(format!(
                "'{task}' is a reserved section, not a task"
            )));
        }

        let node = self.resolver.store().section(task).ok_or_else(|| {
            PipewrightError::ConfigError(format!("unknown task or pipeline '{task}'"))
        })?;
        let map = node.as_mapping().ok_or_else(|| {
            PipewrightError::ConfigError(format!(
                "task '{task}' must be a table (got {})",
                node.kind()
            ))
        })?;

        let tool = match map.get(TOOL_KEY) {
            Some(_) => {
                let resolved = self.resolver.resolve_path(&format!("{task}.{TOOL_KEY}"))?;
                resolved.as_str().map(str::to_string).ok_or_else(|| {
                    PipewrightError::ConfigError(format!(
                        "{task}.{TOOL_KEY} must be a string (got {})",
                        resolved.kind()
                    ))
                })?
            }
            None => task.to_string(),
        };

        let targets: Vec<String> = map
            .keys()
            .filter(|k| *k != TOOL_KEY && *k != OPTIONS_KEY)
            .cloned()
            .collect();

        if targets.is_empty() {
            return Err(PipewrightError::ConfigError(format!(
                "task '{task}' declares no targets"
            )));
        }

        Ok(TaskDefinition {
            name: task.to_string(),
            tool,
            targets,
        })
    }

    /// Resolve one target of a task: templates, shorthand and merged options.
    pub fn resolve_target(&self, def: &TaskDefinition, target: &str) -> Result<ResolvedTarget> {
        if !def.has_target(target) {
            return Err(PipewrightError::ConfigError(format!(
                "task '{}' has no target '{target}'",
                def.name
            )));
        }

        let identity = format!("{}:{target}", def.name);
        let node = self.resolver.resolve_path(&format!("{}.{target}", def.name))?;
        let mut spec = TargetSpec::from_resolved(&identity, &node)?;

        let task_options = self.task_options(&def.name)?;
        spec.options = merge_options(&task_options, &spec.options);

        Ok(ResolvedTarget {
            task: def.name.clone(),
            target: target.to_string(),
            tool: def.tool.clone(),
            spec,
        })
    }

    /// Resolve one named target, or all targets in declaration order.
    pub fn resolve_targets(
        &self,
        task: &str,
        target: Option<&str>,
    ) -> Result<Vec<ResolvedTarget>> {
        let def = self.definition(task)?;
        match target {
            Some(t) => Ok(vec![self.resolve_target(&def, t)?]),
            None => def
                .targets
                .iter()
                .map(|t| self.resolve_target(&def, t))
                .collect(),
        }
    }

    /// Expand every target of a task, in declaration order.
    pub fn expand(
        &self,
        def: &TaskDefinition,
        default_filter: SourceFilter,
    ) -> Result<Vec<TargetInvocation>> {
        let mut out = Vec::new();
        for target in &def.targets {
            let resolved = self.resolve_target(def, target)?;
            out.extend(self.expand_target(&resolved, default_filter)?);
        }
        Ok(out)
    }

    /// Expand a single resolved target against the filesystem.
    pub fn expand_target(
        &self,
        target: &ResolvedTarget,
        default_filter: SourceFilter,
    ) -> Result<Vec<TargetInvocation>> {
        let invocations = expand::expand_target(
            self.fs.as_ref(),
            &self.root,
            target,
            default_filter,
            self.strict,
        )?;
        debug!(
            identity = %target.identity(),
            invocations = invocations.len(),
            "target expanded"
        );
        Ok(invocations)
    }

    fn task_options(&self, task: &str) -> Result<Mapping> {
        let path = format!("{task}.{OPTIONS_KEY}");
        if !self.resolver.store().contains(&path) {
            return Ok(Mapping::new());
        }

        match self.resolver.resolve_path(&path)? {
            ConfigNode::Mapping(map) => Ok(map),
            other => Err(PipewrightError::ConfigError(format!(
                "{path} must be a table (got {})",
                other.kind()
            ))),
        }
    }
}
