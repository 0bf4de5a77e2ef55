// src/tools/mod.rs

//! External tool layer.
//!
//! The engine knows nothing about what a tool does: each task kind maps to a
//! [`Tool`] that turns a [`TargetInvocation`] into produced files and
//! warnings.
//!
//! - [`files`] holds the built-in file tools (`clean`, `copy`,
//!   `concatenate`, `inject-banner`).
//! - [`command`] runs a configured shell command per invocation.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;

use tracing::debug;

use crate::config::model::{ToolSpec, TOOLS_KEY};
use crate::errors::Result;
use crate::fs::FileSystem;
use crate::registry::TargetInvocation;
use crate::template::Resolver;
use crate::types::SourceFilter;

pub mod command;
pub mod files;

pub use command::CommandTool;
pub use files::{CleanTool, ConcatenateTool, CopyTool, InjectBannerTool};

/// What a successful invocation reports back.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    pub produced: Vec<PathBuf>,
    pub warnings: Vec<String>,
}

impl ToolOutput {
    pub fn produced(paths: Vec<PathBuf>) -> Self {
        Self {
            produced: paths,
            warnings: Vec::new(),
        }
    }
}

pub type ToolFuture<'a> =
    Pin<Box<dyn Future<Output = anyhow::Result<ToolOutput>> + Send + 'a>>;

/// A task kind's implementation.
pub trait Tool: Send + Sync {
    fn invoke<'a>(&'a self, invocation: &'a TargetInvocation) -> ToolFuture<'a>;

    /// Which entries source patterns match when a target sets no `filter`.
    fn source_filter(&self) -> SourceFilter {
        SourceFilter::Files
    }
}

/// Capability registry: task kind name to tool.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds: Vec<_> = self.tools.keys().collect();
        kinds.sort();
        f.debug_struct("ToolRegistry").field("tools", &kinds).finish()
    }
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in file tools.
    pub fn with_builtins(fs: Arc<dyn FileSystem>) -> Self {
        let mut reg = Self::new();
        reg.register("clean", Arc::new(CleanTool::new(fs.clone())));
        reg.register("copy", Arc::new(CopyTool::new(fs.clone())));
        reg.register("concatenate", Arc::new(ConcatenateTool::new(fs.clone())));
        reg.register("inject-banner", Arc::new(InjectBannerTool::new(fs)));
        reg
    }

    /// Built-ins plus one [`CommandTool`] per `[tools.<kind>]` entry.
    ///
    /// Configured tools replace built-ins of the same name.
    pub fn from_config(resolver: &Resolver, fs: Arc<dyn FileSystem>, root: &Path) -> Result<Self> {
        let mut reg = Self::with_builtins(fs.clone());

        let kinds: Vec<String> = resolver
            .store()
            .section(TOOLS_KEY)
            .and_then(|s| s.as_mapping())
            .map(|m| m.keys().cloned().collect())
            .unwrap_or_default();

        for kind in kinds {
            let node = resolver.resolve_path(&format!("{TOOLS_KEY}.{kind}"))?;
            let spec = ToolSpec::from_resolved(&kind, &node)?;
            debug!(tool = %kind, cmd = %spec.cmd, "registering command tool");
            let tool = CommandTool::new(spec, root.to_path_buf(), fs.clone());
            reg.register(kind, Arc::new(tool));
        }

        Ok(reg)
    }

    pub fn register(&mut self, kind: impl Into<String>, tool: Arc<dyn Tool>) {
        self.tools.insert(kind.into(), tool);
    }

    pub fn get(&self, kind: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(kind).cloned()
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.tools.contains_key(kind)
    }

    pub fn kinds(&self) -> Vec<String> {
        let mut kinds: Vec<_> = self.tools.keys().cloned().collect();
        kinds.sort();
        kinds
    }
}
