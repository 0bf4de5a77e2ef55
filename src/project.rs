// src/project.rs

//! A loaded project: the config store plus everything derived from it.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use crate::config::model::{VERSIONS_KEY, WATCH_KEY};
use crate::config::{load_and_validate, validate_store, ConfigStore, Settings, VersionRuleSpec, WatchRule};
use crate::errors::{PipewrightError, Result};
use crate::fs::{FileSystem, RealFileSystem};
use crate::pipeline::{Composer, PipelineSet};
use crate::registry::Registry;
use crate::template::Resolver;
use crate::tools::ToolRegistry;
use crate::version::{BumpReport, VersionRequest, VersionRule, VersionSynchronizer};

#[derive(Debug, Clone)]
pub struct Project {
    resolver: Arc<Resolver>,
    fs: Arc<dyn FileSystem>,
    root: PathBuf,
}

impl Project {
    /// Load and validate a config file from disk. The project root is the
    /// directory holding the config file.
    pub fn load(config_path: &Path) -> Result<Self> {
        let store = load_and_validate(config_path)?;
        let root = config_root_dir(config_path);
        info!(config = ?config_path, root = ?root, "config loaded");
        Ok(Self::from_parts(store, Arc::new(RealFileSystem), root))
    }

    /// Build a project from an in-memory store (validated here).
    pub fn from_store(store: ConfigStore, fs: Arc<dyn FileSystem>, root: impl Into<PathBuf>) -> Result<Self> {
        validate_store(&store)?;
        Ok(Self::from_parts(store, fs, root.into()))
    }

    fn from_parts(store: ConfigStore, fs: Arc<dyn FileSystem>, root: PathBuf) -> Self {
        Self {
            resolver: Arc::new(Resolver::new(Arc::new(store))),
            fs,
            root,
        }
    }

    pub fn store(&self) -> &ConfigStore {
        self.resolver.store()
    }

    pub fn settings(&self) -> &Settings {
        self.store().settings()
    }

    pub fn resolver(&self) -> &Arc<Resolver> {
        &self.resolver
    }

    pub fn fs(&self) -> &Arc<dyn FileSystem> {
        &self.fs
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Registry, tools and pipelines wired into a [`Composer`].
    pub fn composer(&self, strict: bool) -> Result<Composer> {
        let tools = ToolRegistry::from_config(&self.resolver, self.fs.clone(), &self.root)?;
        self.composer_with_tools(tools, strict)
    }

    /// Same as [`Project::composer`] with a caller-supplied tool set.
    pub fn composer_with_tools(&self, tools: ToolRegistry, strict: bool) -> Result<Composer> {
        let registry = Registry::new(self.resolver.clone(), self.fs.clone(), self.root.clone())
            .with_strict(strict || self.settings().strict_sources);
        let pipelines = PipelineSet::from_store(self.store())?;
        Composer::new(pipelines, registry, tools)
    }

    /// All `[watch.<rule>]` entries, templates resolved.
    pub fn watch_rules(&self) -> Result<Vec<WatchRule>> {
        self.section_names(WATCH_KEY)
            .into_iter()
            .map(|name| {
                let node = self.resolver.resolve_path(&format!("{WATCH_KEY}.{name}"))?;
                WatchRule::from_resolved(&name, &node)
            })
            .collect()
    }

    /// `[versions.<rule>]` entries, restricted to `only` when non-empty.
    pub fn version_rules(&self, only: &[String]) -> Result<Vec<VersionRuleSpec>> {
        let names = self.section_names(VERSIONS_KEY);
        if names.is_empty() {
            return Err(PipewrightError::ConfigError(format!(
                "no [{VERSIONS_KEY}] rules configured"
            )));
        }

        if let Some(unknown) = only.iter().find(|n| !names.contains(n)) {
            return Err(PipewrightError::ConfigError(format!(
                "unknown version rule '{unknown}'"
            )));
        }

        names
            .into_iter()
            .filter(|name| only.is_empty() || only.contains(name))
            .map(|name| {
                let node = self.resolver.resolve_path(&format!("{VERSIONS_KEY}.{name}"))?;
                VersionRuleSpec::from_resolved(&name, &node)
            })
            .collect()
    }

    /// Rewrite the version markers of the selected rules.
    ///
    /// Release keywords read the current version from the first selected
    /// rule. Every selected rule is checked (files present, markers found when
    /// strict) before anything is written.
    pub fn sync_versions(
        &self,
        request: &VersionRequest,
        only: &[String],
        strict: bool,
    ) -> Result<Vec<BumpReport>> {
        let specs = self.version_rules(only)?;
        let sync = VersionSynchronizer::new(self.fs.clone())
            .with_strict(strict || self.settings().strict_versions);

        let version = if request.needs_current() {
            let current = match specs.first() {
                Some(spec) => sync.current_version(&VersionRule::from_spec(spec, "", &self.root))?,
                None => None,
            };
            debug!(current = ?current, "current version");
            request.resolve(current.as_deref())?
        } else {
            request.resolve(None)?
        };
        let version = version.to_string();

        let rules: Vec<VersionRule> = specs
            .iter()
            .map(|spec| VersionRule::from_spec(spec, version.clone(), &self.root))
            .collect();

        for rule in &rules {
            sync.check(rule)?;
        }

        rules.iter().map(|rule| sync.bump(rule)).collect()
    }

    fn section_names(&self, key: &str) -> Vec<String> {
        self.store()
            .section(key)
            .and_then(|s| s.as_mapping())
            .map(|m| m.keys().cloned().collect())
            .unwrap_or_default()
    }
}

/// Directory holding the config file, made absolute.
///
/// A bare file name like `Pipewright.toml` (empty parent) means the current
/// working directory.
pub fn config_root_dir(config_path: &Path) -> PathBuf {
    let dir = match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    };
    dir.canonicalize().unwrap_or(dir)
}
