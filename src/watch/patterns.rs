// src/watch/patterns.rs

use std::fmt;

use anyhow::{Context, Result};

use crate::config::WatchRule;
use crate::engine::PipelineName;
use crate::fs::glob::PatternSet;

/// Compiled `files` / `exclude` patterns of one watch rule.
///
/// Patterns are relative to the project root; the watcher passes relative
/// forward-slash paths (e.g. `"less/theme.less"`) into `matches`.
#[derive(Clone)]
pub struct WatchProfile {
    rule: String,
    pipeline: PipelineName,
    patterns: PatternSet,
}

impl fmt::Debug for WatchProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchProfile")
            .field("rule", &self.rule)
            .field("pipeline", &self.pipeline)
            .finish_non_exhaustive()
    }
}

impl WatchProfile {
    pub fn from_rule(rule: &WatchRule) -> Result<Self> {
        let include: Vec<String> = rule
            .files
            .iter()
            .filter(|p| !p.starts_with('!'))
            .cloned()
            .collect();
        // `!pattern` inside `files` works like an `exclude` entry.
        let exclude: Vec<String> = rule
            .exclude
            .iter()
            .cloned()
            .chain(
                rule.files
                    .iter()
                    .filter_map(|p| p.strip_prefix('!').map(str::to_string)),
            )
            .collect();

        let patterns = PatternSet::with_excludes(&include, &exclude)
            .with_context(|| format!("building glob patterns for watch rule {}", rule.name))?;

        Ok(Self {
            rule: rule.name.clone(),
            pipeline: rule.pipeline.clone(),
            patterns,
        })
    }

    pub fn rule(&self) -> &str {
        &self.rule
    }

    pub fn pipeline(&self) -> &str {
        &self.pipeline
    }

    /// Exclusions win over inclusions.
    pub fn matches(&self, rel_path: &str) -> bool {
        self.patterns.matches(rel_path.strip_prefix("./").unwrap_or(rel_path))
    }
}

pub fn build_profiles(rules: &[WatchRule]) -> Result<Vec<WatchProfile>> {
    rules.iter().map(WatchProfile::from_rule).collect()
}
