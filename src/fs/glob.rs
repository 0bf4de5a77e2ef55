// src/fs/glob.rs

//! Glob compilation and directory walking shared by source expansion and the
//! watcher.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};

use crate::fs::{normalize_path, slash_path, FileSystem};
use crate::types::SourceFilter;

/// Directories never descended into while walking.
const SKIPPED_DIRS: &[&str] = &[".git"];

/// Build a GlobSet from simple string patterns.
///
/// `*` does not cross `/`; use `**` for recursive matches.
pub fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        let glob = GlobBuilder::new(pat)
            .literal_separator(true)
            .build()
            .with_context(|| format!("invalid glob pattern: {pat}"))?;
        builder.add(glob);
    }
    Ok(builder.build()?)
}

/// Compiled include / exclude pair.
///
/// Patterns starting with `!` are exclusions.
#[derive(Debug, Clone)]
pub struct PatternSet {
    include: GlobSet,
    exclude: Option<GlobSet>,
}

impl PatternSet {
    pub fn new(patterns: &[String]) -> Result<Self> {
        let (negated, plain): (Vec<&String>, Vec<&String>) =
            patterns.iter().partition(|p| p.starts_with('!'));

        let include: Vec<String> = plain.into_iter().map(|p| trim_dot_slash(p)).collect();
        let exclude: Vec<String> = negated
            .into_iter()
            .map(|p| trim_dot_slash(&p[1..]))
            .collect();

        Self::with_excludes(&include, &exclude)
    }

    pub fn with_excludes(include: &[String], exclude: &[String]) -> Result<Self> {
        let exclude = if exclude.is_empty() {
            None
        } else {
            Some(build_globset(exclude)?)
        };

        Ok(Self {
            include: build_globset(include)?,
            exclude,
        })
    }

    /// Check a forward-slash relative path against the set.
    pub fn matches(&self, rel_path: &str) -> bool {
        self.first_match(rel_path).is_some()
    }

    /// Index of the first include pattern matching the path, unless excluded.
    pub fn first_match(&self, rel_path: &str) -> Option<usize> {
        let first = self.include.matches(rel_path).into_iter().min()?;
        if let Some(ref exclude) = self.exclude {
            if exclude.is_match(rel_path) {
                return None;
            }
        }
        Some(first)
    }
}

fn trim_dot_slash(pattern: &str) -> String {
    pattern.strip_prefix("./").unwrap_or(pattern).to_string()
}

/// Walk `base` and return every entry accepted by `filter` whose path relative
/// to `base` matches `patterns`.
///
/// Returned paths are relative to `base` and grouped by the first include
/// pattern they match, in declaration order; each group is sorted. A missing
/// `base` yields no matches.
pub fn collect_matching(
    fs: &dyn FileSystem,
    base: &Path,
    patterns: &PatternSet,
    filter: SourceFilter,
) -> Result<Vec<PathBuf>> {
    let base = normalize_path(base);
    let mut matches = Vec::new();

    if !fs.is_dir(&base) {
        return Ok(Vec::new());
    }

    let mut stack = vec![base.clone()];
    while let Some(dir) = stack.pop() {
        for path in fs.read_dir(&dir)? {
            let path = normalize_path(&path);
            let is_dir = fs.is_dir(&path);
            let is_file = !is_dir && fs.is_file(&path);

            let Some(rel) = relative_to(&base, &path) else {
                continue;
            };
            let rel_str = slash_path(&rel);

            if filter.accepts(is_file, is_dir) {
                if let Some(rank) = patterns.first_match(&rel_str) {
                    matches.push((rank, rel));
                }
            }

            if is_dir {
                let skipped = path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| SKIPPED_DIRS.contains(&n));
                if !skipped {
                    stack.push(path);
                }
            }
        }
    }

    matches.sort();
    matches.dedup();
    Ok(matches.into_iter().map(|(_, rel)| rel).collect())
}

fn relative_to(base: &Path, path: &Path) -> Option<PathBuf> {
    if base == Path::new(".") {
        return Some(path.to_path_buf());
    }
    path.strip_prefix(base).ok().map(Path::to_path_buf)
}
