// src/registry/expand.rs

//! Source-set expansion: turning a resolved target into invocations.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use tracing::debug;

use crate::errors::{PipewrightError, Result};
use crate::fs::glob::{collect_matching, PatternSet};
use crate::fs::{normalize_path, slash_path, FileSystem};
use crate::types::SourceFilter;

use super::definition::ResolvedTarget;
use super::invocation::TargetInvocation;

/// Per-file tokens recognised in the `dest` of an `expand` target.
const DEST_TOKENS: &[&str] = &["[name]", "[stem]", "[ext]", "[dir]", "[path]"];

/// Expand one target into zero or more invocations.
///
/// - No `src`: a single invocation with an empty source list.
/// - `expand = false`: the whole matched set goes to one invocation.
/// - `expand = true`: one destination per source; sources sharing a
///   destination are grouped.
pub fn expand_target(
    fs: &dyn FileSystem,
    root: &Path,
    target: &ResolvedTarget,
    default_filter: SourceFilter,
    strict: bool,
) -> Result<Vec<TargetInvocation>> {
    let spec = &target.spec;
    let identity = target.identity();
    let base = normalize_path(&root.join(spec.cwd.as_deref().unwrap_or("")));
    let dest = spec.dest.as_deref().map(|d| normalize_path(&root.join(d)));

    let invocation = |src: Vec<PathBuf>, dest: Option<PathBuf>| TargetInvocation {
        task: target.task.clone(),
        target: target.target.clone(),
        tool: target.tool.clone(),
        src,
        dest,
        options: spec.options.clone(),
    };

    if spec.src.is_empty() {
        return Ok(vec![invocation(Vec::new(), dest)]);
    }

    let patterns = PatternSet::new(&spec.src)?;
    let filter = spec.filter.unwrap_or(default_filter);
    let matched = collect_matching(fs, &base, &patterns, filter)?;

    debug!(
        identity = %identity,
        base = %base.display(),
        matched = matched.len(),
        "expanded source patterns"
    );

    if matched.is_empty() {
        if strict {
            return Err(PipewrightError::EmptySourceSet {
                identity,
                patterns: spec.src.clone(),
            });
        }
        return Ok(Vec::new());
    }

    if !spec.expand {
        let src = matched.iter().map(|rel| normalize_path(&base.join(rel))).collect();
        return Ok(vec![invocation(src, dest)]);
    }

    let mut groups: IndexMap<PathBuf, Vec<PathBuf>> = IndexMap::new();
    for rel in &matched {
        let out = map_destination(&base, rel, dest.as_deref(), spec.ext.as_deref(), spec.flatten);
        groups
            .entry(out)
            .or_default()
            .push(normalize_path(&base.join(rel)));
    }

    Ok(groups
        .into_iter()
        .map(|(out, src)| invocation(src, Some(out)))
        .collect())
}

/// Destination of one source file of an `expand` target.
///
/// `rel` is relative to `base`; `dest` is already joined with the root.
pub fn map_destination(
    base: &Path,
    rel: &Path,
    dest: Option<&Path>,
    ext: Option<&str>,
    flatten: bool,
) -> PathBuf {
    let file_name = rel
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mapped = match dest {
        Some(dest) if has_dest_tokens(dest) => substitute_tokens(&slash_path(dest), rel),
        Some(dest) if flatten => dest.join(&file_name),
        Some(dest) => dest.join(rel),
        None => base.join(rel),
    };

    let mapped = match ext {
        Some(ext) => replace_extension(&mapped, ext),
        None => mapped,
    };

    normalize_path(&mapped)
}

fn has_dest_tokens(dest: &Path) -> bool {
    let s = dest.to_string_lossy();
    DEST_TOKENS.iter().any(|t| s.contains(t))
}

fn substitute_tokens(template: &str, rel: &Path) -> PathBuf {
    let name = rel
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stem = rel
        .file_stem()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = rel
        .extension()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let dir = rel.parent().map(slash_path).unwrap_or_default();

    let out = template
        .replace("[name]", &name)
        .replace("[stem]", &stem)
        .replace("[ext]", &ext)
        .replace("[dir]", &dir)
        .replace("[path]", &slash_path(rel));

    PathBuf::from(out)
}

/// Replace everything from the first `.` of the file name with `ext`.
fn replace_extension(path: &Path, ext: &str) -> PathBuf {
    let Some(name) = path.file_name().map(|n| n.to_string_lossy().into_owned()) else {
        return path.to_path_buf();
    };

    let base = match name.find('.') {
        Some(0) | None => name.as_str(),
        Some(i) => &name[..i],
    };
    let ext = if ext.starts_with('.') {
        ext.to_string()
    } else {
        format!(".{ext}")
    };

    path.with_file_name(format!("{base}{ext}"))
}
