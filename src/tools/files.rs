// src/tools/files.rs

//! Built-in tools that only move bytes around.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use tracing::{debug, info};

use crate::fs::FileSystem;
use crate::registry::TargetInvocation;
use crate::types::SourceFilter;

use super::{Tool, ToolFuture, ToolOutput};

/// Removes every matched path (files and directories).
#[derive(Debug, Clone)]
pub struct CleanTool {
    fs: Arc<dyn FileSystem>,
}

impl CleanTool {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self { fs }
    }
}

impl Tool for CleanTool {
    fn invoke<'a>(&'a self, inv: &'a TargetInvocation) -> ToolFuture<'a> {
        Box::pin(async move {
            let mut targets = inv.src.clone();
            if targets.is_empty() {
                targets.extend(inv.dest.iter().cloned());
            }

            for path in &targets {
                if self.fs.exists(path) {
                    self.fs.remove_path(path)?;
                    debug!(identity = %inv.identity(), file = %path.display(), "removed");
                }
            }

            info!(identity = %inv.identity(), removed = targets.len(), "clean finished");
            Ok(ToolOutput::default())
        })
    }

    fn source_filter(&self) -> SourceFilter {
        SourceFilter::Any
    }
}

/// Copies sources to `dest`.
///
/// A single source is copied to `dest` itself unless `dest` is an existing
/// directory; several sources are copied into `dest` by file name.
#[derive(Debug, Clone)]
pub struct CopyTool {
    fs: Arc<dyn FileSystem>,
}

impl CopyTool {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self { fs }
    }
}

impl Tool for CopyTool {
    fn invoke<'a>(&'a self, inv: &'a TargetInvocation) -> ToolFuture<'a> {
        Box::pin(async move {
            let Some(dest) = inv.dest.as_ref() else {
                bail!("copy requires a `dest`");
            };

            let into_dir = inv.src.len() > 1 || self.fs.is_dir(dest);
            let mut produced = Vec::with_capacity(inv.src.len());

            for src in &inv.src {
                let out = if into_dir {
                    let name = src
                        .file_name()
                        .with_context(|| format!("source {:?} has no file name", src))?;
                    dest.join(name)
                } else {
                    dest.clone()
                };

                let bytes = self.fs.read(src)?;
                self.fs.write(&out, &bytes)?;
                debug!(identity = %inv.identity(), file = %out.display(), "copied");
                produced.push(out);
            }

            Ok(ToolOutput::produced(produced))
        })
    }
}

/// Joins sources into `dest`.
///
/// Options: `separator` (default newline), `banner`, `footer`.
#[derive(Debug, Clone)]
pub struct ConcatenateTool {
    fs: Arc<dyn FileSystem>,
}

impl ConcatenateTool {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self { fs }
    }
}

impl Tool for ConcatenateTool {
    fn invoke<'a>(&'a self, inv: &'a TargetInvocation) -> ToolFuture<'a> {
        Box::pin(async move {
            let Some(dest) = inv.dest.as_ref() else {
                bail!("concatenate requires a `dest`");
            };

            let separator = inv.option_str("separator").unwrap_or_else(|| "\n".to_string());
            let parts = inv
                .src
                .iter()
                .map(|p| self.fs.read_to_string(p))
                .collect::<anyhow::Result<Vec<_>>>()?;

            let mut out = inv.option_str("banner").unwrap_or_default();
            out.push_str(&parts.join(&separator));
            out.push_str(&inv.option_str("footer").unwrap_or_default());

            self.fs.write(dest, out.as_bytes())?;
            info!(
                identity = %inv.identity(),
                file = %dest.display(),
                sources = inv.src.len(),
                "concatenated"
            );

            Ok(ToolOutput::produced(vec![dest.clone()]))
        })
    }
}

/// Prepends the `banner` option to each source, in place.
///
/// Files that already start with the banner are left untouched. Set
/// `linebreak = false` to omit the newline after the banner.
#[derive(Debug, Clone)]
pub struct InjectBannerTool {
    fs: Arc<dyn FileSystem>,
}

impl InjectBannerTool {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self { fs }
    }
}

impl Tool for InjectBannerTool {
    fn invoke<'a>(&'a self, inv: &'a TargetInvocation) -> ToolFuture<'a> {
        Box::pin(async move {
            let Some(banner) = inv.option_str("banner") else {
                bail!("inject-banner requires a `banner` option");
            };
            let linebreak = inv
                .option("linebreak")
                .and_then(|n| n.as_bool())
                .unwrap_or(true);
            let header = if linebreak {
                format!("{banner}\n")
            } else {
                banner.clone()
            };

            let mut produced: Vec<PathBuf> = Vec::new();
            let mut warnings = Vec::new();

            for src in &inv.src {
                let contents = self.fs.read_to_string(src)?;
                if contents.starts_with(&banner) {
                    warnings.push(format!("{} already has the banner", src.display()));
                    continue;
                }
                self.fs.write(src, format!("{header}{contents}").as_bytes())?;
                produced.push(src.clone());
            }

            Ok(ToolOutput { produced, warnings })
        })
    }
}
