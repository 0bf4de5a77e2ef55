// src/version/sync.rs

use std::path::{Path, PathBuf};
use std::sync::Arc;

use regex::{Captures, Regex};
use tracing::{debug, info, warn};

use crate::config::model::VersionRuleSpec;
use crate::errors::{PipewrightError, Result};
use crate::fs::{normalize_path, FileSystem};

/// Characters a version token may contain.
const VERSION_CHARS: &str = r"[0-9a-zA-Z\-_\+\.]+";

/// A version marker, the version to write and the files to rewrite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionRule {
    pub name: String,
    pub prefix: String,
    pub version: String,
    pub files: Vec<PathBuf>,
}

impl VersionRule {
    /// Bind a configured rule to a version; files are joined with `root`.
    pub fn from_spec(spec: &VersionRuleSpec, version: impl Into<String>, root: &Path) -> Self {
        Self {
            name: spec.name.clone(),
            prefix: spec.prefix.clone(),
            version: version.into(),
            files: spec
                .files
                .iter()
                .map(|f| normalize_path(&root.join(f)))
                .collect(),
        }
    }

    /// `(<prefix>)(<version>)`; the prefix is kept on replacement.
    pub fn pattern(&self) -> Result<Regex> {
        Regex::new(&format!("({})({VERSION_CHARS})", self.prefix)).map_err(|e| {
            PipewrightError::ConfigError(format!(
                "versions.{}.prefix is not a valid regex: {e}",
                self.name
            ))
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileReport {
    pub path: PathBuf,
    pub replacements: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BumpReport {
    pub rule: String,
    pub version: String,
    pub files: Vec<FileReport>,
}

impl BumpReport {
    pub fn total(&self) -> usize {
        self.files.iter().map(|f| f.replacements).sum()
    }
}

/// Rewrites version markers in place.
#[derive(Debug, Clone)]
pub struct VersionSynchronizer {
    fs: Arc<dyn FileSystem>,
    strict: bool,
}

impl VersionSynchronizer {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self { fs, strict: false }
    }

    /// Fail with `NoMatchFound` when a rule replaces nothing.
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Replace every version marker in every file of the rule.
    ///
    /// All files are checked before the first write, so a missing file
    /// leaves every file untouched. Files without a match are not rewritten.
    pub fn bump(&self, rule: &VersionRule) -> Result<BumpReport> {
        self.check(rule)?;
        let re = rule.pattern()?;

        let mut files = Vec::with_capacity(rule.files.len());
        for path in &rule.files {
            let contents = self.fs.read_to_string(path)?;
            let replacements = re.find_iter(&contents).count();

            if replacements > 0 {
                let updated = re.replace_all(&contents, |caps: &Captures| {
                    format!("{}{}", &caps[1], rule.version)
                });
                self.fs.write_atomic(path, updated.as_bytes())?;
            }

            debug!(
                rule = %rule.name,
                file = %path.display(),
                replacements,
                "version markers rewritten"
            );
            files.push(FileReport {
                path: path.clone(),
                replacements,
            });
        }

        let report = BumpReport {
            rule: rule.name.clone(),
            version: rule.version.clone(),
            files,
        };

        if report.total() == 0 {
            warn!(rule = %rule.name, "version rule matched nothing");
        } else {
            info!(
                rule = %rule.name,
                version = %rule.version,
                replacements = report.total(),
                "version synchronized"
            );
        }

        Ok(report)
    }

    /// Count the markers a bump would replace, without writing.
    ///
    /// Fails like `bump` would: bad version token, missing file, or no
    /// match at all when strict.
    pub fn check(&self, rule: &VersionRule) -> Result<usize> {
        check_version_token(&rule.version)?;
        let re = rule.pattern()?;

        if let Some(missing) = rule.files.iter().find(|f| !self.fs.is_file(f)) {
            return Err(PipewrightError::FileNotFound(missing.clone()));
        }

        let mut total = 0;
        for path in &rule.files {
            total += re.find_iter(&self.fs.read_to_string(path)?).count();
        }

        if total == 0 && self.strict {
            return Err(PipewrightError::NoMatchFound {
                rule: rule.name.clone(),
            });
        }
        Ok(total)
    }

    /// The first version marker found in the rule's files, in file order.
    pub fn current_version(&self, rule: &VersionRule) -> Result<Option<String>> {
        let re = rule.pattern()?;

        for path in &rule.files {
            if !self.fs.is_file(path) {
                return Err(PipewrightError::FileNotFound(path.clone()));
            }
            let contents = self.fs.read_to_string(path)?;
            if let Some(caps) = re.captures(&contents) {
                // The version token is always the last group.
                if let Some(found) = caps.get(caps.len() - 1) {
                    return Ok(Some(found.as_str().to_string()));
                }
            }
        }

        Ok(None)
    }
}

fn check_version_token(version: &str) -> Result<()> {
    let valid = !version.is_empty()
        && version
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_+.".contains(c));
    if valid {
        Ok(())
    } else {
        Err(PipewrightError::InvalidVersion(version.to_string()))
    }
}
