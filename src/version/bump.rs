// src/version/bump.rs

//! Parsing the requested version: an explicit semver string or a release
//! keyword applied to the current version.

use std::fmt;
use std::str::FromStr;

use semver::{BuildMetadata, Prerelease, Version};

use crate::errors::{PipewrightError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseKind {
    Major,
    Minor,
    Patch,
}

impl fmt::Display for ReleaseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ReleaseKind::Major => "major",
            ReleaseKind::Minor => "minor",
            ReleaseKind::Patch => "patch",
        };
        f.write_str(s)
    }
}

/// What `pipewright version <ARG>` asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionRequest {
    Exact(Version),
    Release(ReleaseKind),
}

impl FromStr for VersionRequest {
    type Err = PipewrightError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "major" => Ok(VersionRequest::Release(ReleaseKind::Major)),
            "minor" => Ok(VersionRequest::Release(ReleaseKind::Minor)),
            "patch" => Ok(VersionRequest::Release(ReleaseKind::Patch)),
            _ => parse_version(s).map(VersionRequest::Exact),
        }
    }
}

impl VersionRequest {
    /// Whether the current version must be read from disk first.
    pub fn needs_current(&self) -> bool {
        matches!(self, VersionRequest::Release(_))
    }

    /// Compute the version to write.
    pub fn resolve(&self, current: Option<&str>) -> Result<Version> {
        match self {
            VersionRequest::Exact(v) => Ok(v.clone()),
            VersionRequest::Release(kind) => {
                let current = current.ok_or_else(|| {
                    PipewrightError::InvalidVersion(format!(
                        "cannot apply a {kind} release: no current version found"
                    ))
                })?;
                Ok(next_version(&parse_version(current)?, *kind))
            }
        }
    }
}

/// Parse a version, tolerating a leading `v`.
pub fn parse_version(s: &str) -> Result<Version> {
    let trimmed = s.trim();
    let trimmed = trimmed.strip_prefix('v').unwrap_or(trimmed);
    Version::parse(trimmed).map_err(|e| PipewrightError::InvalidVersion(format!("'{s}': {e}")))
}

/// Increment following npm's rules: a pre-release of the requested release is
/// promoted instead of incremented.
pub fn next_version(current: &Version, kind: ReleaseKind) -> Version {
    let mut next = current.clone();
    let is_pre = !current.pre.is_empty();
    next.pre = Prerelease::EMPTY;
    next.build = BuildMetadata::EMPTY;

    match kind {
        ReleaseKind::Major => {
            if !(is_pre && current.minor == 0 && current.patch == 0) {
                next.major += 1;
                next.minor = 0;
                next.patch = 0;
            }
        }
        ReleaseKind::Minor => {
            if !(is_pre && current.patch == 0) {
                next.minor += 1;
                next.patch = 0;
            }
        }
        ReleaseKind::Patch => {
            if !is_pre {
                next.patch += 1;
            }
        }
    }

    next
}
