use std::str::FromStr;

use serde::Deserialize;

/// Canonical task name type used throughout the crate.
pub type TaskName = String;

/// Which filesystem entries a source pattern may match.
///
/// - `Files`: regular files only (default for every tool except `clean`).
/// - `Dirs`: directories only.
/// - `Any`: both; used by tools that operate on whole trees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceFilter {
    Files,
    Dirs,
    Any,
}

impl Default for SourceFilter {
    fn default() -> Self {
        SourceFilter::Files
    }
}

impl FromStr for SourceFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "files" | "file" => Ok(SourceFilter::Files),
            "dirs" | "dir" => Ok(SourceFilter::Dirs),
            "any" => Ok(SourceFilter::Any),
            other => Err(format!(
                "invalid filter: {other} (expected \"files\", \"dirs\" or \"any\")"
            )),
        }
    }
}

impl SourceFilter {
    pub fn accepts(self, is_file: bool, is_dir: bool) -> bool {
        match self {
            SourceFilter::Files => is_file,
            SourceFilter::Dirs => is_dir,
            SourceFilter::Any => is_file || is_dir,
        }
    }
}
