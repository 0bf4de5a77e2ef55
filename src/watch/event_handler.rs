// src/watch/event_handler.rs

//! Turning a changed path into pipeline triggers.

use std::path::Path;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::engine::{LoopEvent, PipelineName};
use crate::fs::slash_path;
use crate::watch::patterns::WatchProfile;

/// Pipelines interested in a root-relative path, in rule order and without
/// duplicates (several rules may point at the same pipeline).
pub fn pipelines_for_path(rel_path: &str, profiles: &[WatchProfile]) -> Vec<PipelineName> {
    let mut out: Vec<PipelineName> = Vec::new();
    for profile in profiles.iter().filter(|p| p.matches(rel_path)) {
        if !out.iter().any(|p| p == profile.pipeline()) {
            out.push(profile.pipeline().to_string());
        }
    }
    out
}

/// Forward one changed path to the watch loop.
pub async fn process_file_change(
    root: &Path,
    path: &Path,
    profiles: &[WatchProfile],
    events_tx: &mpsc::Sender<LoopEvent>,
) {
    let Some(rel) = relative_str(root, path) else {
        warn!(?path, ?root, "could not relativize path against root");
        return;
    };

    let pipelines = pipelines_for_path(&rel, profiles);
    if pipelines.is_empty() {
        return;
    }

    debug!(file = %rel, ?pipelines, "watched file changed");
    for pipeline in pipelines {
        if events_tx.send(LoopEvent::Changed { pipeline }).await.is_err() {
            debug!("watch loop closed; dropping change");
            return;
        }
    }
}

/// `path` relative to `root` with forward slashes.
///
/// Falls back to comparing canonical paths, since notify may report a
/// different absolute prefix for the same directory (symlinks on macOS).
pub fn relative_str(root: &Path, path: &Path) -> Option<String> {
    if let Ok(rel) = path.strip_prefix(root) {
        return Some(slash_path(rel));
    }

    let root = root.canonicalize().ok()?;
    let path = path.canonicalize().ok()?;
    path.strip_prefix(&root).ok().map(slash_path)
}
