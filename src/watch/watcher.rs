// src/watch/watcher.rs

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::engine::LoopEvent;
use crate::watch::event_handler::process_file_change;
use crate::watch::patterns::WatchProfile;

/// Keeps the underlying `RecommendedWatcher` alive; dropping it stops
/// watching.
pub struct WatcherHandle {
    _inner: RecommendedWatcher,
}

impl std::fmt::Debug for WatcherHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherHandle").finish()
    }
}

/// Watch `root` recursively and send [`LoopEvent::Changed`] for every
/// pipeline whose rule matches a changed path.
pub fn spawn_watcher(
    root: impl Into<PathBuf>,
    profiles: Vec<WatchProfile>,
    events_tx: mpsc::Sender<LoopEvent>,
) -> Result<WatcherHandle> {
    let root = root.into();
    let root = root.canonicalize().unwrap_or(root);
    let profiles = Arc::new(profiles);

    // Channel from the blocking notify callback into the async world.
    let (notify_tx, mut notify_rx) = mpsc::unbounded_channel::<Event>();

    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| match res {
            Ok(event) => {
                if let Err(err) = notify_tx.send(event) {
                    warn!("failed to forward notify event: {err}");
                }
            }
            Err(err) => warn!("file watch error: {err}"),
        },
        Config::default(),
    )?;

    watcher.watch(&root, RecursiveMode::Recursive)?;
    info!("file watcher started on {:?}", root);

    tokio::spawn(async move {
        while let Some(event) = notify_rx.recv().await {
            if matches!(event.kind, EventKind::Access(_)) {
                continue;
            }
            debug!(?event, "received notify event");

            for path in &event.paths {
                process_file_change(&root, path, &profiles, &events_tx).await;
            }
        }
        debug!("watcher event loop finished");
    });

    Ok(WatcherHandle { _inner: watcher })
}
