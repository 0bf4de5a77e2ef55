// src/engine/backend.rs

//! Pluggable rebuild backend.
//!
//! The watch loop talks to a `RebuildBackend` instead of the composer
//! directly, so tests can swap in a fake that records which pipelines were
//! started and reports completions on demand.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, error};

use crate::errors::Result;
use crate::pipeline::Composer;

use super::{LoopEvent, PipelineName, RunOutcome};

/// Starts rebuilds for the watch loop.
///
/// Implementations must return promptly and report the end of the rebuild
/// later with a [`LoopEvent::RunFinished`].
pub trait RebuildBackend: Send {
    fn start_rebuild(
        &mut self,
        pipeline: PipelineName,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// Production backend: runs the pipeline with the [`Composer`] on a Tokio
/// task.
pub struct ComposerBackend {
    composer: Arc<Composer>,
    events_tx: mpsc::Sender<LoopEvent>,
}

impl ComposerBackend {
    pub fn new(composer: Arc<Composer>, events_tx: mpsc::Sender<LoopEvent>) -> Self {
        Self {
            composer,
            events_tx,
        }
    }
}

impl RebuildBackend for ComposerBackend {
    fn start_rebuild(
        &mut self,
        pipeline: PipelineName,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        // Clone so the spawned task doesn't borrow `self`.
        let composer = Arc::clone(&self.composer);
        let events_tx = self.events_tx.clone();

        Box::pin(async move {
            tokio::spawn(async move {
                let outcome = match composer.run(&pipeline).await {
                    Ok(report) => {
                        debug!(
                            pipeline = %pipeline,
                            steps = report.steps.len(),
                            "rebuild report"
                        );
                        RunOutcome::Success
                    }
                    Err(err) => {
                        error!(pipeline = %pipeline, error = %err, "rebuild error");
                        RunOutcome::Failed(err.to_string())
                    }
                };

                if events_tx
                    .send(LoopEvent::RunFinished { pipeline, outcome })
                    .await
                    .is_err()
                {
                    debug!("watch loop gone before rebuild finished");
                }
            });
            Ok(())
        })
    }
}
