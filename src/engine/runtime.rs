// src/engine/runtime.rs

use std::fmt;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::errors::Result;

use super::backend::RebuildBackend;
use super::core::{LoopCommand, WatchCore};
use super::{LoopEvent, PipelineName};

/// Async shell around [`WatchCore`].
///
/// Reads [`LoopEvent`]s, feeds them to the core, and carries out the returned
/// commands: arming timers and starting rebuilds through the backend.
pub struct WatchLoop<B: RebuildBackend> {
    core: WatchCore,
    event_rx: mpsc::Receiver<LoopEvent>,
    /// Used by timers to post events back into the loop.
    event_tx: mpsc::Sender<LoopEvent>,
    backend: B,
}

impl<B: RebuildBackend> fmt::Debug for WatchLoop<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchLoop")
            .field("core", &self.core)
            .finish_non_exhaustive()
    }
}

impl<B: RebuildBackend> WatchLoop<B> {
    pub fn new(
        core: WatchCore,
        event_rx: mpsc::Receiver<LoopEvent>,
        event_tx: mpsc::Sender<LoopEvent>,
        backend: B,
    ) -> Self {
        Self {
            core,
            event_rx,
            event_tx,
            backend,
        }
    }

    /// Run until the core reports `Stopped`, returning the final core state.
    pub async fn run(mut self) -> Result<WatchCore> {
        info!("watch loop started");

        while let Some(event) = self.event_rx.recv().await {
            debug!(?event, "watch loop received event");

            let step = self.core.step(event);
            for command in step.commands {
                self.execute_command(command).await?;
            }

            if !step.keep_running {
                break;
            }
        }

        info!(
            rebuilds = self.core.completed_runs(),
            failed = self.core.failed_runs(),
            "watch loop exiting"
        );
        Ok(self.core)
    }

    async fn execute_command(&mut self, command: LoopCommand) -> Result<()> {
        match command {
            LoopCommand::ScheduleDebounce {
                pipeline,
                generation,
                delay,
            } => {
                self.schedule(
                    delay,
                    LoopEvent::DebounceElapsed {
                        pipeline,
                        generation,
                    },
                );
            }
            LoopCommand::StartRebuild { pipeline } => {
                self.start_rebuild(pipeline).await?;
            }
            LoopCommand::ScheduleGrace { delay } => {
                self.schedule(delay, LoopEvent::GraceExpired);
            }
        }
        Ok(())
    }

    async fn start_rebuild(&mut self, pipeline: PipelineName) -> Result<()> {
        debug!(pipeline = %pipeline, "dispatching rebuild");
        self.backend.start_rebuild(pipeline).await
    }

    fn schedule(&self, delay: Duration, event: LoopEvent) {
        let tx = self.event_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // The loop may already have exited.
            let _ = tx.send(event).await;
        });
    }
}
