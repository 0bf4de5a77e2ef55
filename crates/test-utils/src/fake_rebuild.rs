use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use pipewright::engine::{LoopEvent, PipelineName, RebuildBackend, RunOutcome};
use pipewright::errors::Result;
use tokio::sync::mpsc;

/// A fake rebuild backend that:
/// - records which pipelines were started, in order
/// - reports `RunFinished` after `duration` (immediately by default), or
///   never when `hold` is set, leaving completion to the test
/// - reports a failure for pipelines listed in `failing`.
pub struct FakeRebuildBackend {
    events_tx: mpsc::Sender<LoopEvent>,
    started: Arc<Mutex<Vec<PipelineName>>>,
    failing: HashSet<PipelineName>,
    duration: Duration,
    hold: bool,
}

impl FakeRebuildBackend {
    pub fn new(events_tx: mpsc::Sender<LoopEvent>, started: Arc<Mutex<Vec<PipelineName>>>) -> Self {
        Self {
            events_tx,
            started,
            failing: HashSet::new(),
            duration: Duration::ZERO,
            hold: false,
        }
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    pub fn holding(mut self) -> Self {
        self.hold = true;
        self
    }

    pub fn failing(mut self, pipeline: &str) -> Self {
        self.failing.insert(pipeline.to_string());
        self
    }
}

impl RebuildBackend for FakeRebuildBackend {
    fn start_rebuild(
        &mut self,
        pipeline: PipelineName,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        self.started.lock().unwrap().push(pipeline.clone());

        let tx = self.events_tx.clone();
        let duration = self.duration;
        let hold = self.hold;
        let outcome = if self.failing.contains(&pipeline) {
            RunOutcome::Failed(format!("{pipeline} failed"))
        } else {
            RunOutcome::Success
        };

        Box::pin(async move {
            if !hold {
                tokio::spawn(async move {
                    tokio::time::sleep(duration).await;
                    let _ = tx.send(LoopEvent::RunFinished { pipeline, outcome }).await;
                });
            }
            Ok(())
        })
    }
}
