// src/engine/core.rs

//! Pure watch-loop state machine.
//!
//! [`WatchCore`] consumes [`LoopEvent`]s and produces:
//! - an updated state
//! - a list of [`LoopCommand`]s describing what the IO shell should do next
//!
//! The async shell (`engine::runtime::WatchLoop`) owns the timers, the
//! channels and the rebuild backend. The core has no Tokio types and can be
//! tested by feeding events by hand.
//!
//! Per pipeline: `Idle -> Debouncing -> (Queued ->) Running -> Idle`.
//! Only one rebuild runs at a time across all pipelines.

use std::collections::HashMap;
use std::time::Duration;

use tracing::{debug, info, warn};

use super::queue::RebuildQueue;
use super::{LoopEvent, LoopOptions, PipelineName, RunOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    /// Waiting for the quiet window of this generation to pass.
    Debouncing { generation: u64 },
    /// Waiting for the run slot.
    Queued,
    /// Rebuilding; `rerun` is set when a change arrived meanwhile.
    Running { rerun: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopPhase {
    Active,
    /// Cancelled while a rebuild was in flight; waiting for it or the grace
    /// period.
    Stopping,
    Stopped,
}

/// Instructions for the IO shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopCommand {
    ScheduleDebounce {
        pipeline: PipelineName,
        generation: u64,
        delay: Duration,
    },
    StartRebuild { pipeline: PipelineName },
    ScheduleGrace { delay: Duration },
}

/// Result of one core step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopStep {
    pub commands: Vec<LoopCommand>,
    pub keep_running: bool,
}

impl LoopStep {
    fn idle() -> Self {
        Self {
            commands: Vec::new(),
            keep_running: true,
        }
    }

    fn with(commands: Vec<LoopCommand>) -> Self {
        Self {
            commands,
            keep_running: true,
        }
    }

    fn stop() -> Self {
        Self {
            commands: Vec::new(),
            keep_running: false,
        }
    }
}

#[derive(Debug)]
pub struct WatchCore {
    options: LoopOptions,
    states: HashMap<PipelineName, PipelineState>,
    queue: RebuildQueue,
    running: Option<PipelineName>,
    next_generation: u64,
    phase: LoopPhase,
    completed: u64,
    failed: u64,
}

impl WatchCore {
    pub fn new(options: LoopOptions) -> Self {
        Self {
            options,
            states: HashMap::new(),
            queue: RebuildQueue::new(),
            running: None,
            next_generation: 0,
            phase: LoopPhase::Active,
            completed: 0,
            failed: 0,
        }
    }

    pub fn state(&self, pipeline: &str) -> PipelineState {
        self.states
            .get(pipeline)
            .copied()
            .unwrap_or(PipelineState::Idle)
    }

    pub fn phase(&self) -> LoopPhase {
        self.phase
    }

    pub fn running(&self) -> Option<&str> {
        self.running.as_deref()
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    /// Rebuilds finished so far (successful or not).
    pub fn completed_runs(&self) -> u64 {
        self.completed
    }

    pub fn failed_runs(&self) -> u64 {
        self.failed
    }

    /// Handle a single event, updating state and returning commands for the
    /// IO shell.
    pub fn step(&mut self, event: LoopEvent) -> LoopStep {
        match event {
            LoopEvent::Changed { pipeline } => self.on_changed(pipeline),
            LoopEvent::DebounceElapsed {
                pipeline,
                generation,
            } => self.on_debounce_elapsed(pipeline, generation),
            LoopEvent::RunFinished { pipeline, outcome } => self.on_run_finished(pipeline, outcome),
            LoopEvent::CancelRequested => self.on_cancel(),
            LoopEvent::GraceExpired => self.on_grace_expired(),
        }
    }

    fn on_changed(&mut self, pipeline: PipelineName) -> LoopStep {
        if self.phase != LoopPhase::Active {
            debug!(pipeline = %pipeline, "ignoring change while stopping");
            return LoopStep::idle();
        }

        match self.state(&pipeline) {
            PipelineState::Idle | PipelineState::Debouncing { .. } => {
                self.next_generation += 1;
                let generation = self.next_generation;
                self.states
                    .insert(pipeline.clone(), PipelineState::Debouncing { generation });
                debug!(pipeline = %pipeline, generation, "debouncing change");
                LoopStep::with(vec![LoopCommand::ScheduleDebounce {
                    pipeline,
                    generation,
                    delay: self.options.debounce,
                }])
            }
            PipelineState::Queued => {
                debug!(pipeline = %pipeline, "rebuild already queued; change coalesced");
                LoopStep::idle()
            }
            PipelineState::Running { .. } => {
                debug!(pipeline = %pipeline, "change during rebuild; will rerun afterwards");
                self.states
                    .insert(pipeline, PipelineState::Running { rerun: true });
                LoopStep::idle()
            }
        }
    }

    fn on_debounce_elapsed(&mut self, pipeline: PipelineName, generation: u64) -> LoopStep {
        if self.phase != LoopPhase::Active {
            return LoopStep::idle();
        }

        match self.state(&pipeline) {
            PipelineState::Debouncing { generation: current } if current == generation => {}
            _ => {
                debug!(pipeline = %pipeline, generation, "stale debounce timer ignored");
                return LoopStep::idle();
            }
        }

        if self.running.is_none() {
            LoopStep::with(vec![self.start(pipeline)])
        } else {
            self.states.insert(pipeline.clone(), PipelineState::Queued);
            self.queue.push(&pipeline);
            LoopStep::idle()
        }
    }

    fn on_run_finished(&mut self, pipeline: PipelineName, outcome: RunOutcome) -> LoopStep {
        self.completed += 1;
        match &outcome {
            RunOutcome::Success => info!(pipeline = %pipeline, "rebuild finished"),
            RunOutcome::Failed(reason) => {
                self.failed += 1;
                warn!(pipeline = %pipeline, %reason, "rebuild failed; still watching");
            }
        }

        if self.running.as_deref() == Some(pipeline.as_str()) {
            self.running = None;
        }

        let rerun = matches!(
            self.state(&pipeline),
            PipelineState::Running { rerun: true }
        );

        if self.phase == LoopPhase::Stopping {
            self.states.insert(pipeline, PipelineState::Idle);
            return self.stop();
        }

        if rerun {
            self.states.insert(pipeline.clone(), PipelineState::Queued);
            self.queue.push(&pipeline);
        } else {
            self.states.insert(pipeline, PipelineState::Idle);
        }

        if self.running.is_none() {
            if let Some(next) = self.queue.pop() {
                return LoopStep::with(vec![self.start(next)]);
            }
        }
        LoopStep::idle()
    }

    fn on_cancel(&mut self) -> LoopStep {
        match self.phase {
            LoopPhase::Active => {
                let dropped = self.queue.clear();
                if !dropped.is_empty() {
                    info!(?dropped, "dropping pending rebuilds on cancel");
                }
                for state in self.states.values_mut() {
                    if !matches!(state, PipelineState::Running { .. }) {
                        *state = PipelineState::Idle;
                    }
                }

                match self.running.clone() {
                    Some(pipeline) => {
                        info!(
                            pipeline = %pipeline,
                            grace_ms = self.options.grace_period.as_millis() as u64,
                            "cancel requested; waiting for in-flight rebuild"
                        );
                        self.phase = LoopPhase::Stopping;
                        LoopStep::with(vec![LoopCommand::ScheduleGrace {
                            delay: self.options.grace_period,
                        }])
                    }
                    None => self.stop(),
                }
            }
            LoopPhase::Stopping => {
                warn!("second cancel request; stopping without waiting");
                self.stop()
            }
            LoopPhase::Stopped => LoopStep::stop(),
        }
    }

    fn on_grace_expired(&mut self) -> LoopStep {
        if self.phase != LoopPhase::Stopping {
            return LoopStep::idle();
        }
        warn!(
            pipeline = ?self.running,
            "grace period elapsed with a rebuild still running"
        );
        self.stop()
    }

    fn start(&mut self, pipeline: PipelineName) -> LoopCommand {
        info!(pipeline = %pipeline, "starting rebuild");
        self.running = Some(pipeline.clone());
        self.states
            .insert(pipeline.clone(), PipelineState::Running { rerun: false });
        LoopCommand::StartRebuild { pipeline }
    }

    fn stop(&mut self) -> LoopStep {
        self.phase = LoopPhase::Stopped;
        info!("watch loop stopped");
        LoopStep::stop()
    }
}
