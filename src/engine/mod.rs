// src/engine/mod.rs

//! Watch/rebuild engine.
//!
//! This module ties together:
//! - the per-pipeline debounce / run state machine
//! - the rebuild queue (at most one pending rebuild per pipeline)
//! - the main event loop that reacts to:
//!   - file changes forwarded by the watcher
//!   - debounce and grace-period timers
//!   - rebuild completions
//!   - cancellation (Ctrl-C)
//!
//! The pure core state machine lives in [`core`]; the async/IO shell is
//! implemented in [`runtime`]; rebuilds are started through a
//! [`backend::RebuildBackend`].

use std::time::Duration;

/// Pipeline name as used by watch rules.
pub type PipelineName = String;

/// How a rebuild ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Success,
    Failed(String),
}

/// Events flowing into the loop from the watcher, timers and rebuilds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopEvent {
    /// A watched file of this pipeline changed.
    Changed { pipeline: PipelineName },
    /// A debounce timer fired. Only the latest generation counts.
    DebounceElapsed {
        pipeline: PipelineName,
        generation: u64,
    },
    /// A rebuild finished, successfully or not.
    RunFinished {
        pipeline: PipelineName,
        outcome: RunOutcome,
    },
    /// Stop watching (e.g. Ctrl-C).
    CancelRequested,
    /// The grace period after cancellation elapsed.
    GraceExpired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopOptions {
    /// Quiet window after the last change before a rebuild starts.
    pub debounce: Duration,
    /// How long cancellation waits for an in-flight rebuild.
    pub grace_period: Duration,
}

impl Default for LoopOptions {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(300),
            grace_period: Duration::from_secs(5),
        }
    }
}

impl LoopOptions {
    pub fn from_settings(settings: &crate::config::Settings) -> Self {
        Self {
            debounce: Duration::from_millis(settings.debounce_ms),
            grace_period: Duration::from_millis(settings.grace_period_ms),
        }
    }
}

pub mod backend;
pub mod core;
pub mod queue;
pub mod runtime;

pub use self::backend::{ComposerBackend, RebuildBackend};
pub use self::core::{LoopCommand, LoopPhase, LoopStep, PipelineState, WatchCore};
pub use self::queue::RebuildQueue;
pub use self::runtime::WatchLoop;
