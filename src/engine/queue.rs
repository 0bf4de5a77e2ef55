// src/engine/queue.rs

use std::collections::{HashSet, VecDeque};

use tracing::debug;

use super::PipelineName;

/// Rebuilds waiting for the single run slot.
///
/// Semantics:
/// - Each pipeline appears at most once; pushing a pipeline that is already
///   pending is a no-op (the requests are coalesced).
/// - Pipelines are started in the order they first became pending.
#[derive(Debug, Default)]
pub struct RebuildQueue {
    order: VecDeque<PipelineName>,
    pending: HashSet<PipelineName>,
}

impl RebuildQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn contains(&self, pipeline: &str) -> bool {
        self.pending.contains(pipeline)
    }

    /// Record a pending rebuild. Returns false if it was already pending.
    pub fn push(&mut self, pipeline: &str) -> bool {
        if !self.pending.insert(pipeline.to_string()) {
            debug!(pipeline, "rebuild already pending; coalesced");
            return false;
        }
        self.order.push_back(pipeline.to_string());
        debug!(pipeline, pending = self.order.len(), "rebuild queued");
        true
    }

    /// Next pipeline to rebuild.
    pub fn pop(&mut self) -> Option<PipelineName> {
        let next = self.order.pop_front()?;
        self.pending.remove(&next);
        Some(next)
    }

    /// Drop every pending rebuild, returning what was dropped.
    pub fn clear(&mut self) -> Vec<PipelineName> {
        self.pending.clear();
        self.order.drain(..).collect()
    }
}
