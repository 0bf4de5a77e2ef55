// src/pipeline/mod.rs

//! Pipeline composition.
//!
//! - [`step`] parses `task` / `task:target` / pipeline references.
//! - [`graph`] holds the `[pipelines]` table, checks it for cycles and
//!   flattens nested pipelines.
//! - [`composer`] resolves a flattened pipeline and runs it in order.

pub mod composer;
pub mod graph;
pub mod step;

pub use composer::{Composer, Plan, PlannedStep, RunReport, StepReport};
pub use graph::PipelineSet;
pub use step::{StepRef, TaskStep};
