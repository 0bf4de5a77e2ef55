// src/pipeline/composer.rs

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info, warn};

use crate::errors::{PipewrightError, Result};
use crate::registry::{Registry, ResolvedTarget};
use crate::tools::{Tool, ToolRegistry};

use super::graph::PipelineSet;
use super::step::{StepRef, TaskStep};

/// A pipeline resolved up front: every target's templates evaluated and every
/// tool looked up, before anything runs.
#[derive(Debug, Clone)]
pub struct Plan {
    pub pipeline: String,
    pub steps: Vec<PlannedStep>,
}

/// One target to run, at a 0-based position in the plan.
#[derive(Debug, Clone)]
pub struct PlannedStep {
    pub index: usize,
    pub target: ResolvedTarget,
}

impl PlannedStep {
    pub fn identity(&self) -> String {
        self.target.identity()
    }
}

#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub pipeline: String,
    pub steps: Vec<StepReport>,
}

impl RunReport {
    pub fn invocation_count(&self) -> usize {
        self.steps.iter().map(|s| s.invocations).sum()
    }

    pub fn produced(&self) -> impl Iterator<Item = &PathBuf> {
        self.steps.iter().flat_map(|s| s.produced.iter())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepReport {
    pub index: usize,
    pub identity: String,
    pub invocations: usize,
    pub produced: Vec<PathBuf>,
    pub warnings: Vec<String>,
}

/// Runs pipelines step by step against the tool registry.
#[derive(Debug)]
pub struct Composer {
    pipelines: PipelineSet,
    registry: Registry,
    tools: ToolRegistry,
}

impl Composer {
    /// Build a composer, rejecting cyclic pipeline composition.
    pub fn new(pipelines: PipelineSet, registry: Registry, tools: ToolRegistry) -> Result<Self> {
        pipelines.validate()?;
        Ok(Self {
            pipelines,
            registry,
            tools,
        })
    }

    pub fn pipelines(&self) -> &PipelineSet {
        &self.pipelines
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Flatten a pipeline into task steps.
    ///
    /// A name that is not a pipeline is accepted as a one-step pipeline
    /// (`task` or `task:target`).
    pub fn flatten(&self, name: &str) -> Result<Vec<TaskStep>> {
        if self.pipelines.contains(name) {
            return self.pipelines.flatten(name);
        }

        match StepRef::parse(name)? {
            StepRef::Name(task) => Ok(vec![TaskStep { task, target: None }]),
            StepRef::Target { task, target } => Ok(vec![TaskStep {
                task,
                target: Some(target),
            }]),
        }
    }

    /// Resolve a pipeline without running it.
    pub fn plan(&self, name: &str) -> Result<Plan> {
        let mut steps = Vec::new();

        for step in self.flatten(name)? {
            let targets = self
                .registry
                .resolve_targets(&step.task, step.target.as_deref())?;

            for target in targets {
                self.tool_for(&target)?;
                steps.push(PlannedStep {
                    index: steps.len(),
                    target,
                });
            }
        }

        Ok(Plan {
            pipeline: name.to_string(),
            steps,
        })
    }

    /// Plan and run a pipeline, stopping at the first failing step.
    pub async fn run(&self, name: &str) -> Result<RunReport> {
        let plan = self.plan(name)?;
        self.run_plan(&plan).await
    }

    /// Run an already resolved plan.
    ///
    /// Sources are expanded when each step starts, so files produced by
    /// earlier steps are visible to later ones. Completed steps are not
    /// rolled back on failure.
    pub async fn run_plan(&self, plan: &Plan) -> Result<RunReport> {
        info!(pipeline = %plan.pipeline, steps = plan.steps.len(), "running pipeline");
        let mut report = RunReport {
            pipeline: plan.pipeline.clone(),
            steps: Vec::with_capacity(plan.steps.len()),
        };

        for step in &plan.steps {
            let identity = step.identity();
            let tool = self.tool_for(&step.target)?;
            let invocations = self
                .registry
                .expand_target(&step.target, tool.source_filter())?;

            info!(
                pipeline = %plan.pipeline,
                step = step.index,
                identity = %identity,
                invocations = invocations.len(),
                "running step"
            );

            let mut step_report = StepReport {
                index: step.index,
                identity: identity.clone(),
                invocations: invocations.len(),
                produced: Vec::new(),
                warnings: Vec::new(),
            };

            for invocation in &invocations {
                let output = tool.invoke(invocation).await.map_err(|e| {
                    PipewrightError::ToolFailed {
                        step: step.index,
                        identity: identity.clone(),
                        message: format!("{e:#}"),
                    }
                })?;

                for warning in &output.warnings {
                    warn!(step = step.index, identity = %identity, "{warning}");
                }
                step_report.produced.extend(output.produced);
                step_report.warnings.extend(output.warnings);
            }

            report.steps.push(step_report);
        }

        info!(
            pipeline = %plan.pipeline,
            steps = report.steps.len(),
            invocations = report.invocation_count(),
            "pipeline finished"
        );
        Ok(report)
    }

    fn tool_for(&self, target: &ResolvedTarget) -> Result<Arc<dyn Tool>> {
        self.tools.get(&target.tool).ok_or_else(|| {
            PipewrightError::ConfigError(format!(
                "no tool registered for kind '{}' (used by {})",
                target.tool,
                target.identity()
            ))
        })
    }
}
