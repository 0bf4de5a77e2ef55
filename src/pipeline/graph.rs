// src/pipeline/graph.rs

use std::collections::HashMap;

use indexmap::IndexMap;
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};

use crate::config::model::PIPELINES_KEY;
use crate::config::node::ConfigNode;
use crate::config::store::ConfigStore;
use crate::errors::{PipewrightError, Result};

use super::step::{StepRef, TaskStep};

/// All `[pipelines]` entries, in declaration order.
#[derive(Debug, Clone, Default)]
pub struct PipelineSet {
    pipelines: IndexMap<String, Vec<StepRef>>,
}

impl PipelineSet {
    pub fn from_store(store: &ConfigStore) -> Result<Self> {
        let mut pipelines = IndexMap::new();

        let Some(section) = store.section(PIPELINES_KEY) else {
            return Ok(Self { pipelines });
        };
        let map = section.as_mapping().ok_or_else(|| {
            PipewrightError::ConfigError(format!("[{PIPELINES_KEY}] must be a table"))
        })?;

        for (name, node) in map {
            let raw: Vec<&ConfigNode> = match node {
                ConfigNode::Sequence(items) => items.iter().collect(),
                other => vec![other],
            };

            let steps = raw
                .into_iter()
                .map(|step| {
                    let s = step.as_str().ok_or_else(|| {
                        PipewrightError::ConfigError(format!(
                            "pipeline '{name}' contains a non-string step ({})",
                            step.kind()
                        ))
                    })?;
                    StepRef::parse(s)
                })
                .collect::<Result<Vec<_>>>()?;

            pipelines.insert(name.clone(), steps);
        }

        Ok(Self { pipelines })
    }

    pub fn from_steps<I, S>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, Vec<S>)>,
        S: AsRef<str>,
    {
        let mut pipelines = IndexMap::new();
        for (name, steps) in entries {
            let steps = steps
                .iter()
                .map(|s| StepRef::parse(s.as_ref()))
                .collect::<Result<Vec<_>>>()?;
            pipelines.insert(name.as_ref().to_string(), steps);
        }
        Ok(Self { pipelines })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.pipelines.contains_key(name)
    }

    pub fn steps(&self, name: &str) -> Option<&[StepRef]> {
        self.pipelines.get(name).map(Vec::as_slice)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.pipelines.keys().map(String::as_str)
    }

    /// Reject pipelines that (transitively) include themselves.
    pub fn validate(&self) -> Result<()> {
        let mut graph: DiGraph<&str, ()> = DiGraph::new();
        let mut index: HashMap<&str, NodeIndex> = HashMap::new();

        for name in self.pipelines.keys() {
            index.insert(name.as_str(), graph.add_node(name.as_str()));
        }

        for (name, steps) in &self.pipelines {
            for step in steps {
                if let StepRef::Name(child) = step {
                    if let Some(&to) = index.get(child.as_str()) {
                        graph.add_edge(index[name.as_str()], to, ());
                    }
                }
            }
        }

        match toposort(&graph, None) {
            Ok(_) => Ok(()),
            Err(cycle) => {
                let start = graph[cycle.node_id()];
                // `start` lies on the cycle, so flattening from it always
                // revisits it and returns the full chain. The fallback below
                // only keeps the signature total and is never reached.
                self.flatten(start)?;
                Err(PipewrightError::CyclicPipeline {
                    chain: vec![start.to_string(), start.to_string()],
                })
            }
        }
    }

    /// Expand a pipeline into the ordered task steps it runs.
    pub fn flatten(&self, name: &str) -> Result<Vec<TaskStep>> {
        let mut out = Vec::new();
        let mut stack = Vec::new();
        self.flatten_into(name, &mut stack, &mut out)?;
        Ok(out)
    }

    fn flatten_into(
        &self,
        name: &str,
        stack: &mut Vec<String>,
        out: &mut Vec<TaskStep>,
    ) -> Result<()> {
        if let Some(pos) = stack.iter().position(|p| p == name) {
            let mut chain = stack[pos..].to_vec();
            chain.push(name.to_string());
            return Err(PipewrightError::CyclicPipeline { chain });
        }

        let steps = self.pipelines.get(name).ok_or_else(|| {
            PipewrightError::ConfigError(format!("unknown pipeline '{name}'"))
        })?;

        stack.push(name.to_string());
        for step in steps {
            match step {
                StepRef::Name(child) if self.contains(child) => {
                    self.flatten_into(child, stack, out)?;
                }
                StepRef::Name(task) => out.push(TaskStep {
                    task: task.clone(),
                    target: None,
                }),
                StepRef::Target { task, target } => out.push(TaskStep {
                    task: task.clone(),
                    target: Some(target.clone()),
                }),
            }
        }
        stack.pop();

        Ok(())
    }
}
