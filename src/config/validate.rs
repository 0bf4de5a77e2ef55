// src/config/validate.rs

use crate::config::model::{PIPELINES_KEY, TOOLS_KEY, VERSIONS_KEY, WATCH_KEY};
use crate::config::node::ConfigNode;
use crate::config::store::ConfigStore;
use crate::errors::{PipewrightError, Result};
use crate::pipeline::PipelineSet;

/// Check everything that can be checked before any template is resolved or
/// any task runs.
pub fn validate_store(store: &ConfigStore) -> Result<()> {
    validate_pipelines_shape(store)?;
    for key in [WATCH_KEY, VERSIONS_KEY, TOOLS_KEY] {
        validate_table_of_tables(store, key)?;
    }
    validate_pipeline_graph(store)?;
    Ok(())
}

fn validate_pipelines_shape(store: &ConfigStore) -> Result<()> {
    let Some(section) = store.section(PIPELINES_KEY) else {
        return Ok(());
    };

    let map = section.as_mapping().ok_or_else(|| {
        PipewrightError::ConfigError(format!(
            "[{PIPELINES_KEY}] must be a table (got {})",
            section.kind()
        ))
    })?;

    for (name, steps) in map.iter() {
        if name.is_empty() || name.contains(':') {
            return Err(PipewrightError::ConfigError(format!(
                "invalid pipeline name '{name}' (must be non-empty and contain no ':')"
            )));
        }

        let ok = match steps {
            ConfigNode::Scalar(_) => steps.as_str().is_some(),
            ConfigNode::Sequence(items) => items.iter().all(|s| s.as_str().is_some()),
            _ => false,
        };
        if !ok {
            return Err(PipewrightError::ConfigError(format!(
                "pipeline '{name}' must be a list of literal step names"
            )));
        }
    }

    Ok(())
}

fn validate_table_of_tables(store: &ConfigStore, key: &str) -> Result<()> {
    let Some(section) = store.section(key) else {
        return Ok(());
    };

    let map = section.as_mapping().ok_or_else(|| {
        PipewrightError::ConfigError(format!("[{key}] must be a table (got {})", section.kind()))
    })?;

    for (name, entry) in map.iter() {
        if entry.as_mapping().is_none() {
            return Err(PipewrightError::ConfigError(format!(
                "[{key}.{name}] must be a table (got {})",
                entry.kind()
            )));
        }
    }

    Ok(())
}

fn validate_pipeline_graph(store: &ConfigStore) -> Result<()> {
    let pipelines = PipelineSet::from_store(store)?;
    pipelines.validate()
}
