// src/template/resolver.rs

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::trace;

use crate::config::node::{ConfigNode, Scalar};
use crate::config::ConfigStore;
use crate::errors::{PipewrightError, Result};

use super::parser::{self, Placeholder, Segment, Source};
use super::transforms::TransformRegistry;

/// Pull-based resolver for template references.
///
/// Every value is resolved on demand, so a node may reference one declared
/// after it. Results are memoized per dotted path for the lifetime of the
/// resolver; the store never changes underneath it.
#[derive(Debug)]
pub struct Resolver {
    store: Arc<ConfigStore>,
    transforms: Arc<TransformRegistry>,
    cache: Mutex<HashMap<String, ConfigNode>>,
}

impl Resolver {
    /// Resolver using the built-in transforms.
    pub fn new(store: Arc<ConfigStore>) -> Self {
        Self::with_transforms(store, Arc::new(TransformRegistry::with_builtins()))
    }

    pub fn with_transforms(store: Arc<ConfigStore>, transforms: Arc<TransformRegistry>) -> Self {
        Self {
            store,
            transforms,
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn store(&self) -> &Arc<ConfigStore> {
        &self.store
    }

    pub fn transforms(&self) -> &TransformRegistry {
        &self.transforms
    }

    /// Resolve the node at `path` into a concrete value.
    pub fn resolve_path(&self, path: &str) -> Result<ConfigNode> {
        let mut stack = Vec::new();
        self.resolve_path_in(path, &mut stack)
    }

    /// Resolve a node that does not necessarily live in the store.
    ///
    /// `label` names the node in cycle reports.
    pub fn resolve(&self, node: &ConfigNode, label: &str) -> Result<ConfigNode> {
        let mut stack = Vec::new();
        self.resolve_labelled(node, label, &mut stack)
    }

    /// Resolve a node with an explicit call stack of dotted paths currently
    /// being resolved.
    pub fn resolve_with_stack(
        &self,
        node: &ConfigNode,
        label: &str,
        stack: &mut Vec<String>,
    ) -> Result<ConfigNode> {
        self.resolve_labelled(node, label, stack)
    }

    /// Resolve a template string directly, e.g. one passed on the command line.
    pub fn render(&self, template: &str) -> Result<ConfigNode> {
        self.resolve(&ConfigNode::string(template), "<inline>")
    }

    fn resolve_path_in(&self, path: &str, stack: &mut Vec<String>) -> Result<ConfigNode> {
        if let Some(cached) = self.cache().get(path) {
            return Ok(cached.clone());
        }

        let node = self.store.get(path)?;
        let resolved = self.resolve_labelled(node, path, stack)?;

        self.cache().insert(path.to_string(), resolved.clone());
        Ok(resolved)
    }

    fn resolve_labelled(
        &self,
        node: &ConfigNode,
        label: &str,
        stack: &mut Vec<String>,
    ) -> Result<ConfigNode> {
        if node.is_concrete() {
            return Ok(node.clone());
        }

        if let Some(pos) = stack.iter().position(|p| p == label) {
            let mut chain: Vec<String> = stack[pos..].to_vec();
            chain.push(label.to_string());
            return Err(PipewrightError::CycleDetected { chain });
        }

        stack.push(label.to_string());
        let result = self.resolve_inner(node, label, stack);
        stack.pop();
        result
    }

    fn resolve_inner(
        &self,
        node: &ConfigNode,
        label: &str,
        stack: &mut Vec<String>,
    ) -> Result<ConfigNode> {
        match node {
            ConfigNode::Scalar(_) => Ok(node.clone()),
            ConfigNode::Sequence(items) => items
                .iter()
                .enumerate()
                .map(|(i, item)| self.resolve_labelled(item, &format!("{label}.{i}"), stack))
                .collect::<Result<Vec<_>>>()
                .map(ConfigNode::Sequence),
            ConfigNode::Mapping(map) => {
                let mut out = map.clone();
                for (key, value) in out.iter_mut() {
                    *value = self.resolve_labelled(value, &format!("{label}.{key}"), stack)?;
                }
                Ok(ConfigNode::Mapping(out))
            }
            ConfigNode::TemplateRef(raw) => self.resolve_template(raw, label, stack),
        }
    }

    fn resolve_template(
        &self,
        raw: &str,
        label: &str,
        stack: &mut Vec<String>,
    ) -> Result<ConfigNode> {
        trace!(path = label, template = raw, "resolving template");
        let segments = parser::parse(raw)?;

        // A lone placeholder keeps the referenced value's shape.
        if let [Segment::Placeholder(p)] = segments.as_slice() {
            return self.evaluate(p, stack);
        }

        let mut out = String::new();
        for segment in &segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Placeholder(p) => {
                    let value = self.evaluate(p, stack)?;
                    let text = value.render_inline().ok_or_else(|| {
                        PipewrightError::ConfigError(format!(
                            "cannot embed a {} into '{raw}' at {label}",
                            value.kind()
                        ))
                    })?;
                    out.push_str(&text);
                }
            }
        }

        Ok(ConfigNode::Scalar(Scalar::String(out)))
    }

    fn evaluate(&self, placeholder: &Placeholder, stack: &mut Vec<String>) -> Result<ConfigNode> {
        let mut value = match &placeholder.source {
            Source::Path(path) => self.resolve_path_in(path, stack)?,
            Source::Call(call) => self.transforms.apply(call, None)?,
        };

        for call in &placeholder.transforms {
            value = self.transforms.apply(call, Some(&value))?;
        }

        Ok(value)
    }

    fn cache(&self) -> MutexGuard<'_, HashMap<String, ConfigNode>> {
        self.cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
