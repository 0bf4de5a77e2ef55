// src/template/transforms.rs

//! Named pure functions applied to resolved values inside placeholders.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, bail, Result};
use chrono::format::{Item, StrftimeItems};

use crate::config::node::{ConfigNode, Scalar};
use crate::errors::PipewrightError;

use super::parser::TransformCall;

/// `input` is `None` when the transform is used as a placeholder source
/// (`{{ today(%Y) }}`).
pub type TransformFn =
    Arc<dyn Fn(Option<&ConfigNode>, Option<&str>) -> Result<ConfigNode> + Send + Sync>;

/// Registry of transforms by name, populated explicitly at startup.
#[derive(Clone, Default)]
pub struct TransformRegistry {
    transforms: HashMap<String, TransformFn>,
}

impl fmt::Debug for TransformRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.transforms.keys().collect();
        names.sort();
        f.debug_struct("TransformRegistry")
            .field("transforms", &names)
            .finish()
    }
}

impl TransformRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with the built-in transforms.
    pub fn with_builtins() -> Self {
        let mut reg = Self::new();
        reg.register_str_fn("stem", |s| {
            Path::new(s)
                .file_stem()
                .map(|p| p.to_string_lossy().into_owned())
                .unwrap_or_default()
        });
        reg.register_str_fn("basename", |s| {
            Path::new(s)
                .file_name()
                .map(|p| p.to_string_lossy().into_owned())
                .unwrap_or_default()
        });
        reg.register_str_fn("dirname", |s| {
            Path::new(s)
                .parent()
                .map(|p| p.to_string_lossy().replace('\\', "/"))
                .unwrap_or_default()
        });
        reg.register_str_fn("ext", |s| {
            Path::new(s)
                .extension()
                .map(|p| p.to_string_lossy().into_owned())
                .unwrap_or_default()
        });
        reg.register_str_fn("upper", |s| s.to_uppercase());
        reg.register_str_fn("lower", |s| s.to_lowercase());
        reg.register_str_fn("quote_regex", regex::escape);

        reg.register("join", |input, arg| {
            let input = input.ok_or_else(|| anyhow!("join needs an input value"))?;
            let sep = arg.unwrap_or(",");
            let items = match input {
                ConfigNode::Sequence(items) => items.as_slice(),
                other => std::slice::from_ref(other),
            };
            let parts = items
                .iter()
                .map(|i| {
                    i.render_inline()
                        .ok_or_else(|| anyhow!("cannot join a {}", i.kind()))
                })
                .collect::<Result<Vec<_>>>()?;
            Ok(ConfigNode::Scalar(Scalar::String(parts.join(sep))))
        });

        reg.register("today", |_input, arg| {
            let fmt = arg.unwrap_or("%Y-%m-%d");
            let items: Vec<Item<'_>> = StrftimeItems::new(fmt).collect();
            if items.iter().any(|item| matches!(item, Item::Error)) {
                bail!("today: invalid date format {fmt:?}");
            }
            Ok(ConfigNode::Scalar(Scalar::String(
                chrono::Local::now()
                    .format_with_items(items.into_iter())
                    .to_string(),
            )))
        });

        reg
    }

    pub fn register<F>(&mut self, name: impl Into<String>, f: F)
    where
        F: Fn(Option<&ConfigNode>, Option<&str>) -> Result<ConfigNode> + Send + Sync + 'static,
    {
        let f: TransformFn = Arc::new(f);
        self.transforms.insert(name.into(), f);
    }

    /// Register a string-to-string transform, applied element-wise to lists.
    pub fn register_str_fn<F>(&mut self, name: &str, f: F)
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        let owned = name.to_string();
        self.register(name, move |input, _arg| {
            let input = input.ok_or_else(|| anyhow!("transform '{owned}' needs an input value"))?;
            map_strings(input, &f)
        });
    }

    pub fn contains(&self, name: &str) -> bool {
        self.transforms.contains_key(name)
    }

    /// Apply a parsed transform call.
    pub fn apply(
        &self,
        call: &TransformCall,
        input: Option<&ConfigNode>,
    ) -> crate::errors::Result<ConfigNode> {
        let f = self.transforms.get(&call.name).ok_or_else(|| {
            PipewrightError::ConfigError(format!("unknown transform '{}'", call.name))
        })?;

        f(input, call.arg.as_deref()).map_err(|e| {
            PipewrightError::ConfigError(format!("transform '{}' failed: {e}", call.name))
        })
    }
}

fn map_strings<F>(node: &ConfigNode, f: &F) -> Result<ConfigNode>
where
    F: Fn(&str) -> String,
{
    match node {
        ConfigNode::Scalar(s) => Ok(ConfigNode::Scalar(Scalar::String(f(&s.to_string())))),
        ConfigNode::Sequence(items) => Ok(ConfigNode::Sequence(
            items
                .iter()
                .map(|i| map_strings(i, f))
                .collect::<Result<Vec<_>>>()?,
        )),
        other => Err(anyhow!("expected a string or list, got {}", other.kind())),
    }
}
