// src/template/mod.rs

//! Template references inside config values.

pub mod parser;
pub mod resolver;
pub mod transforms;

pub use resolver::Resolver;
pub use transforms::{TransformFn, TransformRegistry};

/// Placeholder delimiters.
pub const OPEN: &str = "{{";
pub const CLOSE: &str = "}}";
