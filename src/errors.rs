// src/errors.rs

//! Crate-wide error type and exit-code mapping.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipewrightError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Path not found in config: '{0}'")]
    PathNotFound(String),

    #[error("Template cycle detected: {}", .chain.join(" -> "))]
    CycleDetected { chain: Vec<String> },

    #[error("Cyclic pipeline composition: {}", .chain.join(" -> "))]
    CyclicPipeline { chain: Vec<String> },

    #[error("No source files matched for {identity} (patterns: {patterns:?})")]
    EmptySourceSet {
        identity: String,
        patterns: Vec<String>,
    },

    #[error("Step {step} ({identity}) failed: {message}")]
    ToolFailed {
        step: usize,
        identity: String,
        message: String,
    },

    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("Version rule '{rule}' matched nothing")]
    NoMatchFound { rule: String },

    #[error("Invalid version: {0}")]
    InvalidVersion(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PipewrightError {
    /// Process exit code for this failure class.
    pub fn exit_code(&self) -> i32 {
        match self {
            PipewrightError::ConfigError(_)
            | PipewrightError::PathNotFound(_)
            | PipewrightError::TomlError(_)
            | PipewrightError::EmptySourceSet { .. }
            | PipewrightError::InvalidVersion(_) => 2,
            PipewrightError::CycleDetected { .. } | PipewrightError::CyclicPipeline { .. } => 3,
            PipewrightError::ToolFailed { .. } => 4,
            PipewrightError::FileNotFound(_) | PipewrightError::NoMatchFound { .. } => 5,
            PipewrightError::IoError(_) | PipewrightError::Other(_) => 1,
        }
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, PipewrightError>;
