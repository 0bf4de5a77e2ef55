// src/cli.rs

//! CLI argument parsing using `clap` (derive).

use clap::{Parser, Subcommand, ValueEnum};

use crate::config::loader::DEFAULT_CONFIG_FILE;

/// Command-line arguments for `pipewright`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "pipewright",
    version,
    about = "Declarative build pipelines: templated task config, ordered steps, version sync and watch mode.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Its directory is the project root: source patterns, destinations and
    /// watch rules are relative to it.
    #[arg(long, global = true, value_name = "PATH", default_value = DEFAULT_CONFIG_FILE)]
    pub config: String,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `PIPEWRIGHT_LOG` or `info` is used.
    #[arg(long, global = true, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Run pipelines (or single `task` / `task:target` steps) in order.
    Run {
        /// Pipelines to run; defaults to `settings.default_pipeline`.
        #[arg(value_name = "PIPELINE")]
        pipelines: Vec<String>,

        /// Fail when a target's source patterns match nothing.
        #[arg(long)]
        strict: bool,
    },

    /// Resolve a pipeline and print its steps without running anything.
    Plan {
        #[arg(value_name = "PIPELINE")]
        pipeline: String,
    },

    /// Rewrite version markers across the files of the `[versions]` rules.
    Version {
        /// New version, or `major` / `minor` / `patch` to bump the current one.
        #[arg(value_name = "VERSION")]
        version: String,

        /// Only apply these rules (repeatable); all rules by default.
        #[arg(long = "rule", value_name = "NAME")]
        rules: Vec<String>,

        /// Fail when a rule matches nothing.
        #[arg(long)]
        strict: bool,
    },

    /// Watch files and rebuild the bound pipelines until Ctrl-C.
    Watch {
        /// Run this pipeline once before watching.
        #[arg(long, value_name = "PIPELINE")]
        initial: Option<String>,
    },
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
