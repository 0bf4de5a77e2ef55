// src/logging.rs

//! Logging setup using `tracing` + `tracing-subscriber`.
//!
//! Priority for determining the filter:
//! 1. `--log-level` CLI flag (if provided)
//! 2. `PIPEWRIGHT_LOG` environment variable (a level such as `debug`, or
//!    full directives such as `pipewright::engine=trace,info`)
//! 3. default to `info`
//!
//! Logs go to STDERR; stdout is reserved for command output (`plan`,
//! version reports).

use anyhow::{anyhow, Result};
use tracing_subscriber::EnvFilter;

use crate::cli::LogLevel;

/// Environment variable read when no `--log-level` is given.
pub const LOG_ENV: &str = "PIPEWRIGHT_LOG";

/// Initialise the global subscriber. Call once at startup.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(build_filter(cli_level))
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow!("failed to initialise logging: {e}"))
}

fn build_filter(cli_level: Option<LogLevel>) -> EnvFilter {
    if let Some(level) = cli_level {
        return EnvFilter::new(level.as_str());
    }

    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"))
}
