pub mod builders;
pub mod fake_rebuild;
pub mod recording_tool;

use std::sync::Once;
use tracing_subscriber::{fmt, EnvFilter};

pub use builders::ConfigBuilder;
pub use fake_rebuild::FakeRebuildBackend;
pub use recording_tool::{CallLog, RecordingTool};

static INIT: Once = Once::new();

/// Initialise tracing for tests.
///
/// Logs are captured per test and only shown for failures (or with
/// `-- --nocapture`). Levels come from `PIPEWRIGHT_LOG`, e.g.
/// `PIPEWRIGHT_LOG=debug cargo test`.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_env(pipewright::logging::LOG_ENV)
            .unwrap_or_else(|_| EnvFilter::new("info"));

        fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .init();
    });
}

/// Run a future with a 5-second timeout.
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: std::future::Future<Output = T>,
{
    tokio::time::timeout(std::time::Duration::from_secs(5), f)
        .await
        .expect("test timed out after 5 seconds")
}
