use std::sync::{Arc, Mutex};

use pipewright::registry::TargetInvocation;
use pipewright::tools::{Tool, ToolFuture, ToolOutput};
use pipewright::types::SourceFilter;

/// Shared, ordered log of invocation identities (`task:target`).
pub type CallLog = Arc<Mutex<Vec<String>>>;

/// A fake tool that:
/// - records every invocation it receives (in order, into a log that may be
///   shared with other tools)
/// - reports its `dest` (or nothing) as produced
/// - fails on the first invocation whose identity equals `fail_on`.
#[derive(Debug, Clone)]
pub struct RecordingTool {
    log: CallLog,
    invocations: Arc<Mutex<Vec<TargetInvocation>>>,
    fail_on: Option<String>,
    filter: SourceFilter,
}

impl RecordingTool {
    pub fn new() -> Self {
        Self::with_log(Arc::new(Mutex::new(Vec::new())))
    }

    pub fn with_log(log: CallLog) -> Self {
        Self {
            log,
            invocations: Arc::new(Mutex::new(Vec::new())),
            fail_on: None,
            filter: SourceFilter::Files,
        }
    }

    pub fn failing_on(mut self, identity: &str) -> Self {
        self.fail_on = Some(identity.to_string());
        self
    }

    pub fn with_filter(mut self, filter: SourceFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn log(&self) -> CallLog {
        Arc::clone(&self.log)
    }

    pub fn calls(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    pub fn invocations(&self) -> Vec<TargetInvocation> {
        self.invocations.lock().unwrap().clone()
    }
}

impl Default for RecordingTool {
    fn default() -> Self {
        Self::new()
    }
}

impl Tool for RecordingTool {
    fn invoke<'a>(&'a self, invocation: &'a TargetInvocation) -> ToolFuture<'a> {
        Box::pin(async move {
            let identity = invocation.identity();
            self.log.lock().unwrap().push(identity.clone());
            self.invocations.lock().unwrap().push(invocation.clone());

            if self.fail_on.as_deref() == Some(identity.as_str()) {
                anyhow::bail!("recording tool configured to fail on {identity}");
            }

            Ok(ToolOutput::produced(invocation.dest.iter().cloned().collect()))
        })
    }

    fn source_filter(&self) -> SourceFilter {
        self.filter
    }
}
