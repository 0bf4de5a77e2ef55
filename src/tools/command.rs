// src/tools/command.rs

//! Shell command tool configured under `[tools.<kind>]`.

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, info};

use crate::config::model::ToolSpec;
use crate::config::node::ConfigNode;
use crate::fs::FileSystem;
use crate::registry::TargetInvocation;
use crate::types::SourceFilter;

use super::{Tool, ToolFuture, ToolOutput};

/// Number of stderr lines kept in a failure message.
const STDERR_TAIL: usize = 10;

/// Runs `cmd` through the platform shell once per invocation.
///
/// Tokens `[src]`, `[dest]`, `[task]` and `[target]` are substituted before
/// the command runs; the same values are exported as `PIPEWRIGHT_*`
/// environment variables.
#[derive(Debug, Clone)]
pub struct CommandTool {
    spec: ToolSpec,
    root: PathBuf,
    fs: Arc<dyn FileSystem>,
}

impl CommandTool {
    pub fn new(spec: ToolSpec, root: PathBuf, fs: Arc<dyn FileSystem>) -> Self {
        Self { spec, root, fs }
    }

    /// The command line for one invocation, after token substitution.
    pub fn render_command(&self, inv: &TargetInvocation) -> String {
        let src = inv
            .src
            .iter()
            .map(|p| shell_quote(&p.to_string_lossy()))
            .collect::<Vec<_>>()
            .join(" ");
        let dest = inv
            .dest
            .as_ref()
            .map(|p| shell_quote(&p.to_string_lossy()))
            .unwrap_or_default();

        self.spec
            .cmd
            .replace("[src]", &src)
            .replace("[dest]", &dest)
            .replace("[task]", &inv.task)
            .replace("[target]", &inv.target)
    }

    async fn run(&self, inv: &TargetInvocation) -> Result<ToolOutput> {
        let line = self.render_command(inv);
        info!(identity = %inv.identity(), tool = %self.spec.kind, cmd = %line, "starting tool process");

        let mut cmd = if cfg!(windows) {
            let mut c = Command::new("cmd");
            c.arg("/C").arg(&line);
            c
        } else {
            let mut c = Command::new("sh");
            c.arg("-c").arg(&line);
            c
        };

        cmd.current_dir(&self.root)
            .envs(invocation_env(inv))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd
            .spawn()
            .with_context(|| format!("spawning process for {}", inv.identity()))?;

        // Drain both pipes so the child never blocks on a full buffer.
        let stdout_task = child.stdout.take().map(|stdout| {
            let identity = inv.identity();
            tokio::spawn(async move {
                let mut lines = BufReader::new(stdout).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    debug!(identity = %identity, "stdout: {}", line);
                }
            })
        });
        let stderr_task = child.stderr.take().map(|stderr| {
            let identity = inv.identity();
            tokio::spawn(async move {
                let mut collected = Vec::new();
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    debug!(identity = %identity, "stderr: {}", line);
                    collected.push(line);
                }
                collected
            })
        });

        let status = child
            .wait()
            .await
            .with_context(|| format!("waiting for process of {}", inv.identity()))?;

        if let Some(task) = stdout_task {
            let _ = task.await;
        }
        let stderr_lines = match stderr_task {
            Some(task) => task.await.unwrap_or_default(),
            None => Vec::new(),
        };

        let code = status.code().unwrap_or(-1);
        info!(
            identity = %inv.identity(),
            exit_code = code,
            success = status.success(),
            "tool process exited"
        );

        if !status.success() {
            let start = stderr_lines.len().saturating_sub(STDERR_TAIL);
            let tail = stderr_lines[start..].join("\n");
            if tail.is_empty() {
                bail!("`{line}` exited with code {code}");
            }
            bail!("`{line}` exited with code {code}:\n{tail}");
        }

        let produced = inv
            .dest
            .iter()
            .filter(|p| self.fs.exists(&self.root.join(p)) || self.fs.exists(p))
            .cloned()
            .collect();

        Ok(ToolOutput {
            produced,
            warnings: stderr_lines
                .into_iter()
                .filter(|l| !l.trim().is_empty())
                .collect(),
        })
    }
}

impl Tool for CommandTool {
    fn invoke<'a>(&'a self, inv: &'a TargetInvocation) -> ToolFuture<'a> {
        Box::pin(self.run(inv))
    }

    fn source_filter(&self) -> SourceFilter {
        self.spec.filter.unwrap_or_default()
    }
}

/// Environment exported to the child process.
pub fn invocation_env(inv: &TargetInvocation) -> Vec<(String, String)> {
    let mut env = vec![
        ("PIPEWRIGHT_TASK".to_string(), inv.task.clone()),
        ("PIPEWRIGHT_TARGET".to_string(), inv.target.clone()),
        ("PIPEWRIGHT_SRC".to_string(), join_paths(&inv.src)),
        (
            "PIPEWRIGHT_DEST".to_string(),
            inv.dest
                .as_ref()
                .map(|p| p.to_string_lossy().into_owned())
                .unwrap_or_default(),
        ),
    ];

    for (key, value) in &inv.options {
        let rendered = match value {
            ConfigNode::Scalar(s) => s.to_string(),
            ConfigNode::Sequence(_) => match value.render_inline() {
                Some(s) => s,
                None => continue,
            },
            _ => continue,
        };
        env.push((format!("PIPEWRIGHT_OPT_{}", env_key(key)), rendered));
    }

    env
}

fn join_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("\n")
}

fn env_key(key: &str) -> String {
    key.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect()
}

/// Quote a path for the platform shell.
pub fn shell_quote(s: &str) -> String {
    if cfg!(windows) {
        return format!("\"{}\"", s.replace('"', "\\\""));
    }

    let safe = !s.is_empty()
        && s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "/._-+=:@%,".contains(c));
    if safe {
        s.to_string()
    } else {
        format!("'{}'", s.replace('\'', r"'\''"))
    }
}
