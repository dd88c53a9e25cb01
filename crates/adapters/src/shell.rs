// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Allowlisted shell command execution.

use std::collections::BTreeSet;
use std::process::Stdio;

use async_trait::async_trait;
use mesh_core::TaskInput;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::executor::{ExecutorError, TaskExecutor, TaskOutput};

/// Commands considered safe to run on behalf of a peer.
pub fn default_allowlist() -> BTreeSet<String> {
    ["pwd", "ls", "echo", "uname", "hostname", "date", "whoami", "df", "uptime", "true", "false"]
        .into_iter()
        .map(String::from)
        .collect()
}

/// Runs allowlisted commands directly (no shell interpretation).
pub struct ShellExecutor {
    allowlist: BTreeSet<String>,
}

/// Separated streams for the command-execution RPCs, which report exit
/// codes instead of treating nonzero as failure.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ShellExecutor {
    pub fn new(allowlist: BTreeSet<String>) -> Self {
        Self { allowlist }
    }

    pub fn is_allowed(&self, cmd: &str) -> bool {
        self.allowlist.contains(cmd)
    }

    /// Run an allowlisted command and report its streams and exit code.
    pub async fn run_command(
        &self,
        cmd: &str,
        args: &[String],
    ) -> Result<CommandOutput, ExecutorError> {
        if !self.is_allowed(cmd) {
            return Err(ExecutorError::DisallowedCommand(cmd.to_string()));
        }
        let output = tokio::process::Command::new(cmd)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| ExecutorError::Backend(format!("spawn {cmd}: {e}")))?;
        Ok(CommandOutput {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

impl Default for ShellExecutor {
    fn default() -> Self {
        Self::new(default_allowlist())
    }
}

#[async_trait]
impl TaskExecutor for ShellExecutor {
    async fn execute(
        &self,
        input: &TaskInput,
        cancel: &CancellationToken,
    ) -> Result<TaskOutput, ExecutorError> {
        let (cmd, args) = match input {
            TaskInput::Shell { cmd, args } => (cmd, args),
            other => return Err(ExecutorError::UnsupportedKind(other.kind())),
        };
        if !self.is_allowed(cmd) {
            return Err(ExecutorError::DisallowedCommand(cmd.clone()));
        }

        debug!(%cmd, ?args, "running shell task");
        let mut child = tokio::process::Command::new(cmd)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ExecutorError::Backend(format!("spawn {cmd}: {e}")))?;

        let output = tokio::select! {
            result = child.wait_with_output() => {
                result.map_err(|e| ExecutorError::Backend(format!("wait {cmd}: {e}")))?
            }
            _ = cancel.cancelled() => {
                // kill_on_drop reaps the child
                return Err(ExecutorError::Cancelled);
            }
        };

        let exit_code = output.status.code().unwrap_or(-1);
        let mut bytes = output.stdout;
        if !output.stderr.is_empty() {
            bytes.extend_from_slice(&output.stderr);
        }
        if exit_code != 0 {
            return Err(ExecutorError::Backend(format!(
                "{cmd} exited with code {exit_code}: {}",
                String::from_utf8_lossy(&bytes).trim()
            )));
        }
        Ok(TaskOutput { bytes, exit_code: Some(exit_code) })
    }
}

#[cfg(test)]
#[path = "shell_tests.rs"]
mod tests;
