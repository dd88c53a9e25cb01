// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use async_trait::async_trait;
use mesh_core::TaskInput;
use tokio_util::sync::CancellationToken;

use crate::executor::{ExecutorError, TaskExecutor, TaskOutput};

/// Returns its input unchanged. Exists for plumbing tests and demos.
#[derive(Default)]
pub struct EchoExecutor;

#[async_trait]
impl TaskExecutor for EchoExecutor {
    async fn execute(
        &self,
        input: &TaskInput,
        _cancel: &CancellationToken,
    ) -> Result<TaskOutput, ExecutorError> {
        match input {
            TaskInput::Echo { text } => Ok(TaskOutput::text(text.clone())),
            other => Err(ExecutorError::UnsupportedKind(other.kind())),
        }
    }
}
