// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The task-executor seam and the runtime capability registry.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use mesh_core::{TaskInput, TaskKind};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Errors from task execution.
#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("command not in allowlist: {0}")]
    DisallowedCommand(String),

    #[error("no executor registered for kind: {0}")]
    UnsupportedKind(TaskKind),

    #[error("cancelled")]
    Cancelled,

    #[error("backend error: {0}")]
    Backend(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Raw outcome of one execution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskOutput {
    pub bytes: Vec<u8>,
    pub exit_code: Option<i32>,
}

impl TaskOutput {
    pub fn text(s: impl Into<String>) -> Self {
        Self { bytes: s.into().into_bytes(), exit_code: None }
    }
}

/// A backend that can execute one kind of task.
///
/// Implementations must honor `cancel`: when the token fires the executor
/// should abort promptly, but the engine times the task out either way.
#[async_trait]
pub trait TaskExecutor: Send + Sync {
    async fn execute(
        &self,
        input: &TaskInput,
        cancel: &CancellationToken,
    ) -> Result<TaskOutput, ExecutorError>;
}

/// Runtime capability registry: kind → executor.
///
/// Each host registers the executors its platform and configuration can
/// provide at startup. Kinds with no entry fail with `UnsupportedKind`,
/// which doubles as the capability probe for discovery announcements.
#[derive(Default, Clone)]
pub struct ExecutorRegistry {
    executors: HashMap<TaskKind, Arc<dyn TaskExecutor>>,
}

impl ExecutorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, kind: TaskKind, executor: Arc<dyn TaskExecutor>) {
        self.executors.insert(kind, executor);
    }

    pub fn supports(&self, kind: TaskKind) -> bool {
        self.executors.contains_key(&kind)
    }

    pub fn registered_kinds(&self) -> Vec<TaskKind> {
        self.executors.keys().copied().collect()
    }

    /// Dispatch to the registered executor for the input's kind.
    pub async fn execute(
        &self,
        input: &TaskInput,
        cancel: &CancellationToken,
    ) -> Result<TaskOutput, ExecutorError> {
        let kind = input.kind();
        let executor = self
            .executors
            .get(&kind)
            .ok_or(ExecutorError::UnsupportedKind(kind))?;
        executor.execute(input, cancel).await
    }
}

impl std::fmt::Debug for ExecutorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutorRegistry")
            .field("kinds", &self.registered_kinds())
            .finish()
    }
}

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;
