// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job identifier and the two-level job state machine.
//!
//! A job is a plan plus runtime state: groups advance sequentially, tasks
//! within a group settle in parallel. All states here are data; the engine
//! drives the transitions.

use crate::id::{Id, IdKind};
use crate::plan::{Plan, Task};
use serde::{Deserialize, Serialize};
use strum::Display;

/// Tag for job ids.
pub enum JobIdKind {}

impl IdKind for JobIdKind {
    const PREFIX: &'static str = "job-";
}

/// Unique identifier for a submitted job.
pub type JobId = Id<JobIdKind>;

/// Top-level job state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum JobState {
    Queued,
    Running,
    Done,
    Failed,
    Cancelled,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Done | JobState::Failed | JobState::Cancelled)
    }
}

/// Per-group sub-state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum GroupState {
    Pending,
    Running,
    Succeeded,
    Failed,
    /// Never dispatched because an earlier group failed or the job was cancelled.
    Cancelled,
}

/// Per-task sub-state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TaskState {
    Pending,
    Dispatched,
    Running,
    Succeeded,
    Failed,
    TimedOut,
    Cancelled,
}

impl TaskState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskState::Succeeded | TaskState::Failed | TaskState::TimedOut | TaskState::Cancelled
        )
    }
}

/// Serialize task output bytes as base64 so snapshots stay JSON-friendly.
pub mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn encode(data: &[u8]) -> String {
        STANDARD.encode(data)
    }

    pub fn serialize<S: Serializer>(data: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(data))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        STANDARD.decode(s.as_bytes()).map_err(serde::de::Error::custom)
    }
}

/// Outcome of a single task execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct TaskResult {
    #[serde(with = "base64_bytes")]
    pub output: Vec<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    pub elapsed_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TaskResult {
    /// Task output as text: UTF-8 when valid, base64 otherwise.
    pub fn output_text(&self) -> String {
        match std::str::from_utf8(&self.output) {
            Ok(s) => s.to_string(),
            Err(_) => base64_bytes::encode(&self.output),
        }
    }
}

/// Runtime view of one task within a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSnapshot {
    pub task: Task,
    pub state: TaskState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<TaskResult>,
}

impl TaskSnapshot {
    pub fn new(task: Task) -> Self {
        Self { task, state: TaskState::Pending, started_ms: None, finished_ms: None, result: None }
    }
}

/// Runtime view of one group within a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupSnapshot {
    pub state: GroupState,
    pub tasks: Vec<TaskSnapshot>,
}

/// A submitted job: plan plus runtime state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub created_ms: u64,
    pub plan: Plan,
    pub state: JobState,
    pub groups: Vec<GroupSnapshot>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_result: Option<String>,
}

impl Job {
    /// Allocate a queued job from a plan. Group and task snapshots start Pending.
    pub fn new(id: JobId, plan: Plan, created_ms: u64) -> Self {
        let groups = plan
            .groups
            .iter()
            .map(|g| GroupSnapshot {
                state: GroupState::Pending,
                tasks: g.tasks.iter().cloned().map(TaskSnapshot::new).collect(),
            })
            .collect();
        Self { id, created_ms, plan, state: JobState::Queued, groups, final_result: None }
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// All task snapshots in plan order.
    pub fn task_snapshots(&self) -> impl Iterator<Item = &TaskSnapshot> {
        self.groups.iter().flat_map(|g| g.tasks.iter())
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
