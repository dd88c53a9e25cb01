// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Plans: ordered groups of heterogeneous tasks.
//!
//! A plan is the structured decomposition of a request. Groups execute
//! sequentially; the tasks inside a group execute in parallel.

use crate::device::DeviceId;
use crate::id::{Id, IdKind};
use crate::policy::Policy;
use serde::{Deserialize, Serialize};
use strum::Display;

/// Tag for task ids.
pub enum TaskIdKind {}

impl IdKind for TaskIdKind {
    const PREFIX: &'static str = "tsk-";
}

/// Identifier for a task, unique within its job.
pub type TaskId = Id<TaskIdKind>;

/// Discriminant of a task payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TaskKind {
    Shell,
    Sysinfo,
    Echo,
    LlmGenerate,
    ImageGenerate,
}

/// Kind-specific task payload.
///
/// A closed tagged variant: executors dispatch on the discriminant and
/// receive exactly the fields their kind defines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TaskInput {
    Shell {
        cmd: String,
        #[serde(default)]
        args: Vec<String>,
    },
    Sysinfo,
    Echo {
        text: String,
    },
    LlmGenerate {
        prompt: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        model: Option<String>,
    },
    ImageGenerate {
        prompt: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        width: Option<u32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        height: Option<u32>,
    },
}

impl TaskInput {
    pub fn kind(&self) -> TaskKind {
        match self {
            TaskInput::Shell { .. } => TaskKind::Shell,
            TaskInput::Sysinfo => TaskKind::Sysinfo,
            TaskInput::Echo { .. } => TaskKind::Echo,
            TaskInput::LlmGenerate { .. } => TaskKind::LlmGenerate,
            TaskInput::ImageGenerate { .. } => TaskKind::ImageGenerate,
        }
    }
}

/// A single unit of work within a group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    #[serde(flatten)]
    pub input: TaskInput,
    /// Set by the router; unset tasks are resolved at dispatch time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_device_id: Option<DeviceId>,
    /// Routing policy used when no target is assigned.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy: Option<Policy>,
    /// Per-task deadline. `None` or `0` means the group default applies.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

impl Task {
    pub fn new(input: TaskInput) -> Self {
        Self {
            id: TaskId::generate(),
            input,
            target_device_id: None,
            policy: None,
            timeout_ms: None,
        }
    }

    pub fn with_target(mut self, target: DeviceId) -> Self {
        self.target_device_id = Some(target);
        self
    }

    pub fn with_policy(mut self, policy: Policy) -> Self {
        self.policy = Some(policy);
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }

    /// Deadline for dispatch: the tighter of the task's own timeout and the
    /// group default. A timeout of zero counts as unset.
    pub fn effective_timeout_ms(&self, group_default_ms: u64) -> u64 {
        match self.timeout_ms {
            Some(ms) if ms > 0 => ms.min(group_default_ms),
            _ => group_default_ms,
        }
    }
}

/// An unordered set of tasks dispatched in parallel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Group {
    pub tasks: Vec<Task>,
}

impl Group {
    pub fn new(tasks: Vec<Task>) -> Self {
        Self { tasks }
    }
}

/// Result-reduction operation applied when all groups complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ReduceOp {
    /// Concatenate textual outputs in task-index order, newline separated.
    #[default]
    Concat,
}

/// Ordered sequence of groups plus planning metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    pub groups: Vec<Group>,
    /// True when an external AI planner produced this plan.
    #[serde(default)]
    pub used_ai: bool,
    /// Free-form explanation of how the plan was chosen.
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub reduce: ReduceOp,
}

impl Plan {
    pub fn new(groups: Vec<Group>) -> Self {
        Self { groups, used_ai: false, notes: String::new(), reduce: ReduceOp::Concat }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }

    pub fn task_count(&self) -> usize {
        self.groups.iter().map(|g| g.tasks.len()).sum()
    }

    /// Iterate tasks in plan order: by group index, then task index.
    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.groups.iter().flat_map(|g| g.tasks.iter())
    }
}

#[cfg(test)]
#[path = "plan_tests.rs"]
mod tests;
