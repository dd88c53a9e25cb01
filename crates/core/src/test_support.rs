// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for use across crates.
//!
//! Gated behind `#[cfg(any(test, feature = "test-support"))]`.

use crate::device::{Capability, Device, DeviceId};
use crate::plan::{Group, Plan, Task, TaskInput};

// ── Proptest strategies ─────────────────────────────────────────────────

/// Proptest strategies for plan and state-machine types.
pub mod strategies {
    use crate::job::TaskState;
    use crate::plan::TaskInput;
    use proptest::prelude::*;

    pub fn arb_task_input() -> impl Strategy<Value = TaskInput> {
        prop_oneof![
            ("[a-z]{1,8}", proptest::collection::vec("[a-z0-9-]{1,6}", 0..3))
                .prop_map(|(cmd, args)| TaskInput::Shell { cmd, args }),
            Just(TaskInput::Sysinfo),
            "[ -~]{0,24}".prop_map(|text| TaskInput::Echo { text }),
            ("[ -~]{1,24}", proptest::option::of("[a-z0-9]{1,8}"))
                .prop_map(|(prompt, model)| TaskInput::LlmGenerate { prompt, model }),
        ]
    }

    pub fn arb_task_state() -> impl Strategy<Value = TaskState> {
        prop_oneof![
            Just(TaskState::Pending),
            Just(TaskState::Dispatched),
            Just(TaskState::Running),
            Just(TaskState::Succeeded),
            Just(TaskState::Failed),
            Just(TaskState::TimedOut),
            Just(TaskState::Cancelled),
        ]
    }
}

// ── Factory functions ───────────────────────────────────────────────────

pub fn device(id: &str, caps: &[Capability]) -> Device {
    Device::builder()
        .id(DeviceId::from_string(id))
        .name(id.trim_start_matches("dev-"))
        .capabilities(caps.iter().copied().collect())
        .build()
}

pub fn echo_plan(texts: &[&str]) -> Plan {
    Plan::new(vec![Group::new(
        texts.iter().map(|t| Task::new(TaskInput::Echo { text: (*t).into() })).collect(),
    )])
}

pub fn sysinfo_task_for(target: &str) -> Task {
    Task::new(TaskInput::Sysinfo).with_target(DeviceId::from_string(target))
}
