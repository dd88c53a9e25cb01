// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Routing policies.

use crate::device::DeviceId;
use serde::{Deserialize, Serialize};
use strum::Display;

/// Rule set used by the router to pick a target device for a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(tag = "policy", rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Policy {
    /// Prefer NPU > GPU > CPU, ties broken by most-recent sighting.
    /// Falls back to the local device when the registry is empty.
    BestAvailable,
    /// Like BestAvailable but excludes the local device unless it is
    /// the only one alive.
    PreferRemote,
    /// Any device advertising an NPU; fails when none exists.
    RequireNpu,
    /// Exactly the named device; fails when it is not registered.
    ForceDevice { device_id: DeviceId },
}

impl Default for Policy {
    fn default() -> Self {
        Policy::BestAvailable
    }
}

#[cfg(test)]
#[path = "policy_tests.rs"]
mod tests;
