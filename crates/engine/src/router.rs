// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Policy-driven device selection.
//!
//! Routing is a pure function of (policy, registry snapshot, self id), so
//! the same inputs always pick the same device.

use mesh_core::{Capability, Device, DeviceId, Policy};
use thiserror::Error;

/// Errors from routing.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RouteError {
    #[error("no device satisfies the policy")]
    NoEligibleDevice,

    #[error("unknown device: {0}")]
    UnknownDevice(DeviceId),
}

/// Rank for BEST_AVAILABLE ordering: NPU > GPU > CPU.
fn class_rank(device: &Device) -> u8 {
    if device.has_capability(Capability::Npu) {
        2
    } else if device.has_capability(Capability::Gpu) {
        1
    } else {
        0
    }
}

/// Pick the best candidate: class rank, then most-recent sighting, then
/// device id as the final deterministic tiebreak.
fn best_of(candidates: &[Device]) -> Option<DeviceId> {
    candidates
        .iter()
        .max_by(|a, b| {
            class_rank(a)
                .cmp(&class_rank(b))
                .then(a.last_seen_ms.cmp(&b.last_seen_ms))
                .then(b.id.cmp(&a.id))
        })
        .map(|d| d.id)
}

/// Select a target device for the given policy.
pub fn route(
    policy: &Policy,
    snapshot: &[Device],
    self_id: &DeviceId,
) -> Result<DeviceId, RouteError> {
    match policy {
        Policy::BestAvailable => Ok(best_of(snapshot).unwrap_or(*self_id)),
        Policy::PreferRemote => {
            let remote: Vec<Device> =
                snapshot.iter().filter(|d| d.id != *self_id).cloned().collect();
            Ok(best_of(&remote).unwrap_or(*self_id))
        }
        Policy::RequireNpu => {
            let npu: Vec<Device> = snapshot
                .iter()
                .filter(|d| d.has_capability(Capability::Npu))
                .cloned()
                .collect();
            best_of(&npu).ok_or(RouteError::NoEligibleDevice)
        }
        Policy::ForceDevice { device_id } => snapshot
            .iter()
            .find(|d| d.id == *device_id)
            .map(|d| d.id)
            .ok_or(RouteError::UnknownDevice(*device_id)),
    }
}

/// Route among capture-capable devices only.
///
/// Forced targets are looked up first, then checked for the capability, so
/// "that device cannot capture" is distinguishable from "unknown device".
pub fn route_for_capture(
    policy: &Policy,
    snapshot: &[Device],
    self_id: &DeviceId,
) -> Result<DeviceId, RouteError> {
    if let Policy::ForceDevice { .. } = policy {
        return route(policy, snapshot, self_id);
    }
    let capable: Vec<Device> = snapshot
        .iter()
        .filter(|d| d.has_capability(Capability::ScreenCapture))
        .cloned()
        .collect();
    if capable.is_empty() {
        return Err(RouteError::NoEligibleDevice);
    }
    route(policy, &capable, self_id)
}

#[cfg(test)]
#[path = "router_tests.rs"]
mod tests;
