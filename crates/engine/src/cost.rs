// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Table-driven plan cost estimation.
//!
//! Predicts latency and memory per device and recommends the cheapest.
//! Informational only: the router makes the binding placement decision.

use mesh_core::device::DeviceClass;
use mesh_core::{CostReport, Device, DeviceCost, Plan, TaskKind};

/// Expected milliseconds per (kind, device class) plus expected MB.
///
/// Generation kinds are strictly cheaper on better accelerators so an NPU
/// node always wins when one is visible.
const fn kind_cost(kind: TaskKind) -> (u64, u64, u64, u64) {
    // (cpu_ms, gpu_ms, npu_ms, mb)
    match kind {
        TaskKind::Shell => (50, 50, 50, 10),
        TaskKind::Sysinfo => (20, 20, 20, 5),
        TaskKind::Echo => (1, 1, 1, 1),
        TaskKind::LlmGenerate => (12_000, 4_000, 1_500, 2_048),
        TaskKind::ImageGenerate => (30_000, 8_000, 2_500, 3_072),
    }
}

fn predicted_ms(kind: TaskKind, class: DeviceClass) -> u64 {
    let (cpu, gpu, npu, _) = kind_cost(kind);
    match class {
        DeviceClass::Cpu => cpu,
        DeviceClass::Gpu => gpu,
        DeviceClass::Npu => npu,
    }
}

fn predicted_mb(kind: TaskKind) -> u64 {
    kind_cost(kind).3
}

/// Price a plan against a registry snapshot.
pub fn estimate_plan(plan: &Plan, snapshot: &[Device]) -> CostReport {
    let mut device_costs: Vec<DeviceCost> = snapshot
        .iter()
        .map(|device| {
            let class = device.class();
            let (ms, mb) = plan.tasks().fold((0u64, 0u64), |(ms, mb), task| {
                let kind = task.input.kind();
                (ms + predicted_ms(kind, class), mb.max(predicted_mb(kind)))
            });
            DeviceCost {
                device_id: device.id,
                device_name: device.name.clone(),
                predicted_ms: ms,
                predicted_mb: mb,
            }
        })
        .collect();

    // Deterministic report order: cheapest first, then by id.
    device_costs.sort_by(|a, b| {
        a.predicted_ms.cmp(&b.predicted_ms).then(a.device_id.cmp(&b.device_id))
    });

    let recommended_device_id = device_costs.first().map(|c| c.device_id);
    let total_predicted_ms = device_costs.first().map(|c| c.predicted_ms).unwrap_or(0);

    CostReport { total_predicted_ms, device_costs, recommended_device_id }
}

#[cfg(test)]
#[path = "cost_tests.rs"]
mod tests;
