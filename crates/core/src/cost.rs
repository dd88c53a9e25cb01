// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cost-report types produced by the plan cost estimator.

use crate::device::DeviceId;
use serde::{Deserialize, Serialize};

/// Predicted cost of running a whole plan on one device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceCost {
    pub device_id: DeviceId,
    pub device_name: String,
    pub predicted_ms: u64,
    pub predicted_mb: u64,
}

/// Per-device roll-ups plus the estimator's recommendation.
///
/// Informational only; the router makes the binding placement decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct CostReport {
    pub total_predicted_ms: u64,
    pub device_costs: Vec<DeviceCost>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommended_device_id: Option<DeviceId>,
}
