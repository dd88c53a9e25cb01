// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Peer device records and capability metadata.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use strum::Display;

use crate::id::{Id, IdKind};

/// Tag for device ids.
pub enum DeviceIdKind {}

impl IdKind for DeviceIdKind {
    const PREFIX: &'static str = "dev-";
}

/// Stable identifier for a physical node.
///
/// Generated once per node and persisted to a well-known file, so the
/// same machine keeps the same identity across restarts.
pub type DeviceId = Id<DeviceIdKind>;

/// A boolean-valued compute capability a device can advertise.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Capability {
    Cpu,
    Gpu,
    Npu,
    LocalLlm,
    ScreenCapture,
}

/// Compute class of a device, derived from its capability set.
///
/// Used by the cost model: NPU beats GPU beats CPU.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DeviceClass {
    Cpu,
    Gpu,
    Npu,
}

/// A peer record as held in the device registry.
///
/// Registry reads hand out value copies of this struct; only the registry
/// itself mutates stored records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub id: DeviceId,
    /// Human-readable node name (hostname by default)
    pub name: String,
    pub platform: String,
    pub arch: String,
    /// RPC plane address (host:port)
    pub grpc_addr: String,
    /// Bulk-transfer side channel address, if the node serves one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_addr: Option<String>,
    pub capabilities: BTreeSet<Capability>,
    /// Model served by the node's local LLM runtime, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_model_name: Option<String>,
    /// Epoch ms of the most recent sighting. Monotonically non-decreasing.
    pub last_seen_ms: u64,
}

impl Device {
    pub fn has_capability(&self, cap: Capability) -> bool {
        self.capabilities.contains(&cap)
    }

    /// Compute class for cost estimation: best accelerator wins.
    pub fn class(&self) -> DeviceClass {
        if self.has_capability(Capability::Npu) {
            DeviceClass::Npu
        } else if self.has_capability(Capability::Gpu) {
            DeviceClass::Gpu
        } else {
            DeviceClass::Cpu
        }
    }

    /// Refresh the sighting timestamp, keeping it monotonic.
    pub fn refresh(&mut self, now_ms: u64) {
        if now_ms > self.last_seen_ms {
            self.last_seen_ms = now_ms;
        }
    }

    /// Start a test record with sensible defaults.
    #[cfg(any(test, feature = "test-support"))]
    pub fn builder() -> DeviceBuilder {
        DeviceBuilder::default()
    }
}

/// Test builder for [`Device`]: only the fields tests actually vary get
/// setters, everything else is a fixed default.
#[cfg(any(test, feature = "test-support"))]
pub struct DeviceBuilder {
    device: Device,
}

#[cfg(any(test, feature = "test-support"))]
impl Default for DeviceBuilder {
    fn default() -> Self {
        Self {
            device: Device {
                id: DeviceId::from_string("dev-test"),
                name: "test-node".to_string(),
                platform: "linux".to_string(),
                arch: "x86_64".to_string(),
                grpc_addr: "127.0.0.1:50051".to_string(),
                http_addr: None,
                capabilities: [Capability::Cpu].into_iter().collect(),
                local_model_name: None,
                last_seen_ms: 1_000_000,
            },
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
impl DeviceBuilder {
    pub fn id(mut self, id: DeviceId) -> Self {
        self.device.id = id;
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.device.name = name.into();
        self
    }

    pub fn capabilities(mut self, capabilities: BTreeSet<Capability>) -> Self {
        self.device.capabilities = capabilities;
        self
    }

    pub fn last_seen_ms(mut self, last_seen_ms: u64) -> Self {
        self.device.last_seen_ms = last_seen_ms;
        self
    }

    pub fn http_addr(mut self, addr: impl Into<String>) -> Self {
        self.device.http_addr = Some(addr.into());
        self
    }

    pub fn local_model_name(mut self, model: impl Into<String>) -> Self {
        self.device.local_model_name = Some(model.into());
        self
    }

    pub fn build(self) -> Device {
        self.device
    }
}

#[cfg(test)]
#[path = "device_tests.rs"]
mod tests;
