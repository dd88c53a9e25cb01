// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Device identity: the one piece of durable state.
//!
//! A node's `DeviceId` lives in a single file under the data directory so
//! the same machine keeps its identity across restarts. Everything else
//! is in-memory by design.

use std::path::{Path, PathBuf};

use mesh_adapters::{sample_host, ExecutorRegistry};
use mesh_core::{Capability, Device, DeviceId, TaskKind};
use tracing::info;

use crate::lifecycle::LifecycleError;

const DEVICE_ID_FILE: &str = "device_id";

/// Load the persisted device ID, creating it on first boot.
/// The `DEVICE_ID` env override wins and is not persisted.
pub fn load_or_create_device_id(data_dir: &Path) -> Result<DeviceId, LifecycleError> {
    if let Some(id) = crate::env::device_id_override() {
        info!(device_id = %id, "device id from environment");
        return Ok(DeviceId::from_string(id));
    }

    let path = device_id_path(data_dir);
    match std::fs::read_to_string(&path) {
        Ok(contents) => {
            let id = contents.trim();
            if id.is_empty() {
                return create_device_id(&path);
            }
            Ok(DeviceId::from_string(id))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => create_device_id(&path),
        Err(e) => Err(LifecycleError::Identity(path, e)),
    }
}

pub fn device_id_path(data_dir: &Path) -> PathBuf {
    data_dir.join(DEVICE_ID_FILE)
}

fn create_device_id(path: &Path) -> Result<DeviceId, LifecycleError> {
    let id = DeviceId::generate();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| LifecycleError::Identity(parent.to_path_buf(), e))?;
    }
    std::fs::write(path, format!("{id}\n"))
        .map_err(|e| LifecycleError::Identity(path.to_path_buf(), e))?;
    info!(device_id = %id, "generated new device id");
    Ok(id)
}

/// Assemble this node's own registry record.
///
/// CPU is always advertised. `local_llm` and `screen_capture` follow the
/// registered backends; accelerators come from `EXTRA_CAPABILITIES`.
#[allow(clippy::too_many_arguments)]
pub fn build_self_device(
    id: DeviceId,
    grpc_addr: &str,
    http_addr: &str,
    executors: &ExecutorRegistry,
    has_capture: bool,
    extra: &[String],
    local_model_name: Option<String>,
    now_ms: u64,
) -> Device {
    let sample = sample_host();
    let mut capabilities = std::collections::BTreeSet::from([Capability::Cpu]);
    if executors.supports(TaskKind::LlmGenerate) {
        capabilities.insert(Capability::LocalLlm);
    }
    if has_capture {
        capabilities.insert(Capability::ScreenCapture);
    }
    for cap in extra {
        match cap.as_str() {
            "gpu" => {
                capabilities.insert(Capability::Gpu);
            }
            "npu" => {
                capabilities.insert(Capability::Npu);
            }
            other => tracing::warn!(capability = other, "ignoring unknown extra capability"),
        }
    }

    Device {
        id,
        name: sample.hostname,
        platform: sample.platform,
        arch: sample.arch,
        grpc_addr: grpc_addr.to_string(),
        http_addr: Some(http_addr.to_string()),
        capabilities,
        local_model_name,
        last_seen_ms: now_ms,
    }
}

#[cfg(test)]
#[path = "identity_tests.rs"]
mod tests;
