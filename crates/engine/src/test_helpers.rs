// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixtures for engine tests.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use mesh_adapters::{CaptureParams, EchoExecutor, ExecutorRegistry};
use mesh_core::test_support::device;
use mesh_core::{Capability, Device, Task, TaskKind, TaskResult};
use parking_lot::Mutex;

use crate::peer::{PeerError, PeerRpc};
use crate::registry::DeviceRegistry;

/// Scripted peer: answers `run_task` per device, records capture calls.
#[derive(Default)]
pub struct FakePeer {
    /// Per-device scripted failures; devices not listed succeed.
    pub failures: Mutex<HashMap<String, String>>,
    /// Artificial latency before each response.
    pub delay: Option<Duration>,
    pub run_calls: Mutex<Vec<(String, Task)>>,
    pub offers: Mutex<Vec<(String, String)>>,
    pub answers: Mutex<Vec<(String, String)>>,
    pub stops: Mutex<Vec<(String, String)>>,
    /// When set, capture offers are refused with this code.
    pub refuse_capture: Option<String>,
}

impl FakePeer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_delay(delay: Duration) -> Arc<Self> {
        Arc::new(Self { delay: Some(delay), ..Self::default() })
    }

    pub fn refusing_capture(code: &str) -> Arc<Self> {
        Arc::new(Self { refuse_capture: Some(code.to_string()), ..Self::default() })
    }

    pub fn fail_device(&self, device_id: &str, error: &str) {
        self.failures.lock().insert(device_id.to_string(), error.to_string());
    }
}

#[async_trait]
impl PeerRpc for FakePeer {
    async fn run_task(&self, device: &Device, task: &Task) -> Result<TaskResult, PeerError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.run_calls.lock().push((device.id.to_string(), task.clone()));
        if let Some(error) = self.failures.lock().get(device.id.as_str()) {
            return Err(PeerError::Unreachable(error.clone()));
        }
        let output = match task.input.kind() {
            TaskKind::Echo => match &task.input {
                mesh_core::TaskInput::Echo { text } => format!("{}:{}", device.name, text),
                _ => String::new(),
            },
            kind => format!("{}:{}", device.name, kind),
        };
        Ok(TaskResult {
            output: output.into_bytes(),
            exit_code: Some(0),
            elapsed_ms: 1,
            error: None,
        })
    }

    async fn create_capture_offer(
        &self,
        device: &Device,
        stream_id: &str,
        _params: &CaptureParams,
    ) -> Result<String, PeerError> {
        if let Some(code) = &self.refuse_capture {
            return Err(PeerError::Denied { code: code.clone(), message: "refused".into() });
        }
        self.offers.lock().push((device.id.to_string(), stream_id.to_string()));
        Ok(format!("offer-from-{}", device.name))
    }

    async fn accept_capture_answer(
        &self,
        device: &Device,
        stream_id: &str,
        answer_sdp: &str,
    ) -> Result<(), PeerError> {
        self.answers.lock().push((device.id.to_string(), answer_sdp.to_string()));
        let _ = stream_id;
        Ok(())
    }

    async fn stop_capture(&self, device: &Device, stream_id: &str) -> Result<(), PeerError> {
        self.stops.lock().push((device.id.to_string(), stream_id.to_string()));
        Ok(())
    }
}

/// Registry with a CPU-only self record.
pub fn registry_with_self() -> Arc<DeviceRegistry> {
    Arc::new(DeviceRegistry::new(device("dev-self", &[Capability::Cpu])))
}

/// Local executor registry serving echo tasks.
pub fn echo_executors() -> Arc<ExecutorRegistry> {
    let mut executors = ExecutorRegistry::new();
    executors.register(TaskKind::Echo, Arc::new(EchoExecutor));
    Arc::new(executors)
}
