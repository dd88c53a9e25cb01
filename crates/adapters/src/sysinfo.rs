// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Best-effort host metric sampling.
//!
//! Real deployments swap in a platform backend; this sampler reads /proc
//! on Linux and degrades to zeros elsewhere.

use async_trait::async_trait;
use mesh_core::TaskInput;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::executor::{ExecutorError, TaskExecutor, TaskOutput};

/// One sample of host state, also served by `GetDeviceStatus`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct HostSample {
    pub hostname: String,
    pub platform: String,
    pub arch: String,
    pub cpus: usize,
    pub cpu_load: f64,
    pub mem_used_mb: u64,
    pub mem_total_mb: u64,
}

/// Sample the local host.
pub fn sample_host() -> HostSample {
    let (mem_used_mb, mem_total_mb) = read_meminfo().unwrap_or((0, 0));
    HostSample {
        hostname: read_hostname(),
        platform: std::env::consts::OS.to_string(),
        arch: std::env::consts::ARCH.to_string(),
        cpus: std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1),
        cpu_load: read_loadavg().unwrap_or(0.0),
        mem_used_mb,
        mem_total_mb,
    }
}

fn read_hostname() -> String {
    std::fs::read_to_string("/etc/hostname")
        .map(|s| s.trim().to_string())
        .ok()
        .filter(|s| !s.is_empty())
        .or_else(|| std::env::var("HOSTNAME").ok())
        .unwrap_or_else(|| "unknown".to_string())
}

fn read_loadavg() -> Option<f64> {
    let text = std::fs::read_to_string("/proc/loadavg").ok()?;
    text.split_whitespace().next()?.parse().ok()
}

fn read_meminfo() -> Option<(u64, u64)> {
    let text = std::fs::read_to_string("/proc/meminfo").ok()?;
    let mut total_kb = None;
    let mut available_kb = None;
    for line in text.lines() {
        if let Some(rest) = line.strip_prefix("MemTotal:") {
            total_kb = rest.trim().split_whitespace().next()?.parse::<u64>().ok();
        } else if let Some(rest) = line.strip_prefix("MemAvailable:") {
            available_kb = rest.trim().split_whitespace().next()?.parse::<u64>().ok();
        }
    }
    let total = total_kb?;
    let available = available_kb.unwrap_or(0);
    Some(((total.saturating_sub(available)) / 1024, total / 1024))
}

/// Serves SYSINFO tasks with a JSON-encoded [`HostSample`].
#[derive(Default)]
pub struct SysinfoExecutor;

#[async_trait]
impl TaskExecutor for SysinfoExecutor {
    async fn execute(
        &self,
        input: &TaskInput,
        _cancel: &CancellationToken,
    ) -> Result<TaskOutput, ExecutorError> {
        if !matches!(input, TaskInput::Sysinfo) {
            return Err(ExecutorError::UnsupportedKind(input.kind()));
        }
        let sample = sample_host();
        let bytes = serde_json::to_vec(&sample)
            .map_err(|e| ExecutorError::Backend(format!("encode sample: {e}")))?;
        Ok(TaskOutput { bytes, exit_code: None })
    }
}

#[cfg(test)]
#[path = "sysinfo_tests.rs"]
mod tests;
