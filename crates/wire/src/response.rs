// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use mesh_core::job::base64_bytes;
use mesh_core::{CostReport, Device, DeviceId, Job, JobId, Plan, TaskId};
use serde::{Deserialize, Serialize};

use crate::error_code::ErrorCode;

/// Response from a mesh node.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum Response {
    /// Generic success for operations with no payload
    Ok,

    /// Structured failure
    Error {
        code: ErrorCode,
        message: String,
    },

    // ── Session ─────────────────────────────────────────────────────────
    SessionCreated {
        session_id: String,
    },

    HeartbeatAck {
        alive: bool,
    },

    Health {
        device_id: DeviceId,
        server_time_ms: u64,
        message: String,
    },

    // ── Registry ────────────────────────────────────────────────────────
    Registered {
        registered_at_ms: u64,
    },

    Devices {
        devices: Vec<Device>,
    },

    DeviceStatus {
        device_id: DeviceId,
        last_seen_ms: u64,
        cpu_load: f64,
        mem_used_mb: u64,
        mem_total_mb: u64,
    },

    // ── Execution ───────────────────────────────────────────────────────
    CommandOutput {
        exit_code: i32,
        stdout: String,
        stderr: String,
        time_ms: u64,
    },

    RoutedCommand {
        selected_device_id: DeviceId,
        selected_device_name: String,
        executed_locally: bool,
        total_time_ms: u64,
        exit_code: i32,
        stdout: String,
        stderr: String,
    },

    TaskDone {
        task_id: TaskId,
        ok: bool,
        #[serde(with = "base64_bytes")]
        output: Vec<u8>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
        time_ms: u64,
    },

    // ── Jobs ────────────────────────────────────────────────────────────
    JobSubmitted {
        job_id: JobId,
        plan: Plan,
        used_ai: bool,
    },

    Job {
        job: Job,
    },

    Plan {
        plan: Plan,
    },

    PlanCost {
        cost: CostReport,
    },

    // ── Media ───────────────────────────────────────────────────────────
    MediaStarted {
        stream_id: String,
        offer_sdp: String,
        producer_device_id: DeviceId,
    },

    CaptureOffer {
        stream_id: String,
        offer_sdp: String,
    },

    // ── Transfer ────────────────────────────────────────────────────────
    Ticket {
        token: String,
        expires_ms: u64,
        http_url: String,
    },

    FileData {
        #[serde(with = "base64_bytes")]
        data: Vec<u8>,
    },
}

impl Response {
    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        Response::Error { code, message: message.into() }
    }
}

#[cfg(test)]
#[path = "response_tests.rs"]
mod tests;
