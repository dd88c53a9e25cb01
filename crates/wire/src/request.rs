// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use mesh_core::{Device, DeviceId, JobId, Plan, Policy, Task};
use serde::{Deserialize, Serialize};

/// One request frame: the shared auth secret plus the operation.
///
/// The secret rides on every call, not just a handshake, so any node can
/// serve any peer without connection state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Envelope {
    #[serde(default)]
    pub token: String,
    pub request: Request,
}

impl Envelope {
    pub fn new(token: impl Into<String>, request: Request) -> Self {
        Self { token: token.into(), request }
    }
}

/// Windowing mode for `ReadFile`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadMode {
    Full,
    Head,
    Tail,
    Range,
}

/// Request from a client or peer to a mesh node.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum Request {
    // ── Session ─────────────────────────────────────────────────────────
    /// Open a client session
    CreateSession,

    /// Refresh a client session
    Heartbeat { session_id: String },

    /// Liveness probe
    HealthCheck,

    // ── Registry ────────────────────────────────────────────────────────
    /// Insert or refresh a device record
    RegisterDevice { device: Device },

    /// Snapshot of all known devices
    ListDevices,

    /// Liveness and load metrics for one device
    GetDeviceStatus { device_id: DeviceId },

    // ── Execution ───────────────────────────────────────────────────────
    /// Run an allowlisted command locally on the receiving node
    ExecuteCommand {
        cmd: String,
        #[serde(default)]
        args: Vec<String>,
    },

    /// Route an allowlisted command by policy, then run it on the target
    ExecuteRoutedCommand {
        cmd: String,
        #[serde(default)]
        args: Vec<String>,
        policy: Policy,
    },

    /// Worker-side primitive: execute one task on the receiving node.
    /// Invoked by the job engine; enforces the shell allowlist.
    RunTask { task: Task },

    // ── Jobs ────────────────────────────────────────────────────────────
    /// Submit a job from free text or a structured plan
    SubmitJob {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        text: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        plan: Option<Plan>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_workers: Option<usize>,
    },

    /// Snapshot of a job's state and results
    GetJob { job_id: JobId },

    /// Cancel a job; in-flight dispatches are interrupted, completed
    /// results are preserved
    CancelJob { job_id: JobId },

    /// Build a plan from free text without submitting it
    PreviewPlan { text: String },

    /// Price a plan against the current registry
    PreviewPlanCost { plan: Plan },

    // ── Media ───────────────────────────────────────────────────────────
    /// Negotiate a screen-capture session with a producer chosen by policy
    StartMediaSession {
        policy: Policy,
        #[serde(default)]
        fps: u32,
        #[serde(default)]
        quality: u32,
        #[serde(default)]
        monitor_index: u32,
    },

    /// Deliver the consumer's SDP answer to the producer
    CompleteMediaSession { stream_id: String, answer_sdp: String },

    /// Tear down a media session
    StopMediaSession { stream_id: String },

    // ── Producer-side media primitives (peer-to-peer, engine-invoked) ──
    /// Ask the receiving node to create a capture offer
    CreateCaptureOffer { stream_id: String, fps: u32, quality: u32, monitor_index: u32 },

    /// Forward an SDP answer to the receiving producer node
    AcceptCaptureAnswer { stream_id: String, answer_sdp: String },

    /// Stop capture on the receiving producer node
    StopCapture { stream_id: String },

    // ── Transfer ────────────────────────────────────────────────────────
    /// Mint a one-shot download ticket for a path under the shared root
    CreateDownloadTicket { path: String },

    /// Read a window of a file under the shared root
    ReadFile {
        path: String,
        mode: ReadMode,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        offset: Option<u64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        length: Option<u64>,
    },
}

#[cfg(test)]
#[path = "request_tests.rs"]
mod tests;
