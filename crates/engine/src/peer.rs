// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The engine's only view of remote nodes.
//!
//! The daemon implements this over the wire protocol; tests implement it
//! in-process. The engine never opens sockets itself.

use async_trait::async_trait;
use mesh_adapters::CaptureParams;
use mesh_core::{Device, Task, TaskResult};
use thiserror::Error;

/// Errors from peer RPC calls.
///
/// These surface as task-level failures inside job snapshots, never as
/// job-level faults.
#[derive(Debug, Error)]
pub enum PeerError {
    #[error("peer unreachable: {0}")]
    Unreachable(String),

    #[error("peer call timed out")]
    Timeout,

    /// The peer answered with a structured error.
    #[error("peer refused: {code}: {message}")]
    Denied { code: String, message: String },

    #[error("protocol error: {0}")]
    Protocol(String),
}

/// Calls the engine makes into other nodes (or itself, when local).
#[async_trait]
pub trait PeerRpc: Send + Sync {
    /// Execute one task on the target node's worker primitive.
    async fn run_task(&self, device: &Device, task: &Task) -> Result<TaskResult, PeerError>;

    /// Ask a producer node to create a capture offer.
    async fn create_capture_offer(
        &self,
        device: &Device,
        stream_id: &str,
        params: &CaptureParams,
    ) -> Result<String, PeerError>;

    /// Forward the consumer's answer to a producer node.
    async fn accept_capture_answer(
        &self,
        device: &Device,
        stream_id: &str,
        answer_sdp: &str,
    ) -> Result<(), PeerError>;

    /// Tear down capture on a producer node.
    async fn stop_capture(&self, device: &Device, stream_id: &str) -> Result<(), PeerError>;
}
