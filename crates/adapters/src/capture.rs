// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Screen-capture producer seam.
//!
//! The control plane only negotiates sessions: offer out, answer back,
//! teardown. Codec, ICE, and the media transport live behind this trait.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("this host cannot capture")]
    NotSupported,

    #[error("unknown stream: {0}")]
    UnknownStream(String),

    #[error("capture backend error: {0}")]
    Backend(String),
}

/// Desired capture parameters, negotiated per session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureParams {
    pub fps: u32,
    pub quality: u32,
    pub monitor_index: u32,
}

impl Default for CaptureParams {
    fn default() -> Self {
        Self { fps: 15, quality: 70, monitor_index: 0 }
    }
}

/// A backend able to host capture sessions on this node.
///
/// One producer may host several concurrent streams, keyed by stream ID.
#[async_trait]
pub trait FrameProducer: Send + Sync {
    /// Create a media offer for a new stream.
    async fn create_offer(
        &self,
        stream_id: &str,
        params: &CaptureParams,
    ) -> Result<String, CaptureError>;

    /// Apply the consumer's answer; capture starts when this returns.
    async fn accept_answer(&self, stream_id: &str, answer_sdp: &str) -> Result<(), CaptureError>;

    /// Tear a stream down. Unknown streams are not an error.
    async fn stop(&self, stream_id: &str) -> Result<(), CaptureError>;
}
