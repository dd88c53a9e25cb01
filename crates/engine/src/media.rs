// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Media session signaling.
//!
//! The control plane owns stream IDs, SDP exchange, and lifecycle. Frames
//! never pass through here; they ride the media transport negotiated
//! between producer and consumer.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use mesh_adapters::{CaptureParams, FrameProducer};
use mesh_core::id::{Id, IdKind};
use mesh_core::{Capability, Clock, DeviceId};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use strum::Display;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::peer::{PeerError, PeerRpc};
use crate::registry::DeviceRegistry;
use crate::router::{route_for_capture, RouteError};

/// Tag for media stream ids.
pub enum StreamIdKind {}

impl IdKind for StreamIdKind {
    const PREFIX: &'static str = "med-";
}

/// Identifier for one producer→consumer media session.
pub type StreamId = Id<StreamIdKind>;

/// Session lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MediaSessionState {
    Offered,
    Negotiated,
    Active,
    Closed,
}

/// One negotiated producer→consumer exchange.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaSession {
    pub stream_id: StreamId,
    /// Whoever initiated the session (client address or peer name).
    pub consumer_endpoint: String,
    pub producer_device_id: DeviceId,
    pub offer_sdp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer_sdp: Option<String>,
    pub params: CaptureParams,
    pub state: MediaSessionState,
    pub last_activity_ms: u64,
}

/// Errors from media signaling.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("no device satisfies the policy")]
    NoEligibleDevice,

    #[error("unknown device: {0}")]
    UnknownDevice(DeviceId),

    #[error("producer cannot capture")]
    NoCaptureCapability,

    #[error("unknown stream: {0}")]
    StreamNotFound(String),

    #[error("producer error: {0}")]
    Producer(String),
}

impl From<RouteError> for MediaError {
    fn from(e: RouteError) -> Self {
        match e {
            RouteError::NoEligibleDevice => MediaError::NoEligibleDevice,
            RouteError::UnknownDevice(id) => MediaError::UnknownDevice(id),
        }
    }
}

impl From<PeerError> for MediaError {
    fn from(e: PeerError) -> Self {
        match e {
            PeerError::Denied { code, message } if code == "NO_CAPTURE_CAPABILITY" => {
                let _ = message;
                MediaError::NoCaptureCapability
            }
            other => MediaError::Producer(other.to_string()),
        }
    }
}

struct SessionHandle {
    session: MediaSession,
    watcher: CancellationToken,
}

/// Owns media sessions and drives their lifecycle.
pub struct MediaSessionManager<C: Clock + 'static> {
    sessions: Arc<Mutex<HashMap<StreamId, SessionHandle>>>,
    registry: Arc<DeviceRegistry>,
    peers: Arc<dyn PeerRpc>,
    /// Capture backend when this node is itself the producer.
    local_producer: Option<Arc<dyn FrameProducer>>,
    clock: C,
    idle_timeout: Duration,
}

impl<C: Clock + 'static> MediaSessionManager<C> {
    pub fn new(
        registry: Arc<DeviceRegistry>,
        peers: Arc<dyn PeerRpc>,
        local_producer: Option<Arc<dyn FrameProducer>>,
        clock: C,
        idle_timeout: Duration,
    ) -> Self {
        Self {
            sessions: Arc::new(Mutex::new(HashMap::new())),
            registry,
            peers,
            local_producer,
            clock,
            idle_timeout,
        }
    }

    /// Pick a producer by policy, fetch an offer from it, store the session.
    pub async fn start(
        &self,
        policy: &mesh_core::Policy,
        params: CaptureParams,
        consumer_endpoint: &str,
    ) -> Result<MediaSession, MediaError> {
        let snapshot = self.registry.list();
        let self_id = self.registry.self_id();
        let producer_id = route_for_capture(policy, &snapshot, &self_id)?;

        let stream_id = StreamId::generate();
        let offer_sdp = if self.registry.is_self(&producer_id) {
            let producer =
                self.local_producer.as_ref().ok_or(MediaError::NoCaptureCapability)?;
            producer
                .create_offer(stream_id.as_str(), &params)
                .await
                .map_err(|e| match e {
                    mesh_adapters::CaptureError::NotSupported => MediaError::NoCaptureCapability,
                    other => MediaError::Producer(other.to_string()),
                })?
        } else {
            let device = self
                .registry
                .get(&producer_id)
                .ok_or(MediaError::UnknownDevice(producer_id))?;
            if !device.has_capability(Capability::ScreenCapture) {
                return Err(MediaError::NoCaptureCapability);
            }
            self.peers.create_capture_offer(&device, stream_id.as_str(), &params).await?
        };

        let session = MediaSession {
            stream_id,
            consumer_endpoint: consumer_endpoint.to_string(),
            producer_device_id: producer_id,
            offer_sdp,
            answer_sdp: None,
            params,
            state: MediaSessionState::Offered,
            last_activity_ms: self.clock.epoch_ms(),
        };
        info!(%stream_id, producer = %producer_id, "media session offered");

        let watcher = CancellationToken::new();
        self.sessions.lock().insert(
            stream_id,
            SessionHandle { session: session.clone(), watcher: watcher.clone() },
        );
        self.spawn_idle_watcher(stream_id, watcher);
        Ok(session)
    }

    /// Deliver the consumer's answer. ACTIVE once the producer confirms.
    pub async fn complete(&self, stream_id: &str, answer_sdp: &str) -> Result<(), MediaError> {
        let producer_id = {
            let mut sessions = self.sessions.lock();
            let handle = lookup(&mut sessions, stream_id)?;
            handle.session.answer_sdp = Some(answer_sdp.to_string());
            handle.session.state = MediaSessionState::Negotiated;
            handle.session.last_activity_ms = self.clock.epoch_ms();
            handle.session.producer_device_id
        };

        let confirm = if self.registry.is_self(&producer_id) {
            let producer =
                self.local_producer.as_ref().ok_or(MediaError::NoCaptureCapability)?;
            producer
                .accept_answer(stream_id, answer_sdp)
                .await
                .map_err(|e| MediaError::Producer(e.to_string()))
        } else {
            let device = self
                .registry
                .get(&producer_id)
                .ok_or(MediaError::UnknownDevice(producer_id))?;
            self.peers
                .accept_capture_answer(&device, stream_id, answer_sdp)
                .await
                .map_err(MediaError::from)
        };

        match confirm {
            Ok(()) => {
                let mut sessions = self.sessions.lock();
                if let Ok(handle) = lookup(&mut sessions, stream_id) {
                    handle.session.state = MediaSessionState::Active;
                }
                debug!(%stream_id, "media session active");
                Ok(())
            }
            // Answer stored; the session stays NEGOTIATED pending a retry.
            Err(e) => Err(e),
        }
    }

    /// Tear down at the producer and drop the record.
    pub async fn stop(&self, stream_id: &str) -> Result<(), MediaError> {
        let handle = {
            let mut sessions = self.sessions.lock();
            let mut handle = sessions
                .remove(stream_id)
                .ok_or_else(|| MediaError::StreamNotFound(stream_id.to_string()))?;
            handle.session.state = MediaSessionState::Closed;
            handle.watcher.cancel();
            handle
        };

        // Best-effort teardown at the producer.
        let producer_id = handle.session.producer_device_id;
        if self.registry.is_self(&producer_id) {
            if let Some(producer) = &self.local_producer {
                if let Err(e) = producer.stop(stream_id).await {
                    warn!(%stream_id, error = %e, "local capture teardown failed");
                }
            }
        } else if let Some(device) = self.registry.get(&producer_id) {
            if let Err(e) = self.peers.stop_capture(&device, stream_id).await {
                warn!(%stream_id, error = %e, "producer teardown failed");
            }
        }
        info!(%stream_id, "media session closed");
        Ok(())
    }

    /// Record signaling activity (heartbeats reset the idle clock).
    pub fn touch(&self, stream_id: &str) {
        let mut sessions = self.sessions.lock();
        if let Ok(handle) = lookup(&mut sessions, stream_id) {
            handle.session.last_activity_ms = self.clock.epoch_ms();
        }
    }

    /// Snapshot of one session.
    pub fn get(&self, stream_id: &str) -> Option<MediaSession> {
        self.sessions.lock().get(stream_id).map(|h| h.session.clone())
    }

    pub fn session_count(&self) -> usize {
        self.sessions.lock().len()
    }

    /// Per-session idle watcher: closes the session when no signaling
    /// activity lands within the idle window.
    fn spawn_idle_watcher(&self, stream_id: StreamId, watcher: CancellationToken) {
        let sessions = Arc::clone(&self.sessions);
        let clock = self.clock.clone();
        let idle_timeout = self.idle_timeout;
        let check = idle_timeout.min(Duration::from_secs(5)).max(Duration::from_millis(50));
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = tokio::time::sleep(check) => {}
                    _ = watcher.cancelled() => return,
                }
                let now_ms = clock.epoch_ms();
                let expired = {
                    let sessions = sessions.lock();
                    match sessions.get(&stream_id) {
                        Some(handle) => {
                            now_ms.saturating_sub(handle.session.last_activity_ms)
                                >= idle_timeout.as_millis() as u64
                        }
                        None => return,
                    }
                };
                if expired {
                    if sessions.lock().remove(&stream_id).is_some() {
                        info!(%stream_id, "media session idle-timed out");
                    }
                    return;
                }
            }
        });
    }
}

fn lookup<'a>(
    sessions: &'a mut HashMap<StreamId, SessionHandle>,
    stream_id: &str,
) -> Result<&'a mut SessionHandle, MediaError> {
    sessions
        .get_mut(stream_id)
        .ok_or_else(|| MediaError::StreamNotFound(stream_id.to_string()))
}

#[cfg(test)]
#[path = "media_tests.rs"]
mod tests;
