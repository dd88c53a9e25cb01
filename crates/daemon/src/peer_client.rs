// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire client for calling other mesh nodes.
//!
//! One connection per call: the protocol is strict request/response and
//! calls are engine-driven, so connection pooling buys nothing here.

use std::time::Duration;

use async_trait::async_trait;
use mesh_adapters::CaptureParams;
use mesh_core::{Device, Task, TaskResult};
use mesh_engine::{PeerError, PeerRpc};
use mesh_wire::{read_response, write_request, Envelope, ProtocolError, Request, Response};
use tokio::net::TcpStream;
use tracing::debug;

pub struct PeerClient {
    token: String,
    timeout: Duration,
}

impl PeerClient {
    pub fn new(token: impl Into<String>, timeout: Duration) -> Self {
        Self { token: token.into(), timeout }
    }

    /// One request/response exchange with the node at `addr`.
    pub async fn call(&self, addr: &str, request: Request) -> Result<Response, PeerError> {
        debug!(%addr, "peer call");
        let mut stream = tokio::time::timeout(self.timeout, TcpStream::connect(addr))
            .await
            .map_err(|_| PeerError::Timeout)?
            .map_err(|e| PeerError::Unreachable(format!("{addr}: {e}")))?;

        let envelope = Envelope::new(self.token.clone(), request);
        write_request(&mut stream, &envelope, self.timeout)
            .await
            .map_err(map_protocol_error)?;
        let response = read_response(&mut stream, self.timeout)
            .await
            .map_err(map_protocol_error)?;

        match response {
            Response::Error { code, message } => {
                Err(PeerError::Denied { code: code.to_string(), message })
            }
            other => Ok(other),
        }
    }
}

/// Turn a peer failure back into a structured response for proxied calls.
pub fn map_peer_error(e: PeerError) -> Response {
    match e {
        PeerError::Denied { code, message } => {
            let parsed: Result<mesh_wire::ErrorCode, _> =
                serde_json::from_value(serde_json::Value::String(code.clone()));
            match parsed {
                Ok(code) => Response::Error { code, message },
                Err(_) => Response::error(
                    mesh_wire::ErrorCode::Internal,
                    format!("{code}: {message}"),
                ),
            }
        }
        PeerError::Timeout => {
            Response::error(mesh_wire::ErrorCode::DeadlineExceeded, "peer call timed out")
        }
        other => Response::error(mesh_wire::ErrorCode::Internal, other.to_string()),
    }
}

fn map_protocol_error(e: ProtocolError) -> PeerError {
    match e {
        ProtocolError::Timeout => PeerError::Timeout,
        ProtocolError::ConnectionClosed => {
            PeerError::Unreachable("connection closed".to_string())
        }
        other => PeerError::Protocol(other.to_string()),
    }
}

#[async_trait]
impl PeerRpc for PeerClient {
    async fn run_task(&self, device: &Device, task: &Task) -> Result<TaskResult, PeerError> {
        let response =
            self.call(&device.grpc_addr, Request::RunTask { task: task.clone() }).await?;
        match response {
            Response::TaskDone { output, error, time_ms, .. } => Ok(TaskResult {
                output,
                exit_code: None,
                elapsed_ms: time_ms,
                error,
            }),
            other => Err(PeerError::Protocol(format!("unexpected response: {other:?}"))),
        }
    }

    async fn create_capture_offer(
        &self,
        device: &Device,
        stream_id: &str,
        params: &CaptureParams,
    ) -> Result<String, PeerError> {
        let request = Request::CreateCaptureOffer {
            stream_id: stream_id.to_string(),
            fps: params.fps,
            quality: params.quality,
            monitor_index: params.monitor_index,
        };
        match self.call(&device.grpc_addr, request).await? {
            Response::CaptureOffer { offer_sdp, .. } => Ok(offer_sdp),
            other => Err(PeerError::Protocol(format!("unexpected response: {other:?}"))),
        }
    }

    async fn accept_capture_answer(
        &self,
        device: &Device,
        stream_id: &str,
        answer_sdp: &str,
    ) -> Result<(), PeerError> {
        let request = Request::AcceptCaptureAnswer {
            stream_id: stream_id.to_string(),
            answer_sdp: answer_sdp.to_string(),
        };
        match self.call(&device.grpc_addr, request).await? {
            Response::Ok => Ok(()),
            other => Err(PeerError::Protocol(format!("unexpected response: {other:?}"))),
        }
    }

    async fn stop_capture(&self, device: &Device, stream_id: &str) -> Result<(), PeerError> {
        let request = Request::StopCapture { stream_id: stream_id.to_string() };
        match self.call(&device.grpc_addr, request).await? {
            Response::Ok => Ok(()),
            other => Err(PeerError::Protocol(format!("unexpected response: {other:?}"))),
        }
    }
}
