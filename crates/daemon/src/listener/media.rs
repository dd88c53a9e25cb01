// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Media signaling handlers: the consumer-facing session operations plus
//! the producer-side primitives peers invoke on this node.

use mesh_adapters::{CaptureError, CaptureParams};
use mesh_core::Policy;
use mesh_engine::MediaError;
use mesh_wire::{ErrorCode, Response};

use super::ListenCtx;

fn map_media_error(e: MediaError) -> Response {
    match e {
        MediaError::NoEligibleDevice => {
            Response::error(ErrorCode::NoEligibleDevice, "no capture-capable device")
        }
        MediaError::UnknownDevice(id) => Response::error(ErrorCode::UnknownDevice, id.as_str()),
        MediaError::NoCaptureCapability => {
            Response::error(ErrorCode::NoCaptureCapability, "producer cannot capture")
        }
        MediaError::StreamNotFound(id) => Response::error(ErrorCode::StreamNotFound, id),
        MediaError::Producer(message) => Response::error(ErrorCode::Internal, message),
    }
}

pub(super) async fn start(
    ctx: &ListenCtx,
    policy: &Policy,
    fps: u32,
    quality: u32,
    monitor_index: u32,
    consumer: &str,
) -> Response {
    let defaults = CaptureParams::default();
    let params = CaptureParams {
        fps: if fps == 0 { defaults.fps } else { fps },
        quality: if quality == 0 { defaults.quality } else { quality },
        monitor_index,
    };
    match ctx.media.start(policy, params, consumer).await {
        Ok(session) => Response::MediaStarted {
            stream_id: session.stream_id.to_string(),
            offer_sdp: session.offer_sdp,
            producer_device_id: session.producer_device_id,
        },
        Err(e) => map_media_error(e),
    }
}

pub(super) async fn complete(ctx: &ListenCtx, stream_id: &str, answer_sdp: &str) -> Response {
    match ctx.media.complete(stream_id, answer_sdp).await {
        Ok(()) => Response::Ok,
        Err(e) => map_media_error(e),
    }
}

pub(super) async fn stop(ctx: &ListenCtx, stream_id: &str) -> Response {
    match ctx.media.stop(stream_id).await {
        Ok(()) => Response::Ok,
        Err(e) => map_media_error(e),
    }
}

// ── Producer-side primitives ────────────────────────────────────────────

fn map_capture_error(e: CaptureError) -> Response {
    match e {
        CaptureError::NotSupported => {
            Response::error(ErrorCode::NoCaptureCapability, "this host cannot capture")
        }
        CaptureError::UnknownStream(id) => Response::error(ErrorCode::StreamNotFound, id),
        CaptureError::Backend(message) => Response::error(ErrorCode::Internal, message),
    }
}

pub(super) async fn create_offer(
    ctx: &ListenCtx,
    stream_id: &str,
    fps: u32,
    quality: u32,
    monitor_index: u32,
) -> Response {
    let Some(producer) = &ctx.local_producer else {
        return Response::error(ErrorCode::NoCaptureCapability, "no capture backend");
    };
    let params = CaptureParams { fps, quality, monitor_index };
    match producer.create_offer(stream_id, &params).await {
        Ok(offer_sdp) => {
            Response::CaptureOffer { stream_id: stream_id.to_string(), offer_sdp }
        }
        Err(e) => map_capture_error(e),
    }
}

pub(super) async fn accept_answer(ctx: &ListenCtx, stream_id: &str, answer_sdp: &str) -> Response {
    let Some(producer) = &ctx.local_producer else {
        return Response::error(ErrorCode::NoCaptureCapability, "no capture backend");
    };
    match producer.accept_answer(stream_id, answer_sdp).await {
        Ok(()) => Response::Ok,
        Err(e) => map_capture_error(e),
    }
}

pub(super) async fn stop_capture(ctx: &ListenCtx, stream_id: &str) -> Response {
    let Some(producer) = &ctx.local_producer else {
        return Response::error(ErrorCode::NoCaptureCapability, "no capture backend");
    };
    match producer.stop(stream_id).await {
        Ok(()) => Response::Ok,
        Err(e) => map_capture_error(e),
    }
}
