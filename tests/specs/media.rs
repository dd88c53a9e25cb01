// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Media signaling specs over the RPC surface.
//!
//! Test daemons carry no capture backend, so the interesting coverage is
//! the refusal paths; the full offer/answer lifecycle is covered by the
//! engine's unit tests against a fake producer.

use mesh_core::Policy;
use mesh_wire::{ErrorCode, Request, Response};

use super::prelude::*;

#[tokio::test]
async fn start_without_capture_capable_devices_fails() {
    let node = TestNode::spawn().await;
    let response = node
        .call(Request::StartMediaSession {
            policy: Policy::BestAvailable,
            fps: 15,
            quality: 70,
            monitor_index: 0,
        })
        .await;
    match response {
        Response::Error { code, .. } => assert_eq!(code, ErrorCode::NoEligibleDevice),
        other => panic!("unexpected response: {other:?}"),
    }
    node.daemon.shutdown().await;
}

#[tokio::test]
async fn complete_and_stop_unknown_stream_fail() {
    let node = TestNode::spawn().await;
    match node
        .call(Request::CompleteMediaSession {
            stream_id: "med-missing".into(),
            answer_sdp: "v=0".into(),
        })
        .await
    {
        Response::Error { code, .. } => assert_eq!(code, ErrorCode::StreamNotFound),
        other => panic!("unexpected response: {other:?}"),
    }
    match node.call(Request::StopMediaSession { stream_id: "med-missing".into() }).await {
        Response::Error { code, .. } => assert_eq!(code, ErrorCode::StreamNotFound),
        other => panic!("unexpected response: {other:?}"),
    }
    node.daemon.shutdown().await;
}

#[tokio::test]
async fn producer_primitives_refuse_without_a_backend() {
    let node = TestNode::spawn().await;
    match node
        .call(Request::CreateCaptureOffer {
            stream_id: "med-x".into(),
            fps: 15,
            quality: 70,
            monitor_index: 0,
        })
        .await
    {
        Response::Error { code, .. } => assert_eq!(code, ErrorCode::NoCaptureCapability),
        other => panic!("unexpected response: {other:?}"),
    }
    node.daemon.shutdown().await;
}
