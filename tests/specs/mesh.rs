// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Mesh formation specs: discovery, registration, health, auth.

use std::time::Duration;

use mesh_wire::{ErrorCode, Request, Response};

use super::prelude::*;

#[tokio::test]
async fn two_peer_mesh_discovers_both_devices() {
    let node_a = TestNode::spawn().await;
    let node_b = TestNode::spawn().await;

    // Seed each agent with the other's discovery port (broadcast is off
    // in tests; on a real LAN this happens by itself).
    let port_a = node_a.daemon.discovery_port().expect("discovery running");
    let port_b = node_b.daemon.discovery_port().expect("discovery running");
    node_a.daemon.add_discovery_seed(format!("127.0.0.1:{port_b}"));
    node_b.daemon.add_discovery_seed(format!("127.0.0.1:{port_a}"));

    // Announcements fire every 5s; allow a bit over one interval.
    let mut both_full = false;
    for _ in 0..120 {
        let a = match node_a.call(Request::ListDevices).await {
            Response::Devices { devices } => devices.len(),
            other => panic!("unexpected response: {other:?}"),
        };
        let b = match node_b.call(Request::ListDevices).await {
            Response::Devices { devices } => devices.len(),
            other => panic!("unexpected response: {other:?}"),
        };
        if a == 2 && b == 2 {
            both_full = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    assert!(both_full, "both registries should hold 2 devices within 6s");

    // The same device ids appear on both sides.
    let ids = |devices: Vec<mesh_core::Device>| {
        let mut ids: Vec<String> = devices.into_iter().map(|d| d.id.to_string()).collect();
        ids.sort();
        ids
    };
    let a_ids = match node_a.call(Request::ListDevices).await {
        Response::Devices { devices } => ids(devices),
        other => panic!("unexpected response: {other:?}"),
    };
    let b_ids = match node_b.call(Request::ListDevices).await {
        Response::Devices { devices } => ids(devices),
        other => panic!("unexpected response: {other:?}"),
    };
    assert_eq!(a_ids, b_ids);

    node_a.daemon.shutdown().await;
    node_b.daemon.shutdown().await;
}

#[tokio::test]
async fn register_device_is_idempotent() {
    let node = TestNode::spawn().await;
    let peer = mesh_core::Device {
        id: mesh_core::DeviceId::from_string("dev-manual"),
        name: "manual".into(),
        platform: "linux".into(),
        arch: "x86_64".into(),
        grpc_addr: "10.0.0.5:50051".into(),
        http_addr: None,
        capabilities: [mesh_core::Capability::Cpu].into_iter().collect(),
        local_model_name: None,
        last_seen_ms: 0,
    };

    let first = node.call(Request::RegisterDevice { device: peer.clone() }).await;
    let second = node.call(Request::RegisterDevice { device: peer.clone() }).await;
    assert!(matches!(first, Response::Registered { .. }));
    match second {
        Response::Registered { registered_at_ms } => assert!(registered_at_ms > 0),
        other => panic!("unexpected response: {other:?}"),
    }

    match node.call(Request::ListDevices).await {
        Response::Devices { devices } => {
            assert_eq!(devices.len(), 2);
            assert_eq!(devices.iter().filter(|d| d.id == "dev-manual").count(), 1);
        }
        other => panic!("unexpected response: {other:?}"),
    }
    node.daemon.shutdown().await;
}

#[tokio::test]
async fn health_check_reports_identity_and_time() {
    let node = TestNode::spawn().await;
    match node.call(Request::HealthCheck).await {
        Response::Health { device_id, server_time_ms, message } => {
            assert!(device_id.as_str().starts_with("dev-"));
            assert!(server_time_ms > 0);
            assert!(message.contains("ok"));
        }
        other => panic!("unexpected response: {other:?}"),
    }
    node.daemon.shutdown().await;
}

#[tokio::test]
async fn bad_token_is_unauthenticated() {
    let node = TestNode::spawn().await;
    let response = call_with_token(node.rpc_addr, "wrong-key", Request::ListDevices).await;
    match response {
        Response::Error { code, .. } => assert_eq!(code, ErrorCode::Unauthenticated),
        other => panic!("unexpected response: {other:?}"),
    }
    node.daemon.shutdown().await;
}

#[tokio::test]
async fn sessions_create_and_heartbeat() {
    let node = TestNode::spawn().await;
    let session_id = match node.call(Request::CreateSession).await {
        Response::SessionCreated { session_id } => session_id,
        other => panic!("unexpected response: {other:?}"),
    };
    match node.call(Request::Heartbeat { session_id }).await {
        Response::HeartbeatAck { alive } => assert!(alive),
        other => panic!("unexpected response: {other:?}"),
    }
    match node.call(Request::Heartbeat { session_id: "ses-unknown".into() }).await {
        Response::HeartbeatAck { alive } => assert!(!alive),
        other => panic!("unexpected response: {other:?}"),
    }
    node.daemon.shutdown().await;
}

#[tokio::test]
async fn get_device_status_for_self() {
    let node = TestNode::spawn().await;
    let id = node.device_id().await;
    match node.call(Request::GetDeviceStatus { device_id: id }).await {
        Response::DeviceStatus { device_id, mem_total_mb, .. } => {
            assert_eq!(device_id, id);
            // Zero only on platforms without /proc; Linux CI has it.
            let _ = mem_total_mb;
        }
        other => panic!("unexpected response: {other:?}"),
    }

    match node
        .call(Request::GetDeviceStatus { device_id: "dev-nope".into() })
        .await
    {
        Response::Error { code, .. } => assert_eq!(code, ErrorCode::UnknownDevice),
        other => panic!("unexpected response: {other:?}"),
    }
    node.daemon.shutdown().await;
}
