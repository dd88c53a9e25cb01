// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixtures: spawn in-process daemons on ephemeral loopback ports
//! and talk to them exactly like a remote client would.

use std::net::SocketAddr;
use std::time::Duration;

use mesh_daemon::lifecycle::{self, Config, Daemon};
use mesh_wire::{read_response, write_request, Envelope, Request, Response};
use tempfile::TempDir;
use tokio::net::TcpStream;

pub const DEV_KEY: &str = "dev";
pub const RPC_TIMEOUT: Duration = Duration::from_secs(5);

/// One running daemon plus the temp dirs anchoring its state.
pub struct TestNode {
    pub daemon: Daemon,
    pub rpc_addr: SocketAddr,
    pub shared_dir: TempDir,
    _data_dir: TempDir,
}

impl TestNode {
    /// Spawn a daemon on ephemeral ports. Discovery runs but stays off the
    /// real network: broadcast is disabled, peers are seeded explicitly.
    pub async fn spawn() -> Self {
        let data_dir = TempDir::new().unwrap();
        let shared_dir = TempDir::new().unwrap();
        let config = Config {
            grpc_addr: "127.0.0.1:0".to_string(),
            dev_key: DEV_KEY.to_string(),
            bulk_http_addr: "127.0.0.1:8081".to_string(),
            bulk_ttl: Duration::from_secs(60),
            shared_dir: shared_dir.path().to_path_buf(),
            p2p_discovery: true,
            discovery_port: 0,
            discovery_broadcast: false,
            seed_peers: vec![],
            media_idle_timeout: Duration::from_secs(60),
            data_dir: data_dir.path().to_path_buf(),
            llm_endpoint: None,
            llm_model: "llama3".to_string(),
            image_endpoint: None,
            planner_endpoint: None,
            extra_capabilities: vec![],
        };
        let daemon = lifecycle::start(config).await.expect("daemon starts");
        let rpc_addr = daemon.rpc_addr();
        Self { daemon, rpc_addr, shared_dir, _data_dir: data_dir }
    }

    /// One authenticated request/response exchange.
    pub async fn call(&self, request: Request) -> Response {
        call_with_token(self.rpc_addr, DEV_KEY, request).await
    }

    /// This node's device id, via the RPC surface like any client.
    pub async fn device_id(&self) -> mesh_core::DeviceId {
        match self.call(Request::HealthCheck).await {
            Response::Health { device_id, .. } => device_id,
            other => panic!("unexpected health response: {other:?}"),
        }
    }

    /// This node's own registry record, with the loopback address a peer
    /// on this host can actually dial.
    pub async fn self_device(&self) -> mesh_core::Device {
        let id = self.device_id().await;
        match self.call(Request::ListDevices).await {
            Response::Devices { devices } => {
                let mut device =
                    devices.into_iter().find(|d| d.id == id).expect("self entry listed");
                device.grpc_addr = format!("127.0.0.1:{}", self.rpc_addr.port());
                device
            }
            other => panic!("unexpected devices response: {other:?}"),
        }
    }
}

pub async fn call_with_token(addr: SocketAddr, token: &str, request: Request) -> Response {
    let mut stream = TcpStream::connect(addr).await.expect("connect");
    let envelope = Envelope::new(token, request);
    write_request(&mut stream, &envelope, RPC_TIMEOUT).await.expect("write");
    read_response(&mut stream, RPC_TIMEOUT).await.expect("read")
}

/// Fetch a job snapshot and poll until it reaches a terminal state.
pub async fn wait_job_terminal(node: &TestNode, job_id: mesh_core::JobId) -> mesh_core::Job {
    for _ in 0..200 {
        match node.call(Request::GetJob { job_id }).await {
            Response::Job { job } => {
                if job.is_terminal() {
                    return job;
                }
            }
            other => panic!("unexpected job response: {other:?}"),
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    panic!("job {job_id} never reached a terminal state");
}
