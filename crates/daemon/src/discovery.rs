// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! UDP peer discovery.
//!
//! Every node broadcasts an ANNOUNCE datagram on the discovery port every
//! few seconds and unicasts the same datagram to configured seed peers to
//! bridge subnets. Incoming announcements feed the device registry; LEAVE
//! removes the sender. The receive loop never exits on a bad datagram.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use mesh_core::{Clock, Device};
use mesh_engine::DeviceRegistry;
use serde::{Deserialize, Serialize};
use tokio::net::UdpSocket;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Discovery protocol version.
pub const PROTOCOL_VERSION: u32 = 1;

/// How often ANNOUNCE goes out.
pub const ANNOUNCE_INTERVAL: Duration = Duration::from_secs(5);

/// Datagrams stay under 1 KB; anything bigger than this is dropped.
const MAX_DATAGRAM: usize = 2048;

/// Discovery datagram payload (UTF-8 JSON, one datagram per message).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DiscoveryMessage {
    #[serde(rename = "type")]
    pub kind: MessageKind,
    pub version: u32,
    pub ts: u64,
    pub device: Device,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageKind {
    Announce,
    Leave,
}

/// Agent configuration.
#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    /// UDP port to listen and broadcast on.
    pub port: u16,
    /// Unicast targets bridging subnets broadcast cannot reach.
    /// Entries may be bare IPs (the discovery port is appended) or ip:port.
    pub seed_peers: Vec<String>,
    /// LAN broadcast on 255.255.255.255. Disabled in tests and on
    /// networks that filter broadcast.
    pub broadcast: bool,
}

impl DiscoveryConfig {
    pub fn new(port: u16, seed_peers: Vec<String>) -> Self {
        Self { port, seed_peers, broadcast: true }
    }
}

/// The discovery agent: one socket, a receive loop, and an announce ticker.
pub struct DiscoveryAgent {
    socket: Arc<UdpSocket>,
    registry: Arc<DeviceRegistry>,
    port: u16,
    broadcast: bool,
    /// Shared with the announce ticker so seeds learned late still get
    /// unicast announcements.
    seed_peers: Arc<parking_lot::Mutex<Vec<String>>>,
    shutdown: CancellationToken,
}

impl DiscoveryAgent {
    /// Bind the discovery socket.
    ///
    /// When the configured port is already taken (e.g. by a colocated
    /// process) the adjacent port is tried before giving up.
    pub async fn bind(
        config: DiscoveryConfig,
        registry: Arc<DeviceRegistry>,
    ) -> std::io::Result<Self> {
        let socket = match UdpSocket::bind(("0.0.0.0", config.port)).await {
            Ok(socket) => socket,
            Err(e) if e.kind() == std::io::ErrorKind::AddrInUse => {
                let fallback = config.port.wrapping_add(1);
                warn!(port = config.port, fallback, "discovery port in use, trying adjacent");
                UdpSocket::bind(("0.0.0.0", fallback)).await?
            }
            Err(e) => return Err(e),
        };
        socket.set_broadcast(true)?;
        info!(addr = %socket.local_addr()?, "discovery socket bound");
        Ok(Self {
            socket: Arc::new(socket),
            registry,
            port: config.port,
            broadcast: config.broadcast,
            seed_peers: Arc::new(parking_lot::Mutex::new(config.seed_peers)),
            shutdown: CancellationToken::new(),
        })
    }

    /// Port the socket actually bound (differs from config on fallback).
    pub fn local_port(&self) -> std::io::Result<u16> {
        Ok(self.socket.local_addr()?.port())
    }

    /// Add a unicast seed target after binding (peers learned late).
    pub fn add_seed_peer(&self, addr: String) {
        self.seed_peers.lock().push(addr);
    }

    /// Spawn the receive loop and the announce ticker.
    pub fn start<C: Clock + 'static>(&self, clock: C) {
        let recv_socket = Arc::clone(&self.socket);
        let recv_registry = Arc::clone(&self.registry);
        let recv_clock = clock.clone();
        let recv_shutdown = self.shutdown.clone();
        tokio::spawn(async move {
            receive_loop(recv_socket, recv_registry, recv_clock, recv_shutdown).await;
        });

        let announce_socket = Arc::clone(&self.socket);
        let announce_registry = Arc::clone(&self.registry);
        let announce_seeds = Arc::clone(&self.seed_peers);
        let announce_shutdown = self.shutdown.clone();
        let (port, broadcast) = (self.port, self.broadcast);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(ANNOUNCE_INTERVAL);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let device = announce_registry.self_device();
                        let message = DiscoveryMessage {
                            kind: MessageKind::Announce,
                            version: PROTOCOL_VERSION,
                            ts: clock.epoch_ms(),
                            device,
                        };
                        let seeds = announce_seeds.lock().clone();
                        send_to_all(&announce_socket, port, broadcast, &seeds, &message).await;
                    }
                    _ = announce_shutdown.cancelled() => break,
                }
            }
        });
    }

    /// Broadcast a LEAVE and tear the agent down.
    pub async fn stop<C: Clock>(&self, clock: &C) {
        let message = DiscoveryMessage {
            kind: MessageKind::Leave,
            version: PROTOCOL_VERSION,
            ts: clock.epoch_ms(),
            device: self.registry.self_device(),
        };
        let seeds = self.seed_peers.lock().clone();
        send_to_all(&self.socket, self.port, self.broadcast, &seeds, &message).await;
        self.shutdown.cancel();
        info!("discovery agent stopped");
    }
}

/// Send one message to the broadcast address and every seed peer.
/// Send errors are logged and swallowed.
async fn send_to_all(
    socket: &UdpSocket,
    port: u16,
    broadcast: bool,
    seed_peers: &[String],
    message: &DiscoveryMessage,
) {
    let payload = match serde_json::to_vec(message) {
        Ok(p) => p,
        Err(e) => {
            warn!(error = %e, "failed to encode discovery message");
            return;
        }
    };

    if broadcast {
        let target = SocketAddr::from(([255, 255, 255, 255], port));
        if let Err(e) = socket.send_to(&payload, target).await {
            debug!(error = %e, "broadcast send failed");
        }
    }
    for seed in seed_peers {
        let target = if seed.contains(':') {
            seed.clone()
        } else {
            format!("{}:{}", seed, port)
        };
        if let Err(e) = socket.send_to(&payload, &target).await {
            debug!(seed = %target, error = %e, "seed send failed");
        }
    }
}

/// Receive loop: parse, dedupe, rewrite, register. Never exits on error.
async fn receive_loop<C: Clock>(
    socket: Arc<UdpSocket>,
    registry: Arc<DeviceRegistry>,
    clock: C,
    shutdown: CancellationToken,
) {
    let mut buf = [0u8; MAX_DATAGRAM];
    loop {
        let (len, src) = tokio::select! {
            result = socket.recv_from(&mut buf) => match result {
                Ok(received) => received,
                Err(e) => {
                    warn!(error = %e, "discovery recv error");
                    continue;
                }
            },
            _ = shutdown.cancelled() => break,
        };

        let message: DiscoveryMessage = match serde_json::from_slice(&buf[..len]) {
            Ok(m) => m,
            Err(e) => {
                debug!(%src, error = %e, "ignoring malformed discovery datagram");
                continue;
            }
        };
        handle_message(&registry, message, src.ip(), clock.epoch_ms());
    }
}

/// Apply one parsed discovery message to the registry.
pub fn handle_message(
    registry: &DeviceRegistry,
    message: DiscoveryMessage,
    src_ip: IpAddr,
    now_ms: u64,
) {
    let mut device = message.device;
    // Own announcements echo back via broadcast; drop them.
    if registry.is_self(&device.id) {
        return;
    }

    match message.kind {
        MessageKind::Announce => {
            device.grpc_addr = rewrite_addr(&device.grpc_addr, src_ip);
            if let Some(http) = device.http_addr.take() {
                device.http_addr = Some(rewrite_addr(&http, src_ip));
            }
            registry.register(device, now_ms);
        }
        MessageKind::Leave => {
            registry.deregister(&device.id);
        }
    }
}

/// Replace a wildcard or loopback host with the datagram's source IP.
///
/// Senders that bind a wildcard address advertise `0.0.0.0:<port>`; only
/// the sender's source address is actually reachable.
pub fn rewrite_addr(addr: &str, src_ip: IpAddr) -> String {
    let Some((host, port)) = addr.rsplit_once(':') else {
        return addr.to_string();
    };
    match host {
        "0.0.0.0" | "127.0.0.1" | "localhost" | "[::]" | "::" => format!("{src_ip}:{port}"),
        _ => addr.to_string(),
    }
}

#[cfg(test)]
#[path = "discovery_tests.rs"]
mod tests;
