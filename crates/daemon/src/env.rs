// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the daemon crate.

use std::path::PathBuf;
use std::time::Duration;

use crate::lifecycle::LifecycleError;

/// Daemon version (from Cargo.toml)
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// RPC plane listen address.
pub fn grpc_addr() -> String {
    var_or("GRPC_ADDR", "0.0.0.0:50051")
}

/// Shared auth secret validated on every RPC call.
pub fn dev_key() -> String {
    var_or("DEV_KEY", "dev")
}

/// Stable device-ID override (otherwise read from the persisted file).
pub fn device_id_override() -> Option<String> {
    std::env::var("DEVICE_ID").ok().filter(|s| !s.is_empty())
}

/// Bulk file-transfer side channel address.
pub fn bulk_http_addr() -> String {
    var_or("BULK_HTTP_ADDR", "0.0.0.0:8081")
}

/// Download ticket TTL.
pub fn bulk_ttl() -> Duration {
    Duration::from_secs(parse_var("BULK_TTL_SECONDS").unwrap_or(60))
}

/// Root directory served by download tickets and `ReadFile`.
pub fn shared_dir() -> PathBuf {
    std::env::var("SHARED_DIR").map(PathBuf::from).unwrap_or_else(|_| PathBuf::from("./shared"))
}

/// Whether the UDP discovery agent runs.
pub fn p2p_discovery() -> bool {
    std::env::var("P2P_DISCOVERY").map(|s| s != "false" && s != "0").unwrap_or(true)
}

/// UDP discovery port.
pub fn discovery_port() -> u16 {
    parse_var("DISCOVERY_PORT").unwrap_or(50050)
}

/// Seed peers for unicast cross-subnet announcements (comma-separated).
pub fn seed_peers() -> Vec<String> {
    std::env::var("SEED_PEERS")
        .map(|s| s.split(',').map(str::trim).filter(|s| !s.is_empty()).map(String::from).collect())
        .unwrap_or_default()
}

/// Resolve the dot-directory holding the persisted device ID:
/// MESH_DATA_DIR > ~/.meshd
pub fn data_dir() -> Result<PathBuf, LifecycleError> {
    if let Ok(dir) = std::env::var("MESH_DATA_DIR") {
        return Ok(PathBuf::from(dir));
    }
    dirs::home_dir().map(|h| h.join(".meshd")).ok_or(LifecycleError::NoDataDir)
}

/// Local LLM runtime endpoint; enables the `local_llm` capability.
pub fn llm_endpoint() -> Option<String> {
    std::env::var("LLM_ENDPOINT").ok().filter(|s| !s.is_empty())
}

/// Model served by the local LLM runtime.
pub fn llm_model() -> String {
    var_or("LLM_MODEL", "llama3")
}

/// Image-generation endpoint.
pub fn image_endpoint() -> Option<String> {
    std::env::var("IMAGE_ENDPOINT").ok().filter(|s| !s.is_empty())
}

/// External AI planner endpoint.
pub fn planner_endpoint() -> Option<String> {
    std::env::var("PLANNER_ENDPOINT").ok().filter(|s| !s.is_empty())
}

/// Extra advertised capabilities (comma-separated: "gpu,npu").
/// Accelerators cannot be probed portably, so deployments declare them.
pub fn extra_capabilities() -> Vec<String> {
    std::env::var("EXTRA_CAPABILITIES")
        .map(|s| {
            s.split(',').map(|c| c.trim().to_lowercase()).filter(|c| !c.is_empty()).collect()
        })
        .unwrap_or_default()
}

/// Media sessions with no signaling activity idle out after this long.
pub fn media_idle_timeout() -> Duration {
    Duration::from_secs(parse_var("MEDIA_IDLE_SECONDS").unwrap_or(60))
}

/// Default RPC exchange timeout.
pub fn ipc_timeout() -> Duration {
    parse_var("MESH_IPC_TIMEOUT_MS").map(Duration::from_millis).unwrap_or(Duration::from_secs(5))
}

fn var_or(name: &str, default: &str) -> String {
    std::env::var(name).ok().filter(|s| !s.is_empty()).unwrap_or_else(|| default.to_string())
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|s| s.parse().ok())
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
