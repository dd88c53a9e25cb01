// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Registry handlers.

use mesh_adapters::sample_host;
use mesh_core::{Clock, Device, DeviceId};
use mesh_wire::{ErrorCode, Request, Response};

use super::ListenCtx;
use crate::peer_client::map_peer_error;

pub(super) fn register(ctx: &ListenCtx, device: Device) -> Response {
    let registered_at_ms = ctx.registry.register(device, ctx.clock.epoch_ms());
    Response::Registered { registered_at_ms }
}

pub(super) fn list(ctx: &ListenCtx) -> Response {
    Response::Devices { devices: ctx.registry.list() }
}

/// Liveness and load for one device. Proxied to the target node when the
/// id is not our own; only the node itself can sample its host.
pub(super) async fn status(ctx: &ListenCtx, device_id: DeviceId) -> Response {
    let Some(device) = ctx.registry.get(&device_id) else {
        return Response::error(ErrorCode::UnknownDevice, device_id.as_str());
    };

    if ctx.registry.is_self(&device_id) {
        let sample = sample_host();
        return Response::DeviceStatus {
            device_id,
            last_seen_ms: device.last_seen_ms,
            cpu_load: sample.cpu_load,
            mem_used_mb: sample.mem_used_mb,
            mem_total_mb: sample.mem_total_mb,
        };
    }

    match ctx.peers.call(&device.grpc_addr, Request::GetDeviceStatus { device_id }).await {
        Ok(response @ Response::DeviceStatus { .. }) => response,
        Ok(other) => {
            Response::error(ErrorCode::Internal, format!("unexpected proxy response: {other:?}"))
        }
        Err(e) => map_peer_error(e),
    }
}
