// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session and liveness handlers.

use mesh_core::Clock;
use mesh_wire::Response;

use super::ListenCtx;

pub(super) fn create(ctx: &ListenCtx) -> Response {
    let session_id = ctx.sessions.create();
    Response::SessionCreated { session_id: session_id.to_string() }
}

pub(super) fn heartbeat(ctx: &ListenCtx, session_id: &str) -> Response {
    Response::HeartbeatAck { alive: ctx.sessions.heartbeat(session_id) }
}

pub(super) fn health(ctx: &ListenCtx) -> Response {
    Response::Health {
        device_id: ctx.registry.self_id(),
        server_time_ms: ctx.clock.epoch_ms(),
        message: format!("meshd {} ok", crate::env::VERSION),
    }
}
