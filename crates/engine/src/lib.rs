// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! mesh-engine: the orchestration core.
//!
//! Device registry, policy router, cost estimator, planner, job engine,
//! media signaling, and download tickets. Everything external (peers,
//! task backends, capture) is reached through the traits in
//! `mesh-adapters` and [`peer::PeerRpc`].

pub mod cost;
pub mod job;
pub mod media;
pub mod peer;
pub mod planner;
pub mod reduce;
pub mod registry;
pub mod router;
pub mod tickets;

#[cfg(test)]
pub mod test_helpers;

pub use cost::estimate_plan;
pub use job::{EngineError, JobEngine, JobEngineConfig};
pub use media::{MediaError, MediaSession, MediaSessionManager, MediaSessionState, StreamId};
pub use peer::{PeerError, PeerRpc};
pub use planner::Planner;
pub use registry::DeviceRegistry;
pub use router::{route, route_for_capture, RouteError};
pub use tickets::{resolve_shared_path, DownloadTicket, DownloadTicketVault, TicketError};
