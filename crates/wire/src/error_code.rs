// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Caller-visible error taxonomy.

use serde::{Deserialize, Serialize};
use strum::Display;

/// Error classification surfaced in [`crate::Response::Error`].
///
/// Internal error enums map onto these at the RPC boundary; per-task errors
/// are recorded inside job snapshots and never use this path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Bad or missing shared secret.
    Unauthenticated,
    /// Forced device ID not in the registry.
    UnknownDevice,
    /// No device satisfies the routing policy.
    NoEligibleDevice,
    /// Media-session target cannot capture.
    NoCaptureCapability,
    /// Shell command outside the allowlist.
    DisallowedCommand,
    /// Task kind with no registered executor on this host.
    UnsupportedKind,
    /// File path escapes the shared root or uses `..`.
    DisallowedPath,
    /// Unknown, expired, or already-used download ticket.
    TicketInvalid,
    JobNotFound,
    StreamNotFound,
    SessionNotFound,
    /// Task or RPC timeout.
    DeadlineExceeded,
    /// Malformed request (bad plan, missing field).
    InvalidArgument,
    /// Catch-all for programmer faults; logged server-side.
    Internal,
}

#[cfg(test)]
#[path = "error_code_tests.rs"]
mod tests;
