// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! One-shot, TTL-bounded download tickets.
//!
//! Tickets gate the out-of-band bulk HTTP channel: the control plane mints
//! them, the transport redeems them. Redeeming is an atomic check-and-flip
//! so a token is usable at most once.

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use mesh_core::Clock;
use parking_lot::Mutex;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Length of a ticket token (nanoid alphabet, CSPRNG-backed).
const TOKEN_LEN: usize = 32;

/// Interval between expiry sweeps.
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(10);

/// Errors from the ticket vault.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TicketError {
    #[error("path escapes the shared root: {0}")]
    DisallowedPath(String),

    #[error("ticket invalid")]
    Invalid,
}

/// A minted ticket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadTicket {
    pub token: String,
    pub path: PathBuf,
    pub expires_ms: u64,
    pub used: bool,
}

/// Resolve a requested path against the shared root.
///
/// Rejects `..` segments outright and absolute paths that do not live
/// under the root. Relative paths are joined to the root.
pub fn resolve_shared_path(root: &Path, requested: &str) -> Result<PathBuf, TicketError> {
    let requested_path = Path::new(requested);
    if requested_path
        .components()
        .any(|c| matches!(c, Component::ParentDir))
    {
        return Err(TicketError::DisallowedPath(requested.to_string()));
    }
    let resolved = if requested_path.is_absolute() {
        requested_path.to_path_buf()
    } else {
        root.join(requested_path)
    };
    if !resolved.starts_with(root) {
        return Err(TicketError::DisallowedPath(requested.to_string()));
    }
    Ok(resolved)
}

/// The vault: owns all tickets, hands out tokens.
pub struct DownloadTicketVault<C: Clock> {
    tickets: Mutex<HashMap<String, DownloadTicket>>,
    root: PathBuf,
    ttl: Duration,
    clock: C,
}

impl<C: Clock> DownloadTicketVault<C> {
    pub fn new(root: PathBuf, ttl: Duration, clock: C) -> Self {
        Self { tickets: Mutex::new(HashMap::new()), root, ttl, clock }
    }

    pub fn shared_root(&self) -> &Path {
        &self.root
    }

    /// Mint a one-shot ticket for a path under the shared root.
    pub fn mint(&self, requested: &str) -> Result<DownloadTicket, TicketError> {
        let path = resolve_shared_path(&self.root, requested)?;
        let ticket = DownloadTicket {
            token: nanoid::nanoid!(TOKEN_LEN),
            path,
            expires_ms: self.clock.epoch_ms() + self.ttl.as_millis() as u64,
            used: false,
        };
        // Tokens are fixed-length ASCII; log just enough to correlate.
        debug!(token = %&ticket.token[..8], "ticket minted");
        self.tickets.lock().insert(ticket.token.clone(), ticket.clone());
        Ok(ticket)
    }

    /// Atomic check-and-flip: at most one successful redeem per token.
    /// Expired tickets are unredeemable whether or not they were used.
    pub fn redeem(&self, token: &str) -> Result<PathBuf, TicketError> {
        let mut tickets = self.tickets.lock();
        let ticket = tickets.get_mut(token).ok_or(TicketError::Invalid)?;
        if ticket.used || self.clock.epoch_ms() >= ticket.expires_ms {
            return Err(TicketError::Invalid);
        }
        ticket.used = true;
        Ok(ticket.path.clone())
    }

    /// Drop expired entries. Returns how many were removed.
    pub fn sweep(&self) -> usize {
        let now_ms = self.clock.epoch_ms();
        let mut tickets = self.tickets.lock();
        let before = tickets.len();
        tickets.retain(|_, t| t.expires_ms > now_ms);
        let swept = before - tickets.len();
        if swept > 0 {
            debug!(swept, "expired tickets swept");
        }
        swept
    }

    pub fn len(&self) -> usize {
        self.tickets.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tickets.lock().is_empty()
    }
}

/// Spawn the periodic expiry sweep. Runs until `shutdown` fires.
pub fn spawn_sweep_task<C: Clock + 'static>(
    vault: Arc<DownloadTicketVault<C>>,
    shutdown: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(SWEEP_INTERVAL);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    vault.sweep();
                }
                _ = shutdown.cancelled() => break,
            }
        }
        info!("ticket sweeper stopped");
    })
}

#[cfg(test)]
#[path = "tickets_tests.rs"]
mod tests;
