// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Client session table.
//!
//! Sessions are advisory: they let clients detect a restarted daemon and
//! give the media layer a heartbeat to key idle timeouts on.

use std::collections::HashMap;
use std::time::Duration;

use mesh_core::id::{Id, IdKind};
use mesh_core::Clock;
use parking_lot::Mutex;

/// Tag for client session ids.
pub enum SessionIdKind {}

impl IdKind for SessionIdKind {
    const PREFIX: &'static str = "ses-";
}

/// Identifier for one client session.
pub type SessionId = Id<SessionIdKind>;

/// Sessions with no heartbeat for this long are swept.
pub const SESSION_STALE: Duration = Duration::from_secs(120);

pub struct SessionTable<C: Clock> {
    sessions: Mutex<HashMap<SessionId, u64>>,
    clock: C,
}

impl<C: Clock> SessionTable<C> {
    pub fn new(clock: C) -> Self {
        Self { sessions: Mutex::new(HashMap::new()), clock }
    }

    /// Open a new session.
    pub fn create(&self) -> SessionId {
        let id = SessionId::generate();
        self.sessions.lock().insert(id, self.clock.epoch_ms());
        id
    }

    /// Refresh a session. Returns false for unknown or swept sessions.
    pub fn heartbeat(&self, session_id: &str) -> bool {
        let mut sessions = self.sessions.lock();
        match sessions.get_mut(session_id) {
            Some(last_beat) => {
                *last_beat = self.clock.epoch_ms();
                true
            }
            None => false,
        }
    }

    /// Drop sessions whose last heartbeat is older than `stale`.
    pub fn sweep(&self, stale: Duration) -> usize {
        let cutoff = self.clock.epoch_ms().saturating_sub(stale.as_millis() as u64);
        let mut sessions = self.sessions.lock();
        let before = sessions.len();
        sessions.retain(|_, last_beat| *last_beat >= cutoff);
        before - sessions.len()
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.lock().is_empty()
    }
}

#[cfg(test)]
#[path = "sessions_tests.rs"]
mod tests;
