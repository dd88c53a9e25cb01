// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory table of known peers.
//!
//! The registry exclusively owns its records. All reads hand out value
//! copies; nothing outside this module holds a reference into the map.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use mesh_core::{Clock, Device, DeviceId};
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Default staleness threshold before a silent peer is evicted.
pub const STALE_THRESHOLD: Duration = Duration::from_secs(30);

/// Interval between stale sweeps.
pub const PURGE_INTERVAL: Duration = Duration::from_secs(5);

/// Device registry: `device_id → Device` behind a single mutex.
pub struct DeviceRegistry {
    devices: Mutex<HashMap<DeviceId, Device>>,
    self_id: DeviceId,
}

impl DeviceRegistry {
    /// Create a registry seeded with this node's own record.
    ///
    /// The self entry is always present and never purged.
    pub fn new(self_device: Device) -> Self {
        let self_id = self_device.id;
        let mut devices = HashMap::new();
        devices.insert(self_id, self_device);
        Self { devices: Mutex::new(devices), self_id }
    }

    pub fn self_id(&self) -> DeviceId {
        self.self_id
    }

    pub fn is_self(&self, id: &DeviceId) -> bool {
        *id == self.self_id
    }

    /// Insert or refresh a record. Returns the recorded sighting time.
    pub fn register(&self, mut device: Device, now_ms: u64) -> u64 {
        let mut devices = self.devices.lock();
        match devices.get_mut(&device.id) {
            Some(existing) => {
                let last_seen = existing.last_seen_ms;
                device.last_seen_ms = last_seen;
                *existing = device;
                existing.refresh(now_ms);
                existing.last_seen_ms
            }
            None => {
                debug!(device_id = %device.id, name = %device.name, "new device registered");
                device.last_seen_ms = now_ms;
                devices.insert(device.id, device);
                now_ms
            }
        }
    }

    /// Snapshot of one entry.
    pub fn get(&self, id: &DeviceId) -> Option<Device> {
        self.devices.lock().get(id).cloned()
    }

    /// Snapshot of the node's own record.
    pub fn self_device(&self) -> Device {
        // The self entry is inserted at construction and never removed.
        match self.get(&self.self_id) {
            Some(device) => device,
            None => unreachable!("self entry missing from registry"),
        }
    }

    /// Snapshot of all entries. Order is unspecified.
    pub fn list(&self) -> Vec<Device> {
        self.devices.lock().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.devices.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.lock().is_empty()
    }

    /// Remove a record on explicit LEAVE. The self entry is kept.
    pub fn deregister(&self, id: &DeviceId) {
        if *id == self.self_id {
            return;
        }
        if self.devices.lock().remove(id).is_some() {
            info!(device_id = %id, "device left the mesh");
        }
    }

    /// Evict entries not seen within `threshold`. The self entry survives.
    pub fn purge_stale(&self, threshold: Duration, now_ms: u64) -> usize {
        let cutoff = now_ms.saturating_sub(threshold.as_millis() as u64);
        let mut devices = self.devices.lock();
        let before = devices.len();
        let self_id = self.self_id;
        devices.retain(|id, d| *id == self_id || d.last_seen_ms >= cutoff);
        let purged = before - devices.len();
        if purged > 0 {
            debug!(purged, "purged stale devices");
        }
        purged
    }
}

/// Spawn the periodic stale sweep. Runs until `shutdown` fires.
pub fn spawn_purge_task<C: Clock + 'static>(
    registry: Arc<DeviceRegistry>,
    clock: C,
    shutdown: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(PURGE_INTERVAL);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    registry.purge_stale(STALE_THRESHOLD, clock.epoch_ms());
                }
                _ = shutdown.cancelled() => break,
            }
        }
    })
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
