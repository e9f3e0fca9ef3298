//! Bounded durable offline queue
//!
//! Events that cannot be delivered (offline, or a failed online send) land
//! here and wait for the next batch sync. The queue lives in the key-value
//! store as one JSON-encoded array under [`OFFLINE_KEY`], read and rewritten
//! whole on every mutation; the single-writer pipeline worker makes that
//! safe without finer-grained locking.
//!
//! Invariant: `len() <= capacity` at all times. Insertion beyond capacity
//! evicts the oldest entries first, so the queue always holds the most
//! recent events.

use std::sync::Arc;

use crate::platform::KeyValueStore;
use crate::types::Event;

/// Storage key for the persisted queue.
pub const OFFLINE_KEY: &str = "analytics_offline";

/// Bounded FIFO queue of undelivered events, persisted across restarts.
pub struct OfflineQueue {
    store: Arc<dyn KeyValueStore>,
    capacity: usize,
}

impl OfflineQueue {
    pub fn new(store: Arc<dyn KeyValueStore>, capacity: usize) -> Self {
        Self { store, capacity }
    }

    /// Read the entire persisted queue.
    ///
    /// A missing key is an empty queue (the queue is created lazily on the
    /// first offline write). A corrupt value is treated as empty and logged;
    /// telemetry loss is silent degradation by design.
    pub fn load(&self) -> Vec<Event> {
        let raw = match self.store.get(OFFLINE_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read offline queue");
                return Vec::new();
            }
        };

        match serde_json::from_str(&raw) {
            Ok(events) => events,
            Err(e) => {
                tracing::warn!(error = %e, "Discarding corrupt offline queue");
                Vec::new()
            }
        }
    }

    /// Append an event, evicting the oldest entries beyond capacity.
    pub fn push(&self, event: Event) {
        let mut events = self.load();
        events.push(event);

        if events.len() > self.capacity {
            let excess = events.len() - self.capacity;
            events.drain(..excess);
            tracing::debug!(evicted = excess, "Offline queue at capacity, evicted oldest");
        }

        self.save(&events);
    }

    /// Drop the entire queue.
    ///
    /// Called only after an acknowledged batch flush.
    pub fn clear(&self) {
        if let Err(e) = self.store.remove(OFFLINE_KEY) {
            tracing::warn!(error = %e, "Failed to clear offline queue");
        }
    }

    /// Number of persisted events.
    pub fn len(&self) -> usize {
        self.load().len()
    }

    /// True when nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn save(&self, events: &[Event]) {
        let raw = match serde_json::to_string(events) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to encode offline queue");
                return;
            }
        };

        if let Err(e) = self.store.put(OFFLINE_KEY, &raw) {
            tracing::warn!(error = %e, "Failed to persist offline queue");
        }
    }
}
