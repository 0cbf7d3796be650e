//! Periodic TTL expiry.
//!
//! One reaper thread per handle. Each tick walks at most
//! [`REAP_BATCH`] TTL entries, resuming where the previous tick stopped,
//! so a large TTL table costs a bounded slice of work per second.
//! Expiry is local only: every peer runs the same clock over the same
//! deadlines, and broadcasting each eviction would storm the channel.

use super::handle::SharedStore;
use std::sync::atomic::Ordering;
use std::sync::{Arc, Weak};
use std::time::Duration;

/// Entries examined per tick.
pub(crate) const REAP_BATCH: usize = 250;

/// Start the reaper thread for a freshly opened handle. The thread holds
/// a weak reference and exits once the handle is closed or dropped.
pub(crate) fn spawn(store: &Arc<SharedStore>, interval: Duration) {
    let weak: Weak<SharedStore> = Arc::downgrade(store);

    std::thread::spawn(move || {
        loop {
            std::thread::sleep(interval);
            let Some(store) = weak.upgrade() else {
                break;
            };
            if store.closed() {
                break;
            }
            store.reap_expired();
        }
        tracing::debug!("reaper loop ended");
    });
}

impl SharedStore {
    /// One reaper tick: scan the next batch of TTL entries, evict the
    /// expired ones, and drop TTL entries whose binding is already gone.
    pub(crate) fn reap_expired(&self) {
        let keys: Vec<String> = self.ttl.iter().map(|entry| entry.key().clone()).collect();
        if keys.is_empty() {
            self.reap_cursor.store(0, Ordering::Relaxed);
            return;
        }

        let mut start = self.reap_cursor.load(Ordering::Relaxed);
        if start >= keys.len() {
            start = 0;
        }
        let end = (start + REAP_BATCH).min(keys.len());
        let now = super::now_ms();

        let mut reaped = 0usize;
        for key in &keys[start..end] {
            if let Some(deadline) = self.ttl.get(key).map(|entry| *entry)
                && deadline <= now
            {
                self.bindings.remove(key);
                self.ttl.remove(key);
                reaped += 1;
                continue;
            }
            // A TTL entry may briefly outlive its binding (remote delete
            // raced a ttl_set); reap the stale bookkeeping here.
            if !self.bindings.contains_key(key) {
                self.ttl.remove(key);
            }
        }

        self.reap_cursor
            .store(if end >= keys.len() { 0 } else { end }, Ordering::Relaxed);

        if reaped > 0 {
            tracing::debug!("reaped {} expired keys", reaped);
        } else {
            tracing::trace!("reaper tick: nothing expired");
        }
    }
}
