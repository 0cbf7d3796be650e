use crate::channel::{self, KeySnapshot, StoreMessage};
use crate::lock::RegionLock;
use crate::region::Binding;
use crate::store::SharedStore;

use std::sync::Arc;
use std::sync::atomic::Ordering;

/// Broadcast the initialization request for a freshly opened handle.
pub(crate) fn announce(store: &Arc<SharedStore>) {
    let timestamp = store.init_timestamp.load(Ordering::Acquire);
    channel::publish(
        store.name(),
        store.peer(),
        StoreMessage::InitializeRequest { timestamp },
    );
    tracing::debug!(
        "announced '{}' initialization (timestamp {})",
        store.name(),
        timestamp
    );
}

/// A newcomer asked for state. Only strictly-older handles answer; the
/// response carries this handle's own timestamp so receivers can rank
/// competing donations.
pub(crate) fn handle_initialize_request(store: &SharedStore, timestamp: u64) {
    let own = store.init_timestamp.load(Ordering::Acquire);
    if own >= timestamp {
        return;
    }

    let keys = snapshot(store);
    let store_lock = store.store_lock.read().clone();
    let donated = keys.len();

    channel::publish(
        store.name(),
        store.peer(),
        StoreMessage::InitializeResponse {
            timestamp: own,
            store_lock,
            keys,
        },
    );
    tracing::info!(
        "donated {} keys of '{}' to a newcomer (timestamp {} < {})",
        donated,
        store.name(),
        own,
        timestamp
    );
}

/// An older peer donated state. Adopt it only if it is strictly older
/// than whatever this handle currently descends from, then lower the
/// local timestamp so later duplicates and younger donors are ignored.
pub(crate) fn handle_initialize_response(
    store: &SharedStore,
    timestamp: u64,
    store_lock: Arc<RegionLock>,
    keys: Vec<KeySnapshot>,
) {
    let own = store.init_timestamp.load(Ordering::Acquire);
    if timestamp >= own {
        tracing::debug!(
            "ignoring donation with timestamp {} (own is {})",
            timestamp,
            own
        );
        return;
    }

    *store.store_lock.write() = store_lock;

    let adopted = keys.len();
    for snap in keys {
        store
            .bindings
            .insert(snap.key.clone(), Binding::new(snap.meta, snap.data));
        if let Some(deadline) = snap.ttl {
            store.ttl.insert(snap.key, deadline);
        }
    }

    store.init_timestamp.store(timestamp, Ordering::Release);
    tracing::info!(
        "adopted {} keys of '{}' from donor with timestamp {}",
        adopted,
        store.name(),
        timestamp
    );
}

/// The complete per-key state of this handle, regions by reference.
fn snapshot(store: &SharedStore) -> Vec<KeySnapshot> {
    store
        .bindings
        .iter()
        .map(|entry| KeySnapshot {
            key: entry.key().clone(),
            meta: entry.value().meta.clone(),
            data: entry.value().data.clone(),
            ttl: store.ttl.get(entry.key()).map(|deadline| *deadline),
        })
        .collect()
}
