//! Process-global broadcast bus.
//!
//! A registry keyed by store name. Each subscribed handle owns a
//! receiver; the registry holds the matching sender. Publishing walks the
//! peer set and pushes a clone of the message to everyone but the sender.

use super::protocol::{PeerId, StoreMessage};
use crossbeam::channel::{Receiver, Sender, unbounded};
use dashmap::DashMap;
use once_cell::sync::Lazy;
use std::sync::Arc;

type PeerSet = Arc<DashMap<PeerId, Sender<StoreMessage>>>;

static BUSES: Lazy<DashMap<String, PeerSet>> = Lazy::new(DashMap::new);

/// A live membership in a store's bus. Dropping the subscription does not
/// detach it; call [`unsubscribe`] so the registry releases the sender and
/// the listener drains out.
pub struct Subscription {
    pub peer: PeerId,
    pub rx: Receiver<StoreMessage>,
}

/// Join the bus for `store` under a fresh peer id.
pub fn subscribe(store: &str) -> Subscription {
    let peers = BUSES
        .entry(store.to_string())
        .or_insert_with(|| Arc::new(DashMap::new()))
        .clone();

    let (tx, rx) = unbounded();
    let peer = PeerId::new();
    peers.insert(peer.clone(), tx);

    tracing::debug!("peer {:?} subscribed to store '{}'", peer, store);
    Subscription { peer, rx }
}

/// Deliver `message` to every peer of `store` except `from`.
pub fn publish(store: &str, from: &PeerId, message: StoreMessage) {
    let Some(peers) = BUSES.get(store).map(|entry| entry.value().clone()) else {
        return;
    };

    for entry in peers.iter() {
        if entry.key() == from {
            continue;
        }
        if entry.value().send(message.clone()).is_err() {
            // Receiver already torn down; unsubscribe will reap it.
            tracing::warn!("dropped message for detached peer {:?}", entry.key());
        }
    }
}

/// Leave the bus. The registry drops the peer's sender, which ends the
/// peer's listener loop; the bus entry itself is reaped once empty.
pub fn unsubscribe(store: &str, peer: &PeerId) {
    if let Some(peers) = BUSES.get(store) {
        peers.remove(peer);
    }
    BUSES.remove_if(store, |_, peers| peers.is_empty());
    tracing::debug!("peer {:?} unsubscribed from store '{}'", peer, store);
}

/// Number of live peers on a store's bus (diagnostic).
pub fn peer_count(store: &str) -> usize {
    BUSES.get(store).map(|peers| peers.len()).unwrap_or(0)
}
