//! Broadcast message application.
//!
//! Every handle runs a listener thread that drains its channel
//! subscription and mirrors peer mutations into the local maps. Handlers
//! are idempotent: re-installing the same region pair is a no-op and
//! deletes are set differences, so redundant or out-of-order deliveries
//! cannot corrupt state.

use super::handle::SharedStore;
use super::pattern;
use crate::channel::{StoreMessage, Subscription};
use crate::membership;
use crate::region::{Binding, DataRegion, MetaRegion};
use std::sync::Arc;

/// Start the listener thread for a freshly opened handle.
///
/// The thread holds only a weak reference: it exits when the handle is
/// dropped or when `close` unsubscribes and the channel disconnects.
pub(crate) fn spawn_listener(store: &Arc<SharedStore>, subscription: Subscription) {
    let weak = Arc::downgrade(store);
    let rx = subscription.rx;

    std::thread::spawn(move || {
        while let Ok(message) = rx.recv() {
            let Some(store) = weak.upgrade() else {
                break;
            };
            store.apply_message(message);
        }
        tracing::debug!("listener loop ended");
    });
}

impl SharedStore {
    pub(crate) fn apply_message(&self, message: StoreMessage) {
        if self.closed() {
            return;
        }
        match message {
            StoreMessage::Set {
                key,
                meta,
                data,
                ttl,
            } => self.apply_set(key, meta, data, ttl),

            StoreMessage::TtlSet { key, ttl } => self.apply_ttl_set(key, ttl),

            StoreMessage::Delete { key } => self.apply_delete(&key),

            StoreMessage::DeletePattern { pattern } => self.apply_delete_pattern(&pattern),

            StoreMessage::Clear => self.apply_clear(),

            StoreMessage::InitializeRequest { timestamp } => {
                membership::handle_initialize_request(self, timestamp);
            }

            StoreMessage::InitializeResponse {
                timestamp,
                store_lock,
                keys,
            } => {
                membership::handle_initialize_response(self, timestamp, store_lock, keys);
            }
        }
    }

    fn apply_set(&self, key: String, meta: Arc<MetaRegion>, data: Arc<DataRegion>, ttl: Option<u64>) {
        tracing::debug!("mirroring set of '{}'", key);
        self.bindings.insert(key.clone(), Binding::new(meta, data));
        match ttl {
            Some(deadline) => {
                self.ttl.insert(key, deadline);
            }
            None => {
                self.ttl.remove(&key);
            }
        }
    }

    fn apply_ttl_set(&self, key: String, ttl: Option<u64>) {
        match ttl {
            Some(deadline) => {
                self.ttl.insert(key, deadline);
            }
            None => {
                self.ttl.remove(&key);
            }
        }
    }

    fn apply_delete(&self, key: &str) {
        self.bindings.remove(key);
        self.ttl.remove(key);
        tracing::debug!("mirrored delete of '{}'", key);
    }

    fn apply_delete_pattern(&self, pat: &str) {
        match pattern::compile(pat) {
            Ok(re) => {
                self.bindings.retain(|key, _| !re.is_match(key));
                self.ttl.retain(|key, _| !re.is_match(key));
                tracing::debug!("mirrored pattern delete '{}'", pat);
            }
            Err(e) => {
                // The sender compiled it, so this peer should too.
                tracing::warn!("mirrored pattern '{}' did not compile: {}", pat, e);
            }
        }
    }

    fn apply_clear(&self) {
        self.bindings.clear();
        self.ttl.clear();
        tracing::debug!("mirrored clear");
    }
}
