//! Store Channel Protocol
//!
//! The message schema delivered over the broadcast bus. Everything a peer
//! needs to mirror a mutation travels in the message itself; region
//! handles are `Arc` clones, so installing a received binding shares the
//! exact same bytes as the sender.

use crate::lock::RegionLock;
use crate::region::{DataRegion, MetaRegion};
use std::sync::Arc;

/// Unique identifier for a subscribed handle.
/// Wrapper around a UUID string to ensure uniqueness across handles.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PeerId(pub String);

impl PeerId {
    /// Generates a new random UUID v4-based PeerId.
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl Default for PeerId {
    fn default() -> Self {
        Self::new()
    }
}

/// One key's worth of state in an initialization handoff.
#[derive(Debug, Clone)]
pub struct KeySnapshot {
    /// The data key.
    pub key: String,
    /// The key's control block.
    pub meta: Arc<MetaRegion>,
    /// The key's payload region.
    pub data: Arc<DataRegion>,
    /// Absolute expiry in monotonic milliseconds, if the key has a TTL.
    pub ttl: Option<u64>,
}

/// The wire protocol between handles of the same store.
#[derive(Debug, Clone)]
pub enum StoreMessage {
    /// A key got a freshly allocated region pair. Receivers install the
    /// pair (and the TTL, if any) into their local maps.
    Set {
        key: String,
        meta: Arc<MetaRegion>,
        data: Arc<DataRegion>,
        /// Absolute expiry in monotonic milliseconds.
        ttl: Option<u64>,
    },

    /// A key's TTL changed without a reallocation. `None` clears it.
    TtlSet { key: String, ttl: Option<u64> },

    /// A single key was removed.
    Delete { key: String },

    /// Every key matching the pattern was removed on the sender;
    /// receivers apply the same set difference locally.
    DeletePattern { pattern: String },

    /// The whole binding set was dropped.
    Clear,

    /// A newly constructed handle asks older peers to donate state.
    InitializeRequest { timestamp: u64 },

    /// An older peer's donation: its store-lock region identity and the
    /// complete binding set. Applied only by peers whose own
    /// `init_timestamp` is strictly greater than `timestamp`.
    InitializeResponse {
        timestamp: u64,
        store_lock: Arc<RegionLock>,
        keys: Vec<KeySnapshot>,
    },
}
