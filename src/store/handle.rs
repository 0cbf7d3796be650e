//! The store handle and its public operations.

use super::options::SetOptions;
use super::{pattern, reaper};
use crate::channel::{self, PeerId, StoreMessage};
use crate::codec;
use crate::error::{Result, StoreError};
use crate::lock::RegionLock;
use crate::membership;
use crate::region::{Binding, DataRegion, MetaRegion};

use dashmap::DashMap;
use parking_lot::RwLock;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

/// Maximum key length in characters.
pub const MAX_KEY_LEN: usize = 512;

/// Reads use a shorter lock timeout than mutations: a reader blocked this
/// long is better served by an absent result than by stalling its thread.
const READ_LOCK_TIMEOUT: Duration = Duration::from_millis(100);

/// A per-thread handle onto a named store.
///
/// Every handle opened under the same name shares the same regions: any
/// thread may mutate any key and every other thread observes the result.
/// Handles converge through the broadcast channel (freshly allocated
/// regions, TTL changes, deletions) and through the initialization
/// handshake (late joiners adopt the oldest peer's state).
pub struct SharedStore {
    name: String,
    peer: PeerId,

    pub(crate) bindings: DashMap<String, Binding>,
    /// Key -> absolute expiry in monotonic milliseconds.
    pub(crate) ttl: DashMap<String, u64>,
    /// The store-wide lock gating changes to the key set. Swapped only by
    /// the initialization handshake, which is why it sits behind its own
    /// slot lock.
    pub(crate) store_lock: RwLock<Arc<RegionLock>>,
    /// Handle-creation instant; the initialization handshake lowers it to
    /// the donor's on adoption.
    pub(crate) init_timestamp: AtomicU64,

    lock_timeout: Duration,
    pub(crate) reap_cursor: AtomicUsize,
    closed: AtomicBool,
}

impl SharedStore {
    /// Open a handle onto the store named `name`.
    ///
    /// Subscribes to the store's channel, starts the listener and reaper
    /// threads, and asks any older peers to donate their state.
    pub fn open(name: &str) -> Arc<Self> {
        let subscription = channel::subscribe(name);

        let lock_timeout = env_ms("SHMAP_LOCK_TIMEOUT_MS", 1000);
        let reaper_interval = env_ms("SHMAP_REAPER_INTERVAL_MS", 1000);

        let store = Arc::new(Self {
            name: name.to_string(),
            peer: subscription.peer.clone(),
            bindings: DashMap::new(),
            ttl: DashMap::new(),
            store_lock: RwLock::new(Arc::new(RegionLock::new())),
            init_timestamp: AtomicU64::new(super::next_init_timestamp()),
            lock_timeout,
            reap_cursor: AtomicUsize::new(0),
            closed: AtomicBool::new(false),
        });

        super::handlers::spawn_listener(&store, subscription);
        reaper::spawn(&store, reaper_interval);
        membership::announce(&store);

        tracing::info!("store '{}' opened as peer {:?}", name, store.peer);
        store
    }

    /// The store name this handle is bound to.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn peer(&self) -> &PeerId {
        &self.peer
    }

    pub(crate) fn closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    // -------------------------------------------------------------------------
    // Writes
    // -------------------------------------------------------------------------

    /// Store `value` under `key` with default options.
    pub fn set<T: Serialize>(&self, key: &str, value: &T) -> bool {
        self.set_with(key, value, SetOptions::default())
    }

    /// Store `value` under `key`.
    ///
    /// Returns `false` when the key is invalid, the value is the absent
    /// sentinel, or a lock times out; a timeout leaves nothing partially
    /// published.
    pub fn set_with<T: Serialize>(&self, key: &str, value: &T, options: SetOptions) -> bool {
        let value = match serde_json::to_value(value) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!("set '{}' rejected unserializable value: {}", key, e);
                return false;
            }
        };
        self.set_value(key, &value, &options)
    }

    /// Core write path over an already-serialized value.
    pub fn set_value(&self, key: &str, value: &Value, options: &SetOptions) -> bool {
        if self.closed() {
            return false;
        }
        match self.try_set(key, value, options) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("set '{}' failed: {}", key, e);
                false
            }
        }
    }

    fn try_set(&self, key: &str, value: &Value, options: &SetOptions) -> Result<()> {
        if !valid_key(key) {
            return Err(StoreError::InvalidKey);
        }
        if value.is_null() {
            return Err(StoreError::InvalidValue);
        }

        let payload = codec::pack(value)?;
        let required = options.min_buffer_size.max(payload.len());

        // Clone the pair out so no map guard is held across lock waits.
        let existing = self.bindings.get(key).map(|entry| entry.value().clone());

        let locked = match &existing {
            Some(binding) if !options.skip_lock => {
                if !binding.meta.lock().acquire_exclusive(self.lock_timeout) {
                    return Err(StoreError::LockTimeout(self.lock_timeout.as_millis()));
                }
                true
            }
            _ => false,
        };

        let expiry = options
            .ttl
            .filter(|secs| *secs > 0)
            .map(|secs| super::now_ms() + secs * 1000);

        if let Some(binding) = &existing
            && !options.immutable
            && binding.data.byte_len() >= required
        {
            // TTL bookkeeping happens under the key lock so it
            // serializes with competing writers of the same key.
            let ttl_changed = self.apply_ttl(key, expiry);

            // In place: the regions every peer already holds get the new
            // payload directly, no rebroadcast needed.
            // SAFETY: we hold the exclusive lock (or the caller does via
            // skip_lock) and payload fits the region.
            unsafe { binding.data.write(&payload) };
            binding.meta.set_payload_len(payload.len());

            if ttl_changed {
                channel::publish(
                    &self.name,
                    &self.peer,
                    StoreMessage::TtlSet {
                        key: key.to_string(),
                        ttl: expiry,
                    },
                );
            }
            if locked {
                binding.meta.lock().release_exclusive();
            }
            tracing::debug!("set '{}' in place ({} bytes)", key, payload.len());
            return Ok(());
        }

        // Reallocation: populate a private pair, then install and
        // broadcast it under the store lock. Acquisition order is fixed:
        // key lock (already held above), store lock second.
        let meta = Arc::new(MetaRegion::new());
        let data = Arc::new(DataRegion::new(required));
        // SAFETY: the pair is private until installed below.
        unsafe { data.write(&payload) };
        meta.set_payload_len(payload.len());

        let store_lock = self.store_lock.read().clone();
        if !store_lock.acquire_exclusive(self.lock_timeout) {
            // Abort with nothing mutated: the TTL table has not been
            // touched yet on this path.
            if locked && let Some(binding) = &existing {
                binding.meta.lock().release_exclusive();
            }
            return Err(StoreError::LockTimeout(self.lock_timeout.as_millis()));
        }

        self.apply_ttl(key, expiry);
        self.bindings
            .insert(key.to_string(), Binding::new(meta.clone(), data.clone()));
        channel::publish(
            &self.name,
            &self.peer,
            StoreMessage::Set {
                key: key.to_string(),
                meta,
                data,
                ttl: expiry,
            },
        );
        store_lock.release_exclusive();

        if locked && let Some(binding) = &existing {
            binding.meta.lock().release_exclusive();
        }
        tracing::debug!(
            "set '{}' reallocated ({} bytes in a {} byte region)",
            key,
            payload.len(),
            required
        );
        Ok(())
    }

    /// Record or clear the key's expiry. Returns whether the TTL table
    /// changed, so the in-place path knows to mirror it to peers.
    fn apply_ttl(&self, key: &str, expiry: Option<u64>) -> bool {
        match expiry {
            Some(deadline) => {
                self.ttl.insert(key.to_string(), deadline);
                true
            }
            None => self.ttl.remove(key).is_some(),
        }
    }

    // -------------------------------------------------------------------------
    // Reads
    // -------------------------------------------------------------------------

    /// Read the value under `key`, or `None` if absent.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.get_with(key, false)
    }

    /// Read with explicit lock control. `skip_lock` is for callers that
    /// already hold the key's lock through [`lock`](Self::lock).
    pub fn get_with(&self, key: &str, skip_lock: bool) -> Option<Value> {
        if self.closed() {
            return None;
        }
        match self.try_get(key, skip_lock) {
            Ok(value) => value,
            Err(e) => {
                tracing::debug!("get '{}' -> absent: {}", key, e);
                None
            }
        }
    }

    /// Read and decode into a concrete type. Decode mismatches read as
    /// absent, like every other failure.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.get(key)
            .and_then(|value| serde_json::from_value(value).ok())
    }

    fn try_get(&self, key: &str, skip_lock: bool) -> Result<Option<Value>> {
        if !valid_key(key) {
            return Err(StoreError::InvalidKey);
        }

        let Some(binding) = self.bindings.get(key).map(|entry| entry.value().clone()) else {
            return Ok(None);
        };

        if !skip_lock && !binding.meta.lock().acquire_shared(READ_LOCK_TIMEOUT) {
            return Err(StoreError::LockTimeout(READ_LOCK_TIMEOUT.as_millis()));
        }

        let len = binding.meta.payload_len();
        if len == 0 || len > binding.data.byte_len() {
            // Mid-write or inconsistent; the binding stays, the read
            // reports absent.
            if !skip_lock {
                binding.meta.lock().release_shared();
            }
            return Err(StoreError::BadPayload {
                len,
                capacity: binding.data.byte_len(),
            });
        }

        // Copy out before decoding: once the lock drops, another thread
        // may replace the regions under us.
        // SAFETY: shared lock held (or the caller holds the exclusive
        // lock via skip_lock) and len was validated against capacity.
        let bytes = unsafe { binding.data.read(len) };
        if !skip_lock {
            binding.meta.lock().release_shared();
        }

        let value = codec::unpack(&bytes)?;
        if value.is_null() {
            return Ok(None);
        }
        Ok(Some(value))
    }

    // -------------------------------------------------------------------------
    // Deletes
    // -------------------------------------------------------------------------

    /// Remove `key`, or every match when `key` is a pattern. Returns
    /// whether anything was removed.
    pub fn delete(&self, key: &str) -> bool {
        if self.closed() {
            return false;
        }
        if pattern::is_pattern(key) {
            return self.delete_pattern(key);
        }
        match self.try_delete(key) {
            Ok(removed) => removed,
            Err(e) => {
                tracing::warn!("delete '{}' failed: {}", key, e);
                false
            }
        }
    }

    fn try_delete(&self, key: &str) -> Result<bool> {
        if !valid_key(key) {
            return Err(StoreError::InvalidKey);
        }

        let Some(binding) = self.bindings.get(key).map(|entry| entry.value().clone()) else {
            return Ok(false);
        };

        if !binding.meta.lock().acquire_exclusive(self.lock_timeout) {
            return Err(StoreError::LockTimeout(self.lock_timeout.as_millis()));
        }

        let store_lock = self.store_lock.read().clone();
        if !store_lock.acquire_exclusive(self.lock_timeout) {
            binding.meta.lock().release_exclusive();
            return Err(StoreError::LockTimeout(self.lock_timeout.as_millis()));
        }

        self.bindings.remove(key);
        self.ttl.remove(key);
        channel::publish(
            &self.name,
            &self.peer,
            StoreMessage::Delete {
                key: key.to_string(),
            },
        );

        store_lock.release_exclusive();
        binding.meta.lock().release_exclusive();

        tracing::debug!("deleted '{}'", key);
        Ok(true)
    }

    /// Remove every key matching `pat`. Contended keys are skipped:
    /// waiting on a key lock while holding the store lock would invert
    /// the acquisition order writers use.
    pub fn delete_pattern(&self, pat: &str) -> bool {
        if self.closed() {
            return false;
        }
        match self.try_delete_pattern(pat) {
            Ok(removed) => removed,
            Err(e) => {
                tracing::warn!("pattern delete '{}' failed: {}", pat, e);
                false
            }
        }
    }

    fn try_delete_pattern(&self, pat: &str) -> Result<bool> {
        let re = pattern::compile(pat)?;

        let store_lock = self.store_lock.read().clone();
        if !store_lock.acquire_exclusive(self.lock_timeout) {
            return Err(StoreError::LockTimeout(self.lock_timeout.as_millis()));
        }

        let matches: Vec<(String, Binding)> = self
            .bindings
            .iter()
            .filter(|entry| re.is_match(entry.key()))
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();

        let mut removed = false;
        for (key, binding) in matches {
            if !binding.meta.lock().try_acquire_exclusive() {
                tracing::debug!("pattern delete skipping contended key '{}'", key);
                continue;
            }
            self.bindings.remove(&key);
            self.ttl.remove(&key);
            binding.meta.lock().release_exclusive();
            removed = true;
        }

        if removed {
            channel::publish(
                &self.name,
                &self.peer,
                StoreMessage::DeletePattern {
                    pattern: pat.to_string(),
                },
            );
        }
        store_lock.release_exclusive();

        tracing::debug!("pattern delete '{}' removed anything: {}", pat, removed);
        Ok(removed)
    }

    // -------------------------------------------------------------------------
    // Introspection
    // -------------------------------------------------------------------------

    /// Snapshot of current keys, optionally filtered by a pattern. An
    /// invalid pattern yields an empty list.
    pub fn list_keys(&self, pat: Option<&str>) -> Vec<String> {
        let Some(pat) = pat else {
            return self.bindings.iter().map(|entry| entry.key().clone()).collect();
        };
        match pattern::compile(pat) {
            Ok(re) => self
                .bindings
                .iter()
                .map(|entry| entry.key().clone())
                .filter(|key| re.is_match(key))
                .collect(),
            Err(e) => {
                tracing::warn!("list_keys pattern '{}' failed: {}", pat, e);
                Vec::new()
            }
        }
    }

    // -------------------------------------------------------------------------
    // External locking
    // -------------------------------------------------------------------------

    /// Take the key's exclusive lock on behalf of the caller. Pair with
    /// [`release`](Self::release); `set`/`get` calls in between should
    /// pass `skip_lock`.
    pub fn lock(&self, key: &str, timeout: Option<Duration>) -> bool {
        if self.closed() || !valid_key(key) {
            return false;
        }
        let Some(binding) = self.bindings.get(key).map(|entry| entry.value().clone()) else {
            return false;
        };
        binding
            .meta
            .lock()
            .acquire_exclusive(timeout.unwrap_or(self.lock_timeout))
    }

    /// Release a key lock taken through [`lock`](Self::lock).
    pub fn release(&self, key: &str) -> bool {
        let Some(binding) = self.bindings.get(key).map(|entry| entry.value().clone()) else {
            return false;
        };
        binding.meta.lock().release_exclusive();
        true
    }

    // -------------------------------------------------------------------------
    // Lifecycle
    // -------------------------------------------------------------------------

    /// Drop every binding on every handle. The store lock is best
    /// effort: a timeout clears locally (and broadcasts) anyway.
    pub fn clear(&self) {
        if self.closed() {
            return;
        }

        let store_lock = self.store_lock.read().clone();
        let held = store_lock.acquire_exclusive(self.lock_timeout);
        if !held {
            tracing::warn!("clearing '{}' without the store lock", self.name);
        }

        self.bindings.clear();
        self.ttl.clear();
        channel::publish(&self.name, &self.peer, StoreMessage::Clear);

        if held {
            store_lock.release_exclusive();
        }
        tracing::debug!("cleared '{}'", self.name);
    }

    /// Detach this handle: stop the reaper, leave the channel, drop the
    /// local maps. Other peers are unaffected. Idempotent.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        channel::unsubscribe(&self.name, &self.peer);
        self.bindings.clear();
        self.ttl.clear();
        tracing::info!("store '{}' closed by peer {:?}", self.name, self.peer);
    }
}

pub(crate) fn valid_key(key: &str) -> bool {
    !key.is_empty() && key.chars().count() <= MAX_KEY_LEN
}

fn env_ms(name: &str, default_ms: u64) -> Duration {
    let ms = std::env::var(name)
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .unwrap_or(default_ms);
    Duration::from_millis(ms)
}
