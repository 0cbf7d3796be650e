//! Options accepted by `set`.

/// Per-call knobs for [`SharedStore::set_with`](super::SharedStore::set_with).
#[derive(Debug, Clone, Default)]
pub struct SetOptions {
    /// Force reallocation even when the existing region has room. The
    /// old regions keep serving concurrent readers until they drop their
    /// handles.
    pub immutable: bool,

    /// Capacity floor for a freshly allocated data region, in bytes.
    /// Oversizing up front lets later overwrites reuse the region in
    /// place instead of reallocating and rebroadcasting.
    pub min_buffer_size: usize,

    /// Time to live in seconds. The key expires once the reaper catches
    /// up after the deadline. Zero or absent means no expiry; setting a
    /// value without a TTL clears any previous one.
    pub ttl: Option<u64>,

    /// The caller already holds the key's exclusive lock (taken through
    /// [`SharedStore::lock`](super::SharedStore::lock)).
    pub skip_lock: bool,
}
