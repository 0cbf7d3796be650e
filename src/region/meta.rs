//! Per-key control block.

use crate::lock::RegionLock;
use std::sync::atomic::{AtomicU32, Ordering};

/// The metadata region paired with every data region.
///
/// ```text
/// Word    Field
/// 0       readers count (via RegionLock)
/// 1       writer flag   (via RegionLock)
/// 2       payload length in bytes
/// ```
///
/// The payload length is only meaningful under the region's lock: writers
/// store it with Release after the payload bytes land, readers load it
/// with Acquire while holding at least a shared lock, so a reader never
/// pairs a stale length with fresh bytes or vice versa.
#[repr(C)]
pub struct MetaRegion {
    lock: RegionLock,
    len: AtomicU32,
}

impl MetaRegion {
    pub fn new() -> Self {
        Self {
            lock: RegionLock::new(),
            len: AtomicU32::new(0),
        }
    }

    /// The reader/writer lock gating this key's payload.
    pub fn lock(&self) -> &RegionLock {
        &self.lock
    }

    /// Payload length in bytes as last published.
    pub fn payload_len(&self) -> usize {
        self.len.load(Ordering::Acquire) as usize
    }

    /// Publish a new payload length. Caller holds the exclusive lock and
    /// has already written the payload bytes.
    pub fn set_payload_len(&self, len: usize) {
        self.len.store(len as u32, Ordering::Release);
    }
}

impl Default for MetaRegion {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MetaRegion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetaRegion")
            .field("readers", &self.lock.readers())
            .field("writer", &self.lock.writer_held())
            .field("payload_len", &self.payload_len())
            .finish()
    }
}
