//! Shared byte region holding a serialized value.

use std::cell::UnsafeCell;

/// A fixed-capacity byte region shared by every handle of a store.
///
/// The region itself carries no synchronization: all access goes through
/// the paired [`MetaRegion`](super::MetaRegion) lock. Bytes past the
/// published payload length are undefined.
pub struct DataRegion {
    capacity: usize,
    bytes: UnsafeCell<Box<[u8]>>,
}

// SAFETY: DataRegion is shared across threads behind an Arc. Every write
// happens under the paired meta region's exclusive lock and every read
// under at least its shared lock, so no two threads touch the bytes
// unsynchronized. The capacity field is immutable after construction.
unsafe impl Send for DataRegion {}
unsafe impl Sync for DataRegion {}

impl DataRegion {
    /// Allocate a zeroed region of `capacity` bytes.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            bytes: UnsafeCell::new(vec![0u8; capacity].into_boxed_slice()),
        }
    }

    /// Fixed byte capacity chosen at allocation time.
    pub fn byte_len(&self) -> usize {
        self.capacity
    }

    /// Copy `payload` into the front of the region.
    ///
    /// # Safety
    ///
    /// The caller must hold the paired meta region's exclusive lock and
    /// `payload.len()` must not exceed [`byte_len`](Self::byte_len).
    pub unsafe fn write(&self, payload: &[u8]) {
        let bytes = unsafe { &mut *self.bytes.get() };
        bytes[..payload.len()].copy_from_slice(payload);
    }

    /// Copy the first `len` bytes out of the region.
    ///
    /// The copy is mandatory: it decouples the decoder from a region that
    /// another thread may replace right after the lock is released.
    ///
    /// # Safety
    ///
    /// The caller must hold at least the paired meta region's shared lock
    /// and `len` must not exceed [`byte_len`](Self::byte_len).
    pub unsafe fn read(&self, len: usize) -> Vec<u8> {
        let bytes = unsafe { &*self.bytes.get() };
        bytes[..len].to_vec()
    }
}

impl std::fmt::Debug for DataRegion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataRegion")
            .field("capacity", &self.capacity)
            .finish()
    }
}
