//! Shared Regions Module
//!
//! The byte-level building blocks every handle of a store shares:
//!
//! - **`MetaRegion`**: the per-key control block (lock words plus the
//!   payload length).
//! - **`DataRegion`**: the fixed-capacity byte region holding the
//!   serialized value.
//! - **`Binding`**: the (meta, data) pair installed under a key. The two
//!   are co-installed and co-evicted; they never change partner.
//!
//! Regions are handed around as `Arc`s: a broadcast transports the same
//! underlying bytes, never a copy, and identity (`Arc::ptr_eq`) is what
//! peers converge on.

pub mod data;
pub mod meta;

#[cfg(test)]
mod tests;

pub use data::DataRegion;
pub use meta::MetaRegion;

use std::sync::Arc;

/// The pair of shared regions backing one key.
#[derive(Clone)]
pub struct Binding {
    pub meta: Arc<MetaRegion>,
    pub data: Arc<DataRegion>,
}

impl Binding {
    pub fn new(meta: Arc<MetaRegion>, data: Arc<DataRegion>) -> Self {
        Self { meta, data }
    }

    /// Whether both regions are the very same allocations as `other`'s.
    pub fn same_regions(&self, other: &Binding) -> bool {
        Arc::ptr_eq(&self.meta, &other.meta) && Arc::ptr_eq(&self.data, &other.data)
    }
}

impl std::fmt::Debug for Binding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Binding")
            .field("payload_len", &self.meta.payload_len())
            .field("capacity", &self.data.byte_len())
            .finish()
    }
}
