//! Store Module
//!
//! The per-thread handle over the shared binding set and the operations
//! the public API exposes.
//!
//! ## Core Concepts
//! - **Bindings**: each key maps to a (meta, data) region pair shared by
//!   every handle; mutations go through the pair's reader/writer lock.
//! - **Mirroring**: handles converge by applying each other's broadcasts;
//!   the message handlers are idempotent, so redundant deliveries are
//!   harmless.
//! - **Expiry**: a background reaper walks the TTL table in batches and
//!   evicts lapsed keys locally.
//!
//! ## Submodules
//! - **`handle`**: `SharedStore`, the handle type and public operations.
//! - **`options`**: knobs accepted by `set`.
//! - **`pattern`**: glob and regex-literal compilation for delete/list.
//! - **`handlers`**: application of incoming broadcast messages.
//! - **`reaper`**: the periodic TTL expiry task.

pub mod handle;
pub mod options;
pub mod pattern;

mod handlers;
mod reaper;


pub use handle::SharedStore;
pub use options::SetOptions;

use once_cell::sync::Lazy;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

static EPOCH: Lazy<Instant> = Lazy::new(Instant::now);

/// Monotonic milliseconds since the process first touched the store.
pub(crate) fn now_ms() -> u64 {
    EPOCH.elapsed().as_millis() as u64
}

/// Strictly increasing handle-creation timestamps (monotonic
/// microseconds). Two handles opened within the same instant still order
/// totally, which keeps "strictly older" well-defined for the
/// initialization handshake.
pub(crate) fn next_init_timestamp() -> u64 {
    static LAST: AtomicU64 = AtomicU64::new(0);

    let now = EPOCH.elapsed().as_micros() as u64;
    let mut last = LAST.load(Ordering::Relaxed);
    loop {
        let candidate = now.max(last + 1);
        match LAST.compare_exchange_weak(last, candidate, Ordering::Relaxed, Ordering::Relaxed) {
            Ok(_) => return candidate,
            Err(observed) => last = observed,
        }
    }
}
