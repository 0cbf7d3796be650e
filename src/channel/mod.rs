//! Broadcast Channel Module
//!
//! The named in-process bus tying all handles of a store together. Every
//! handle with the same store name receives every message published by any
//! other handle with that name; the publisher's own subscription is
//! skipped.
//!
//! ## Core Concepts
//! - **By-reference transport**: messages carry shared-region handles as
//!   `Arc` clones, so peers share the same underlying bytes, never copies.
//! - **Best-effort, unordered delivery**: handlers are idempotent, so
//!   redundant or out-of-order deliveries are harmless.
//!
//! ## Submodules
//! - **`protocol`**: the typed message schema.
//! - **`bus`**: the process-global registry of subscriptions.

pub mod bus;
pub mod protocol;


pub use bus::{Subscription, publish, subscribe, unsubscribe};
pub use protocol::{KeySnapshot, PeerId, StoreMessage};
