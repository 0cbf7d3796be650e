//! Membership & Initialization Module
//!
//! The handshake that lets a newly constructed handle adopt the current
//! shared state without a designated master.
//!
//! ## Core Mechanisms
//! - **Announce**: a fresh handle broadcasts an initialization request
//!   stamped with its creation timestamp.
//! - **Donation**: every strictly-older peer answers with its own
//!   timestamp, its store-lock region, and its complete binding set.
//!   Regions travel by reference, so the newcomer ends up holding the
//!   exact same buffers.
//! - **Monotonic adoption**: a response is applied only when its
//!   timestamp is strictly older than the receiver's own, and applying it
//!   lowers the receiver's timestamp to the donor's. Racing newcomers
//!   therefore converge on the oldest responder's state, and duplicate
//!   responses are no-ops.
//!
//! No response means no older peer exists; the local (empty or not)
//! state stands.

pub mod service;

#[cfg(test)]
mod tests;

pub(crate) use service::{announce, handle_initialize_request, handle_initialize_response};
