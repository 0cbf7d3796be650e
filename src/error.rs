//! Error types for shmap
//!
//! Every failure is recovered at the public-method boundary and surfaced as
//! a neutral sentinel (`false`, `None`, empty list). The typed variants
//! exist so internal code can say precisely what went wrong before the
//! conversion happens.

use thiserror::Error;

/// Result type alias using StoreError
pub type Result<T> = std::result::Result<T, StoreError>;

/// Unified error type for store operations
#[derive(Debug, Error)]
pub enum StoreError {
    // -------------------------------------------------------------------------
    // Input Errors
    // -------------------------------------------------------------------------
    #[error("invalid key: must be a nonempty string of at most 512 characters")]
    InvalidKey,

    #[error("invalid value: the absent sentinel cannot be stored")]
    InvalidValue,

    // -------------------------------------------------------------------------
    // Concurrency Errors
    // -------------------------------------------------------------------------
    #[error("lock not acquired within {0} ms")]
    LockTimeout(u128),

    // -------------------------------------------------------------------------
    // Payload Errors
    // -------------------------------------------------------------------------
    #[error("payload length {len} out of range for region of {capacity} bytes")]
    BadPayload { len: usize, capacity: usize },

    #[error("decode failed: {0}")]
    Decode(String),

    // -------------------------------------------------------------------------
    // Pattern Errors
    // -------------------------------------------------------------------------
    #[error("pattern did not compile: {0}")]
    Pattern(#[from] regex::Error),
}
