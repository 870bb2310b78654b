//! Error types for the cache
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Cache Error Enum ==
/// Errors raised by the cache itself.
///
/// Misses (absent key, type mismatch, expired entry) are never errors; they
/// are reported as `None` by [`CacheStore::try_get`](crate::cache::CacheStore::try_get).
/// Factory failures stay in the caller's own error type.
#[derive(Error, Debug)]
pub enum CacheError {
    /// The value could not be deep-copied into the cache
    #[error("Value isolation failed: {0}")]
    Isolation(#[from] serde_json::Error),
}

// == Result Type Alias ==
/// Convenience Result type for cache operations.
pub type Result<T> = std::result::Result<T, CacheError>;
