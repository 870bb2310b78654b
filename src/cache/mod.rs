//! Cache Module
//!
//! Provides an in-process, type-erased cache with lazy TTL expiration.

mod entry;
mod isolate;
mod store;


// Re-export public types
pub(crate) use entry::CacheEntry;
pub use isolate::Cacheable;
pub use store::{CacheStore, SharedCache};

// == Public Constants ==
/// TTL used when no default is configured
pub const DEFAULT_TTL: std::time::Duration = std::time::Duration::from_secs(60);
