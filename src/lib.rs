//! Mini Cache - An in-process key-value cache with per-entry TTL
//!
//! Values of any serializable type are stored behind a string key, deep-copied
//! on the way in and expired lazily on read. [`CacheStore::get_or_set`] and
//! [`CacheStore::get_or_set_async`] memoize expensive computations.
//!
//! ```
//! use std::sync::Arc;
//! use std::time::Duration;
//! use mini_cache::{CacheConfig, CacheStore};
//!
//! let cache = Arc::new(CacheStore::from_config(&CacheConfig::default()));
//!
//! cache.set_with_ttl("answer", &42u32, Duration::from_secs(5))?;
//! assert_eq!(cache.try_get::<u32>("answer").as_deref(), Some(&42));
//!
//! // Another type under the same key is a miss, not an error
//! assert!(cache.try_get::<String>("answer").is_none());
//!
//! let greeting = cache.get_or_set("greeting", || -> mini_cache::error::Result<String> {
//!     Ok("hello".to_string())
//! })?;
//! assert_eq!(*greeting, "hello");
//! # Ok::<(), mini_cache::CacheError>(())
//! ```

pub mod cache;
pub mod config;
pub mod error;

pub use cache::{CacheStore, Cacheable, SharedCache};
pub use config::CacheConfig;
pub use error::CacheError;
