//! Cache Store Module
//!
//! Main cache engine: a type-erased HashMap with lazy TTL expiration and
//! get-or-set memoization.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};

use tracing::{debug, trace};

use crate::cache::{isolate, CacheEntry, Cacheable};
use crate::config::CacheConfig;
use crate::error::{CacheError, Result};

/// Handle shared by every consumer of one store.
pub type SharedCache = Arc<CacheStore>;

// == Cache Store ==
/// In-process cache keyed by string, holding values of any [`Cacheable`] type.
///
/// Each operation takes the lock on its own; nothing is atomic across
/// operations. In particular [`get_or_set`](Self::get_or_set) may run the
/// factory more than once for the same key under contention, and the last
/// write wins.
///
/// Expired entries are never swept. They stay in the map, invisible to reads,
/// until a read with the stored type evicts them or [`clear`](Self::clear)
/// drops everything.
#[derive(Debug)]
pub struct CacheStore {
    /// Key-value storage
    entries: RwLock<HashMap<String, CacheEntry>>,
    /// TTL for entries stored without an explicit one
    default_ttl: Duration,
}

impl CacheStore {
    // == Constructor ==
    /// Creates a new CacheStore with the given default TTL.
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            default_ttl,
        }
    }

    /// Creates a new CacheStore from configuration.
    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(config.default_ttl)
    }

    /// Returns the TTL used when none is given.
    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    // Every mutation is one map call, so a panic elsewhere cannot leave the
    // map half-updated and a poisoned lock is safe to reuse.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, CacheEntry>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, CacheEntry>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }

    // == Set ==
    /// Stores a copy of `value` under `key` with the default TTL.
    ///
    /// See [`set_with_ttl`](Self::set_with_ttl).
    pub fn set<T>(&self, key: impl Into<String>, value: &T) -> Result<()>
    where
        T: Cacheable,
    {
        self.set_with_ttl(key, value, self.default_ttl)
    }

    /// Stores a copy of `value` under `key`, expiring `ttl` from now.
    ///
    /// Any existing entry for the key is overwritten, whatever its type or
    /// deadline. A null value (`None`, `()`) is ignored and leaves the
    /// existing entry in place; wrappers such as `Some(None)` or unit structs
    /// are not null. A zero TTL is accepted; the entry is expired
    /// by the next read.
    ///
    /// # Errors
    /// Returns [`CacheError::Isolation`] if the value cannot be deep-copied
    /// intact (unserializable maps, non-finite floats, `Some(None)`).
    /// Nothing is stored in that case.
    pub fn set_with_ttl<T>(&self, key: impl Into<String>, value: &T, ttl: Duration) -> Result<()>
    where
        T: Cacheable,
    {
        let key = key.into();
        let Some(copy) = isolate::deep_copy(value)? else {
            debug!(key = %key, "Attempted to set null value");
            return Ok(());
        };

        let entry = CacheEntry::new(copy, ttl);
        trace!(
            key = %key,
            type_name = entry.type_name(),
            ttl_ms = ttl_millis(ttl),
            "Stored cache entry"
        );
        self.write().insert(key, entry);
        Ok(())
    }

    // == Try Get ==
    /// Retrieves the value stored under `key` as a `T`.
    ///
    /// Returns `None` if the key is absent, was stored as a different type,
    /// or has expired. An expired entry of type `T` is removed as a side
    /// effect; an entry of another type is left alone.
    ///
    /// The returned `Arc` shares the cache's own copy.
    pub fn try_get<T>(&self, key: &str) -> Option<Arc<T>>
    where
        T: Send + Sync + 'static,
    {
        let stale = {
            let entries = self.read();
            match entries.get(key) {
                Some(entry) if entry.is::<T>() => {
                    if !entry.is_expired_at(Instant::now()) {
                        debug!(key, "Cache hit");
                        return entry.value::<T>();
                    }
                    entry.clone()
                }
                _ => {
                    debug!(key, "Cache miss");
                    return None;
                }
            }
        };

        self.evict_stale(key, &stale);
        debug!(key, "Cache miss");
        None
    }

    /// Removes `stale` from the map unless `key` was rewritten meanwhile.
    fn evict_stale(&self, key: &str, stale: &CacheEntry) {
        let mut entries = self.write();
        if entries
            .get(key)
            .is_some_and(|current| current.same_value(stale))
        {
            entries.remove(key);
            trace!(key, "Evicted expired cache entry");
        }
    }

    // == Get Or Set ==
    /// Returns the value under `key`, computing and storing it on a miss.
    ///
    /// Uses the default TTL. See [`get_or_set_with_ttl`](Self::get_or_set_with_ttl).
    pub fn get_or_set<T, E, F>(&self, key: &str, factory: F) -> std::result::Result<Arc<T>, E>
    where
        T: Cacheable,
        E: From<CacheError>,
        F: FnOnce() -> std::result::Result<T, E>,
    {
        self.get_or_set_with_ttl(key, factory, self.default_ttl)
    }

    /// Returns the value under `key`, computing and storing it on a miss.
    ///
    /// On a miss `factory` runs exactly once and its value is returned. If it
    /// fails, the error is returned and nothing is stored.
    pub fn get_or_set_with_ttl<T, E, F>(
        &self,
        key: &str,
        factory: F,
        ttl: Duration,
    ) -> std::result::Result<Arc<T>, E>
    where
        T: Cacheable,
        E: From<CacheError>,
        F: FnOnce() -> std::result::Result<T, E>,
    {
        if let Some(hit) = self.try_get::<T>(key) {
            return Ok(hit);
        }

        let value = factory()?;
        self.set_with_ttl(key, &value, ttl)?;
        Ok(Arc::new(value))
    }

    /// Async variant of [`get_or_set`](Self::get_or_set).
    pub async fn get_or_set_async<T, E, F, Fut>(
        &self,
        key: &str,
        factory: F,
    ) -> std::result::Result<Arc<T>, E>
    where
        T: Cacheable,
        E: From<CacheError>,
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
    {
        self.get_or_set_async_with_ttl(key, factory, self.default_ttl)
            .await
    }

    /// Async variant of [`get_or_set_with_ttl`](Self::get_or_set_with_ttl).
    ///
    /// No lock is held while the factory runs. The store imposes no timeout:
    /// if the factory never completes, neither does this call.
    pub async fn get_or_set_async_with_ttl<T, E, F, Fut>(
        &self,
        key: &str,
        factory: F,
        ttl: Duration,
    ) -> std::result::Result<Arc<T>, E>
    where
        T: Cacheable,
        E: From<CacheError>,
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
    {
        if let Some(hit) = self.try_get::<T>(key) {
            return Ok(hit);
        }

        let value = factory().await?;
        self.set_with_ttl(key, &value, ttl)?;
        Ok(Arc::new(value))
    }

    // == Remove ==
    /// Removes the entry for `key`, returning whether one existed.
    pub fn remove(&self, key: &str) -> bool {
        let removed = self.write().remove(key).is_some();
        if removed {
            debug!(key, "Removed cache entry");
        } else {
            debug!(key, "No cache entry found");
        }
        removed
    }

    // == Clear ==
    /// Removes all entries.
    pub fn clear(&self) {
        self.write().clear();
        debug!("Cleared all cache entries");
    }

    // == Length ==
    /// Returns the number of entries in the map, including expired entries
    /// that have not been read since.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    // == Is Empty ==
    /// Returns true if the map holds no entries.
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }
}

/// TTL in whole milliseconds, saturating at `u64::MAX`.
fn ttl_millis(ttl: Duration) -> u64 {
    u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX)
}

impl Default for CacheStore {
    fn default() -> Self {
        Self::from_config(&CacheConfig::default())
    }
}
