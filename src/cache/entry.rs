//! Cache Entry Module
//!
//! Defines the type-erased entry stored for each key, with TTL support.

use std::any::{self, Any, TypeId};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Deadline used when `now + ttl` does not fit in an `Instant`.
const FAR_FUTURE: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

// == Cache Entry ==
/// A single stored value together with its concrete type and deadline.
#[derive(Clone)]
pub(crate) struct CacheEntry {
    /// The stored value, erased
    value: Arc<dyn Any + Send + Sync>,
    /// Type the value was stored as
    type_id: TypeId,
    /// Human readable form of `type_id`, for logs
    type_name: &'static str,
    /// Instant after which the entry is stale
    expires_at: Instant,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new entry expiring `ttl` from now.
    ///
    /// A zero TTL produces an entry that is already expired.
    pub fn new<T>(value: T, ttl: Duration) -> Self
    where
        T: Send + Sync + 'static,
    {
        let now = Instant::now();
        let expires_at = now
            .checked_add(ttl)
            .or_else(|| now.checked_add(FAR_FUTURE))
            .unwrap_or(now);

        Self::with_deadline(value, expires_at)
    }

    /// Creates a new entry with an absolute deadline.
    fn with_deadline<T>(value: T, expires_at: Instant) -> Self
    where
        T: Send + Sync + 'static,
    {
        Self {
            value: Arc::new(value),
            type_id: TypeId::of::<T>(),
            type_name: any::type_name::<T>(),
            expires_at,
        }
    }

    // == Type Check ==
    /// Returns true if the entry was stored as a `T`.
    pub fn is<T: 'static>(&self) -> bool {
        self.type_id == TypeId::of::<T>()
    }

    // == Typed Access ==
    /// Returns the stored value if it was stored as a `T`.
    ///
    /// The returned `Arc` shares the cache's copy.
    pub fn value<T>(&self) -> Option<Arc<T>>
    where
        T: Send + Sync + 'static,
    {
        if !self.is::<T>() {
            return None;
        }
        Arc::clone(&self.value).downcast::<T>().ok()
    }

    /// Name of the type the value was stored as.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    // == Is Expired ==
    /// Checks expiry against a given instant.
    ///
    /// Boundary condition: an entry whose deadline equals `now` is expired.
    /// It is only valid while `expires_at > now`.
    pub fn is_expired_at(&self, now: Instant) -> bool {
        self.expires_at <= now
    }

    /// Returns true if both handles point at the same stored value.
    pub fn same_value(&self, other: &CacheEntry) -> bool {
        Arc::ptr_eq(&self.value, &other.value)
    }
}

impl fmt::Debug for CacheEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheEntry")
            .field("type_name", &self.type_name)
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}
