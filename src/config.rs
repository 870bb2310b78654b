//! Configuration Module
//!
//! Resolves the cache's default TTL from the environment.

use std::env;
use std::time::Duration;

use tracing::{error, warn};

use crate::cache::DEFAULT_TTL;

/// Environment variable holding the default TTL in milliseconds.
pub const DEFAULT_EXPIRATION_VAR: &str = "CACHE_DEFAULT_EXPIRATION";

/// Cache configuration parameters.
///
/// Resolution never fails: anything missing or unusable falls back to
/// [`DEFAULT_TTL`] and is logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    /// TTL applied when a caller does not pass one explicitly
    pub default_ttl: Duration,
}

impl CacheConfig {
    /// Creates a config with an explicit default TTL.
    pub fn new(default_ttl: Duration) -> Self {
        Self { default_ttl }
    }

    /// Creates a new CacheConfig by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_DEFAULT_EXPIRATION` - Default TTL in milliseconds (default: 60000)
    pub fn from_env() -> Self {
        Self::from_millis_str(env::var(DEFAULT_EXPIRATION_VAR).ok().as_deref())
    }

    /// Resolves the default TTL from a raw millisecond setting.
    ///
    /// Negative values are rejected since a `Duration` cannot represent them.
    pub fn from_millis_str(raw: Option<&str>) -> Self {
        let Some(raw) = raw else {
            warn!(
                "{} not set, using default of {}ms",
                DEFAULT_EXPIRATION_VAR,
                DEFAULT_TTL.as_millis()
            );
            return Self::default();
        };

        match raw.trim().parse::<i64>() {
            Ok(ms) if ms < 0 => {
                error!(value = ms, "Could not load {}: negative value", DEFAULT_EXPIRATION_VAR);
                Self::default()
            }
            Ok(ms) => {
                if ms == 0 {
                    warn!("{} is 0, every entry will expire immediately", DEFAULT_EXPIRATION_VAR);
                }
                Self::new(Duration::from_millis(ms.unsigned_abs()))
            }
            Err(e) => {
                error!(value = raw, error = %e, "Could not load {}", DEFAULT_EXPIRATION_VAR);
                Self::default()
            }
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl: DEFAULT_TTL,
        }
    }
}
