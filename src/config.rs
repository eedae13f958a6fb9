//! Configuration Module
//!
//! Handles cache construction parameters, with defaults and environment overrides.

use std::env;
use std::time::Duration;

use crate::cache::DEFAULT_SHARD_COUNT;
use crate::error::{CacheError, Result};

/// Cache construction parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Approximate total number of entries the cache can hold
    pub capacity: usize,
    /// Number of independently locked shards
    pub shard_count: usize,
    /// Default sliding TTL, None = no expiration
    pub ttl: Option<Duration>,
}

impl CacheConfig {
    /// Creates a new CacheConfig by loading values from environment variables.
    ///
    /// Unset or unparsable variables fall back to the defaults.
    ///
    /// # Environment Variables
    /// - `LRU_CAPACITY` - Total capacity (default: 10000)
    /// - `LRU_SHARDS` - Shard count (default: 64)
    /// - `LRU_TTL_MS` - Default TTL in milliseconds, 0 disables expiration (default: 0)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            capacity: env::var("LRU_CAPACITY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.capacity),
            shard_count: env::var("LRU_SHARDS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.shard_count),
            ttl: env::var("LRU_TTL_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(ttl_from_millis)
                .unwrap_or(defaults.ttl),
        }
    }

    /// Like [`CacheConfig::from_env`], but reports unparsable values instead
    /// of silently using defaults.
    pub fn try_from_env() -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            capacity: parse_var("LRU_CAPACITY")?.unwrap_or(defaults.capacity),
            shard_count: parse_var("LRU_SHARDS")?.unwrap_or(defaults.shard_count),
            ttl: parse_var("LRU_TTL_MS")?
                .map(ttl_from_millis)
                .unwrap_or(defaults.ttl),
        })
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: 10_000,
            shard_count: DEFAULT_SHARD_COUNT,
            ttl: None,
        }
    }
}

fn ttl_from_millis(ms: u64) -> Option<Duration> {
    (ms > 0).then(|| Duration::from_millis(ms))
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Result<Option<T>> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| CacheError::InvalidConfig(format!("{}={:?} is not a number", name, raw))),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = CacheConfig::default();
        assert_eq!(config.capacity, 10_000);
        assert_eq!(config.shard_count, DEFAULT_SHARD_COUNT);
        assert_eq!(config.ttl, None);
    }

    #[test]
    fn test_ttl_from_millis() {
        assert_eq!(ttl_from_millis(0), None);
        assert_eq!(ttl_from_millis(250), Some(Duration::from_millis(250)));
    }

    // Env vars are process-global, so everything touching them lives in one test.
    #[test]
    fn test_config_env_overrides() {
        env::remove_var("LRU_CAPACITY");
        env::remove_var("LRU_SHARDS");
        env::remove_var("LRU_TTL_MS");
        assert_eq!(CacheConfig::from_env(), CacheConfig::default());

        env::set_var("LRU_CAPACITY", "500");
        env::set_var("LRU_SHARDS", "8");
        env::set_var("LRU_TTL_MS", "1500");
        let config = CacheConfig::try_from_env().unwrap();
        assert_eq!(config.capacity, 500);
        assert_eq!(config.shard_count, 8);
        assert_eq!(config.ttl, Some(Duration::from_millis(1500)));

        env::set_var("LRU_SHARDS", "many");
        assert!(matches!(
            CacheConfig::try_from_env(),
            Err(CacheError::InvalidConfig(_))
        ));
        assert_eq!(CacheConfig::from_env().shard_count, DEFAULT_SHARD_COUNT);

        env::remove_var("LRU_CAPACITY");
        env::remove_var("LRU_SHARDS");
        env::remove_var("LRU_TTL_MS");
    }
}
