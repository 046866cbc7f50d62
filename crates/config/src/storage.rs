//! Storage layer configuration: retry and memoization.

use std::time::Duration;

use duration_str::{deserialize_duration, deserialize_option_duration};
use serde::Deserialize;

/// Retry and caching behaviour around database work.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    /// Retry policy for transient failures.
    pub retry: RetryConfig,
    /// Bounds for the memoized lookups.
    pub cache: CacheConfig,
}

/// Fixed-delay retry policy.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetryConfig {
    /// Total number of attempts, the first one included.
    pub attempts: u32,
    /// Pause between two attempts.
    #[serde(deserialize_with = "deserialize_duration")]
    pub delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            attempts: 3,
            delay: Duration::from_secs(2),
        }
    }
}

/// Memo cache bounds. Without any bound the cache grows for the lifetime of the process.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheConfig {
    /// Maximum number of cached entries.
    pub max_capacity: Option<u64>,
    /// How long an entry stays valid after being stored.
    #[serde(deserialize_with = "deserialize_option_duration")]
    pub time_to_live: Option<Duration>,
}

impl CacheConfig {
    /// True when neither a size nor a time bound is configured.
    pub fn is_unbounded(&self) -> bool {
        self.max_capacity.is_none() && self.time_to_live.is_none()
    }
}
