//! Rate limiting configuration structures.

use duration_str::deserialize_duration;
use serde::Deserialize;
use std::time::Duration;

/// Sliding-window rate limiting for write requests, keyed by client address.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RateLimitConfig {
    /// Whether rate limiting is enabled.
    pub enabled: bool,
    /// Maximum number of admitted requests per key within the window.
    pub max_events: u32,
    /// Length of the trailing window.
    #[serde(deserialize_with = "deserialize_duration")]
    pub window: Duration,
    /// HTTP methods that count against the limit.
    pub methods: Vec<String>,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_events: 5,
            window: Duration::from_secs(60),
            methods: vec!["POST".to_string()],
        }
    }
}

impl RateLimitConfig {
    /// Whether requests with this method are throttled.
    pub fn applies_to(&self, method: &str) -> bool {
        self.methods.iter().any(|m| m.eq_ignore_ascii_case(method))
    }
}
