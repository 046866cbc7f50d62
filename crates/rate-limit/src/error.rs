//! Error types for rate limiting.

use std::time::Duration;

/// Errors that can occur during rate limiting.
#[derive(Debug, thiserror::Error)]
pub enum RateLimitError {
    /// The key used up its allowance for the current window.
    #[error("Rate limit exceeded")]
    LimitExceeded {
        /// Time until the oldest counted event leaves the window.
        retry_after: Duration,
    },

    /// The configured limit cannot be enforced.
    #[error("Invalid rate limit policy: {0}")]
    InvalidPolicy(String),
}

impl RateLimitError {
    /// Get the retry-after duration if available.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::LimitExceeded { retry_after } => Some(*retry_after),
            Self::InvalidPolicy(_) => None,
        }
    }
}
