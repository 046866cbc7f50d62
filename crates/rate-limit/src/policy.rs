use std::num::NonZeroU32;
use std::time::Duration;

use crate::RateLimitError;

/// How many events a key may have admitted within a trailing window.
///
/// Immutable once a limiter is built with it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    max_events: NonZeroU32,
    window: Duration,
}

impl RateLimitPolicy {
    /// Builds a policy, rejecting a zero limit or an empty window.
    pub fn new(max_events: u32, window: Duration) -> Result<Self, RateLimitError> {
        let max_events = NonZeroU32::new(max_events)
            .ok_or_else(|| RateLimitError::InvalidPolicy("max_events must be positive".to_string()))?;

        if window.is_zero() {
            return Err(RateLimitError::InvalidPolicy("window must be longer than zero".to_string()));
        }

        Ok(Self { max_events, window })
    }

    /// Maximum number of events per window.
    pub fn max_events(&self) -> u32 {
        self.max_events.get()
    }

    /// Length of the window.
    pub fn window(&self) -> Duration {
        self.window
    }
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self {
            max_events: NonZeroU32::MIN.saturating_add(4),
            window: Duration::from_secs(60),
        }
    }
}
