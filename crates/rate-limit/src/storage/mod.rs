//! Storage backends for rate limiting.

use std::time::{Duration, Instant};

use crate::RateLimitPolicy;

pub mod memory;

pub use memory::InMemoryWindowStore;

/// Outcome of an admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// The event was admitted and recorded.
    Admitted,
    /// The key is at its limit. Nothing was recorded.
    Rejected {
        /// Time until the oldest counted event leaves the window.
        retry_after: Duration,
    },
}

impl Decision {
    /// Whether the event was admitted.
    pub fn is_admitted(&self) -> bool {
        matches!(self, Decision::Admitted)
    }
}

/// Per-key event windows.
///
/// Implementations must run the prune, decide and record steps for one key as a single
/// critical section, otherwise two concurrent callers can both see room and overshoot
/// the limit.
pub trait WindowStorage<K>: Send + Sync {
    /// Prunes expired entries of `key`, then records `now` if the key is under its limit.
    fn check_and_record(&self, key: &K, now: Instant, policy: &RateLimitPolicy) -> Decision;

    /// Removes keys whose entries have all expired. Returns how many keys were dropped.
    fn purge_expired(&self, now: Instant, window: Duration) -> usize;
}
