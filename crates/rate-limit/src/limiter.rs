//! The sliding-window rate limiter.

use std::hash::Hash;
use std::time::Instant;

use crate::{Decision, InMemoryWindowStore, RateLimitPolicy, WindowStorage};

/// Decides whether an event for a key is admitted under a fixed policy.
pub struct RateLimiter<K, S = InMemoryWindowStore<K>> {
    policy: RateLimitPolicy,
    storage: S,
    _key: std::marker::PhantomData<fn(&K)>,
}

impl<K> RateLimiter<K>
where
    K: Eq + Hash + Clone + Send + Sync,
{
    /// Limiter backed by the in-memory window store.
    pub fn new(policy: RateLimitPolicy) -> Self {
        Self::with_storage(policy, InMemoryWindowStore::new())
    }
}

impl<K, S> RateLimiter<K, S>
where
    S: WindowStorage<K>,
{
    /// Limiter backed by a custom window store.
    pub fn with_storage(policy: RateLimitPolicy, storage: S) -> Self {
        Self {
            policy,
            storage,
            _key: std::marker::PhantomData,
        }
    }

    /// Admits or rejects an event for `key` happening at `now`.
    ///
    /// Expired entries are dropped first. If the key still has `max_events` entries in the
    /// window the event is rejected and nothing is recorded, otherwise `now` is appended.
    pub fn admit(&self, key: &K, now: Instant) -> bool {
        self.check(key, now).is_admitted()
    }

    /// Like [`RateLimiter::admit`], with the retry hint on rejection.
    pub fn check(&self, key: &K, now: Instant) -> Decision {
        let decision = self.storage.check_and_record(key, now, &self.policy);

        if let Decision::Rejected { retry_after } = decision {
            log::debug!("Rate limit reached, retry after {retry_after:?}");
        }

        decision
    }

    /// Drops keys with no entry left in the window.
    pub fn purge_expired(&self, now: Instant) -> usize {
        self.storage.purge_expired(now, self.policy.window())
    }

    /// The policy this limiter enforces.
    pub fn policy(&self) -> &RateLimitPolicy {
        &self.policy
    }

    /// The underlying window store.
    pub fn storage(&self) -> &S {
        &self.storage
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn secs(s: u64) -> Duration {
        Duration::from_secs(s)
    }

    #[test]
    fn five_per_minute_scenario() {
        let limiter = RateLimiter::new(RateLimitPolicy::new(5, secs(60)).unwrap());
        let t0 = Instant::now();

        for _ in 0..5 {
            assert!(limiter.admit(&"10.0.0.1", t0));
        }

        assert!(!limiter.admit(&"10.0.0.1", t0 + secs(10)));
        assert!(limiter.admit(&"10.0.0.1", t0 + secs(61)));
    }

    #[test]
    fn keys_are_independent() {
        let limiter = RateLimiter::new(RateLimitPolicy::new(1, secs(60)).unwrap());
        let t0 = Instant::now();

        assert!(limiter.admit(&"a", t0));
        assert!(!limiter.admit(&"a", t0));
        assert!(limiter.admit(&"b", t0));
    }

    #[test]
    fn every_event_beyond_the_limit_in_a_window_is_rejected() {
        let limiter = RateLimiter::new(RateLimitPolicy::new(3, secs(10)).unwrap());
        let t0 = Instant::now();

        // One event per second for 30 seconds.
        let admitted: Vec<u64> = (0..30).filter(|s| limiter.admit(&"k", t0 + secs(*s))).collect();

        // Any 10 second window holds at most 3 admitted events.
        for start in 0..30 {
            let in_window = admitted.iter().filter(|s| **s >= start && **s <= start + 10).count();
            assert!(in_window <= 3, "window starting at {start} admitted {in_window}");
        }

        assert_eq!(admitted, vec![0, 1, 2, 11, 12, 13, 22, 23, 24]);
    }

    #[test]
    fn window_expiry_always_readmits() {
        let limiter = RateLimiter::new(RateLimitPolicy::new(2, secs(60)).unwrap());
        let t0 = Instant::now();

        assert!(limiter.admit(&"k", t0));
        assert!(limiter.admit(&"k", t0 + secs(30)));
        assert!(!limiter.admit(&"k", t0 + secs(59)));

        // Past the window of the most recent entry.
        assert!(limiter.admit(&"k", t0 + secs(91)));
    }

    #[test]
    fn purge_uses_policy_window() {
        let limiter = RateLimiter::new(RateLimitPolicy::new(2, secs(60)).unwrap());
        let t0 = Instant::now();

        limiter.admit(&"k", t0);

        assert_eq!(limiter.purge_expired(t0 + secs(30)), 0);
        assert_eq!(limiter.purge_expired(t0 + secs(61)), 1);
        assert!(limiter.storage().is_empty());
    }
}
