//! In-memory window storage on a sharded concurrent map.

use std::collections::VecDeque;
use std::hash::Hash;
use std::time::{Duration, Instant};

use dashmap::DashMap;

use super::{Decision, WindowStorage};
use crate::RateLimitPolicy;

/// Admitted-event timestamps per key, oldest first.
///
/// Each key lives in one shard of a [`DashMap`]. Holding the entry guard keeps other
/// callers for the same shard out while we prune, count and append, so admission for a
/// key is atomic without serializing unrelated keys behind one global lock.
pub struct InMemoryWindowStore<K>
where
    K: Eq + Hash,
{
    windows: DashMap<K, VecDeque<Instant>>,
}

impl<K> InMemoryWindowStore<K>
where
    K: Eq + Hash + Clone,
{
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            windows: DashMap::new(),
        }
    }

    /// Number of keys currently tracked.
    pub fn len(&self) -> usize {
        self.windows.len()
    }

    /// Whether no key is tracked.
    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    /// Snapshot of the recorded instants for `key`, oldest first.
    pub fn entries(&self, key: &K) -> Vec<Instant> {
        self.windows
            .get(key)
            .map(|entries| entries.iter().copied().collect())
            .unwrap_or_default()
    }
}

impl<K> Default for InMemoryWindowStore<K>
where
    K: Eq + Hash + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K> WindowStorage<K> for InMemoryWindowStore<K>
where
    K: Eq + Hash + Clone + Send + Sync,
{
    fn check_and_record(&self, key: &K, now: Instant, policy: &RateLimitPolicy) -> Decision {
        // The guard is held until the end of this function.
        let mut entries = match self.windows.get_mut(key) {
            Some(entries) => entries,
            None => self.windows.entry(key.clone()).or_default(),
        };

        prune(&mut entries, now, policy.window());

        if entries.len() >= policy.max_events() as usize {
            let retry_after = entries
                .front()
                .map(|oldest| (*oldest + policy.window()).saturating_duration_since(now))
                .unwrap_or_default();

            return Decision::Rejected { retry_after };
        }

        // Keep the sequence non-decreasing even if a caller hands us an older instant.
        let at = match entries.back() {
            Some(newest) if *newest > now => *newest,
            _ => now,
        };

        entries.push_back(at);

        Decision::Admitted
    }

    fn purge_expired(&self, now: Instant, window: Duration) -> usize {
        let before = self.windows.len();

        self.windows.retain(|_, entries| {
            prune(entries, now, window);
            !entries.is_empty()
        });

        before.saturating_sub(self.windows.len())
    }
}

/// Drops entries strictly older than `now - window`.
fn prune(entries: &mut VecDeque<Instant>, now: Instant, window: Duration) {
    let Some(cutoff) = now.checked_sub(window) else {
        return;
    };

    while entries.front().is_some_and(|oldest| *oldest < cutoff) {
        entries.pop_front();
    }
}
