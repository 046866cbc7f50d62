//! Memoization of keyed lookups.

use std::fmt::Debug;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};

use config::CacheConfig;
use dashmap::DashMap;
use mini_moka::sync::Cache;

/// Results of a deterministic keyed operation, by key.
///
/// Keys are compared exactly as given. Two keys that mean the same thing but differ
/// textually get separate entries, and an entry is served even if the data behind it has
/// changed since; invalidating is up to the caller.
///
/// Without bounds the cache keeps every entry for as long as it lives. With a
/// `max_capacity` or `time_to_live` it evicts, which trades the guarantee that an
/// operation runs at most once per key for bounded memory.
///
/// A result computed while [`MemoCache::invalidate`] ran is not kept, so an invalidation
/// racing with a lookup of the same key cannot leave the old value behind.
pub struct MemoCache<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    entries: Entries<K, V>,
    /// Bumped by every invalidation.
    generation: AtomicU64,
}

enum Entries<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    Unbounded(DashMap<K, V>),
    Bounded(Cache<K, V>),
}

impl<K, V> MemoCache<K, V>
where
    K: Hash + Eq + Clone + Debug + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// A cache that never evicts.
    pub fn unbounded() -> Self {
        Self {
            entries: Entries::Unbounded(DashMap::new()),
            generation: AtomicU64::new(0),
        }
    }

    /// A cache honoring the configured bounds, unbounded if none are set.
    pub fn from_config(config: &CacheConfig) -> Self {
        if config.is_unbounded() {
            return Self::unbounded();
        }

        let mut builder = Cache::builder();

        if let Some(max_capacity) = config.max_capacity {
            builder = builder.max_capacity(max_capacity);
        }

        if let Some(ttl) = config.time_to_live {
            builder = builder.time_to_live(ttl);
        }

        log::debug!(
            "Memo cache bounded to {:?} entries with a time to live of {:?}",
            config.max_capacity,
            config.time_to_live
        );

        Self {
            entries: Entries::Bounded(builder.build()),
            generation: AtomicU64::new(0),
        }
    }

    /// Returns the stored result for `key`, or runs `op`, stores its result and returns it.
    ///
    /// Failures are passed through and not stored, so the next call for the key runs `op`
    /// again.
    pub fn call_with_cache<E, F>(&self, key: &K, op: F) -> Result<V, E>
    where
        F: FnOnce(&K) -> Result<V, E>,
    {
        if let Some(value) = self.get(key) {
            log::debug!("Cache hit for {key:?}");
            return Ok(value);
        }

        let generation = self.generation.load(Ordering::SeqCst);
        let value = op(key)?;

        self.insert(key.clone(), value.clone());

        // An invalidation that started after `op` began may have removed the entry before
        // the insert above. Undo the insert, the value may be stale.
        if self.generation.load(Ordering::SeqCst) != generation {
            self.remove(key);
            log::debug!("Cache miss for {key:?}, result dropped after a concurrent invalidation");
        } else {
            log::debug!("Cache miss for {key:?}, result stored");
        }

        Ok(value)
    }

    /// The stored value for `key`, if any.
    pub fn get(&self, key: &K) -> Option<V> {
        match &self.entries {
            Entries::Unbounded(map) => map.get(key).map(|value| value.clone()),
            Entries::Bounded(cache) => cache.get(key),
        }
    }

    /// Forgets the entry for `key`, including one being computed right now.
    pub fn invalidate(&self, key: &K) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.remove(key);
    }

    fn remove(&self, key: &K) {
        match &self.entries {
            Entries::Unbounded(map) => {
                map.remove(key);
            }
            Entries::Bounded(cache) => cache.invalidate(key),
        }
    }

    /// Number of stored entries. Approximate for a bounded cache, where eviction is
    /// applied lazily.
    pub fn len(&self) -> u64 {
        match &self.entries {
            Entries::Unbounded(map) => map.len() as u64,
            Entries::Bounded(cache) => cache.entry_count(),
        }
    }

    /// Whether nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn insert(&self, key: K, value: V) {
        match &self.entries {
            Entries::Unbounded(map) => {
                map.insert(key, value);
            }
            Entries::Bounded(cache) => cache.insert(key, value),
        }
    }
}
