//! Fixed-order composition of the wrappers.

use std::fmt::{Debug, Display};
use std::hash::Hash;

use crate::{
    Connector, MemoCache, RetryPolicy, Retryable, Transactional, call_with_retry_if, log_query, run_in_transaction,
    with_connection,
};

/// Runs operations through the wrappers in one documented order, outermost first:
///
/// 1. query log
/// 2. memo cache (only for [`Pipeline::cached`])
/// 3. connection
/// 4. retry
/// 5. transaction
/// 6. the operation
///
/// A cache hit therefore never opens a connection, all attempts share one connection,
/// and every attempt is its own transaction.
pub struct Pipeline<C> {
    connector: C,
    retry: RetryPolicy,
}

impl<C> Pipeline<C>
where
    C: Connector,
    C::Connection: Transactional,
{
    /// Composes `connector` with a retry policy.
    pub fn new(connector: C, retry: RetryPolicy) -> Self {
        Self { connector, retry }
    }

    /// The connector connections are opened with.
    pub fn connector(&self) -> &C {
        &self.connector
    }

    /// Runs `op` through query log, connection, retry and transaction.
    pub fn execute<T, E, F>(&self, query: &str, op: F) -> Result<T, E>
    where
        E: From<C::Error> + From<<C::Connection as Transactional>::Error> + Retryable + Display,
        F: FnMut(&mut C::Connection) -> Result<T, E>,
    {
        log_query(query, || self.transact(op))
    }

    /// Like [`Pipeline::execute`], answered from `cache` when `key` was seen before.
    pub fn cached<K, V, E, F>(&self, query: &str, cache: &MemoCache<K, V>, key: &K, mut op: F) -> Result<V, E>
    where
        K: Hash + Eq + Clone + Debug + Send + Sync + 'static,
        V: Clone + Send + Sync + 'static,
        E: From<C::Error> + From<<C::Connection as Transactional>::Error> + Retryable + Display,
        F: FnMut(&mut C::Connection, &K) -> Result<V, E>,
    {
        log_query(query, || {
            cache.call_with_cache(key, |key| self.transact(|connection| op(connection, key)))
        })
    }

    fn transact<T, E, F>(&self, mut op: F) -> Result<T, E>
    where
        E: From<C::Error> + From<<C::Connection as Transactional>::Error> + Retryable + Display,
        F: FnMut(&mut C::Connection) -> Result<T, E>,
    {
        with_connection(&self.connector, |connection| {
            call_with_retry_if(
                || run_in_transaction(&mut *connection, &mut op),
                &self.retry,
                E::is_retryable,
            )
        })
    }
}
