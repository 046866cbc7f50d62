//! Sliding-window rate limiting for Parley.
//!
//! Every key (usually a client address) gets an ordered list of the instants at which
//! its events were admitted. Entries older than the window are pruned lazily whenever
//! the key is looked at, and an event is admitted while fewer than `max_events` remain.
//!
//! The store is sharded, so keys only contend with keys in the same shard and the
//! prune, decide and append steps for one key happen under a single lock.

#![deny(missing_docs)]

mod clock;
mod error;
mod limiter;
mod manager;
mod policy;
mod request;
mod storage;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::RateLimitError;
pub use limiter::RateLimiter;
pub use manager::RateLimitManager;
pub use policy::RateLimitPolicy;
pub use request::{RateLimitRequest, RateLimitRequestBuilder};
pub use storage::{Decision, InMemoryWindowStore, WindowStorage};
