//! Small wrappers around a unit of database work.
//!
//! Each wrapper does one thing and hands the operation through unchanged:
//!
//! - [`log_query`] logs the query text before running it.
//! - [`MemoCache`] returns a stored result for a key it has seen before.
//! - [`with_connection`] opens a connection and closes it on every path.
//! - [`call_with_retry`] re-runs a failing operation after a fixed delay.
//! - [`run_in_transaction`] commits on success and rolls back on error.
//!
//! [`Pipeline`] composes them in that order, outermost first.

#![deny(missing_docs)]

mod connection;
mod memo;
mod pipeline;
mod query_log;
mod retry;
mod transaction;

pub use connection::{Connector, with_connection};
pub use memo::MemoCache;
pub use pipeline::Pipeline;
pub use query_log::log_query;
pub use retry::{RetryPolicy, Retryable, call_with_retry, call_with_retry_if};
pub use transaction::{TransactionState, Transactional, UnitOfWork, run_in_transaction};
