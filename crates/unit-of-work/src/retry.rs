//! Fixed-delay retry of fallible operations.

use std::fmt::Display;
use std::num::NonZeroU32;
use std::time::Duration;

use config::RetryConfig;

/// Classifies errors worth another attempt.
pub trait Retryable {
    /// True when the failure may go away on its own, e.g. a write conflict.
    fn is_retryable(&self) -> bool;
}

/// How often and how patiently to retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    attempts: NonZeroU32,
    delay: Duration,
}

impl RetryPolicy {
    /// `attempts` counts the first call, and is raised to 1 if zero.
    pub fn new(attempts: u32, delay: Duration) -> Self {
        Self {
            attempts: NonZeroU32::new(attempts).unwrap_or(NonZeroU32::MIN),
            delay,
        }
    }

    /// A single attempt, no retries.
    pub fn once() -> Self {
        Self::new(1, Duration::ZERO)
    }

    /// Total number of attempts.
    pub fn attempts(&self) -> u32 {
        self.attempts.get()
    }

    /// Pause between attempts.
    pub fn delay(&self) -> Duration {
        self.delay
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self::new(config.attempts, config.delay)
    }
}

/// Calls `op` until it succeeds or the policy's attempts are used up.
///
/// Between two attempts the calling thread sleeps for the policy's delay. After the last
/// failed attempt that failure is returned as is.
pub fn call_with_retry<T, E, F>(op: F, policy: &RetryPolicy) -> Result<T, E>
where
    F: FnMut() -> Result<T, E>,
    E: Display,
{
    call_with_retry_if(op, policy, |_| true)
}

/// Like [`call_with_retry`], but an error for which `is_retryable` is false is returned
/// immediately without further attempts.
pub fn call_with_retry_if<T, E, F, P>(mut op: F, policy: &RetryPolicy, is_retryable: P) -> Result<T, E>
where
    F: FnMut() -> Result<T, E>,
    E: Display,
    P: Fn(&E) -> bool,
{
    let attempts = policy.attempts();
    let mut attempt = 0;

    loop {
        attempt += 1;

        let error = match op() {
            Ok(value) => return Ok(value),
            Err(error) => error,
        };

        if !is_retryable(&error) {
            log::debug!("Attempt {attempt} failed with a permanent error: {error}");
            return Err(error);
        }

        log::warn!("Attempt {attempt} of {attempts} failed: {error}");

        if attempt >= attempts {
            log::warn!("All {attempts} attempts failed");
            return Err(error);
        }

        if !policy.delay().is_zero() {
            log::debug!("Retrying in {:?}", policy.delay());
            std::thread::sleep(policy.delay());
        }
    }
}
