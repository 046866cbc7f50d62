//! Rate limit manager implementation.

use std::net::IpAddr;
use std::sync::Arc;

use config::RateLimitConfig;

use crate::clock::{Clock, SystemClock};
use crate::error::RateLimitError;
use crate::limiter::RateLimiter;
use crate::policy::RateLimitPolicy;
use crate::request::RateLimitRequest;
use crate::storage::Decision;

/// Applies the configured per-client limit to incoming requests.
pub struct RateLimitManager {
    /// Rate limit configuration.
    config: Arc<RateLimitConfig>,
    /// Limiter keyed by client address.
    per_ip: RateLimiter<IpAddr>,
    /// Time source for admission decisions.
    clock: Arc<dyn Clock>,
}

impl RateLimitManager {
    /// Create a manager using the system clock.
    pub fn new(config: RateLimitConfig) -> Result<Self, RateLimitError> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create a manager with an explicit time source.
    pub fn with_clock(config: RateLimitConfig, clock: Arc<dyn Clock>) -> Result<Self, RateLimitError> {
        let policy = RateLimitPolicy::new(config.max_events, config.window)?;

        log::debug!(
            "Rate limiting {} request(s) per {:?} for methods {:?}",
            policy.max_events(),
            policy.window(),
            config.methods
        );

        Ok(Self {
            config: Arc::new(config),
            per_ip: RateLimiter::new(policy),
            clock,
        })
    }

    /// Check if rate limiting is enabled.
    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Whether requests with `method` count against the limit.
    pub fn applies_to(&self, method: &str) -> bool {
        self.is_enabled() && self.config.applies_to(method)
    }

    /// Checks the per-client limit for a request, recording it when admitted.
    ///
    /// Requests without a client address cannot be attributed to anyone and pass.
    pub fn check_request(&self, request: &RateLimitRequest) -> Result<(), RateLimitError> {
        if !self.is_enabled() {
            return Ok(());
        }

        let Some(ip) = request.ip else {
            log::debug!("No client address in request - skipping rate limit");
            return Ok(());
        };

        match self.per_ip.check(&ip, self.clock.now()) {
            Decision::Admitted => Ok(()),
            Decision::Rejected { retry_after } => {
                log::debug!("Request from {ip} blocked, retry after {retry_after:?}");
                Err(RateLimitError::LimitExceeded { retry_after })
            }
        }
    }

    /// Forgets clients whose window is empty.
    pub fn purge_expired(&self) -> usize {
        let purged = self.per_ip.purge_expired(self.clock.now());

        if purged > 0 {
            log::debug!("Purged {purged} idle rate limit window(s)");
        }

        purged
    }
}
