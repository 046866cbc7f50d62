//! Parley configuration structures to map the parley.toml configuration.

#![deny(missing_docs)]

mod access;
mod health;
mod identity;
mod loader;
mod rate_limit;
mod request_log;
mod role;
mod server;
mod storage;

use std::path::Path;

pub use access::{AccessHoursConfig, RoleConfig};
pub use health::HealthConfig;
pub use identity::IdentityConfig;
pub use rate_limit::RateLimitConfig;
pub use request_log::RequestLogConfig;
pub use role::Role;
pub use server::ServerConfig;
pub use storage::{CacheConfig, RetryConfig, StorageConfig};

use serde::Deserialize;

/// Main configuration structure for the Parley application.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// HTTP server configuration settings.
    #[serde(default)]
    pub server: ServerConfig,
    /// Retry and caching behaviour of the storage layer.
    #[serde(default)]
    pub storage: StorageConfig,
}

impl Config {
    /// Load configuration from a file path.
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Config> {
        loader::load(path)
    }

    /// Checks the value ranges serde cannot express.
    pub fn validate(&self) -> anyhow::Result<()> {
        loader::validate(self)
    }
}
