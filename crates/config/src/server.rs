//! HTTP server configuration settings.

use std::net::SocketAddr;

use serde::Deserialize;

use crate::{AccessHoursConfig, HealthConfig, IdentityConfig, RateLimitConfig, RequestLogConfig, RoleConfig};

/// HTTP server configuration settings.
#[derive(Default, Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// The socket address the server should listen on.
    pub listen_address: Option<SocketAddr>,
    /// Health endpoint configuration.
    #[serde(default)]
    pub health: HealthConfig,
    /// Rate limiting configuration for write requests.
    #[serde(default)]
    pub rate_limits: RateLimitConfig,
    /// Append-only request log.
    #[serde(default)]
    pub request_log: RequestLogConfig,
    /// Hours of the day during which requests are served. No restriction if absent.
    pub access_hours: Option<AccessHoursConfig>,
    /// Path prefixes restricted to privileged roles.
    #[serde(default)]
    pub roles: RoleConfig,
    /// Where the host places the authenticated actor's identity.
    #[serde(default)]
    pub identity: IdentityConfig,
}
