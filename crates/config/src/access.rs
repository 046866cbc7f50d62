//! Access restrictions: serving hours and role-protected paths.

use std::collections::BTreeSet;

use serde::Deserialize;

use crate::Role;

/// Hours of the day (local time) during which the server answers requests.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AccessHoursConfig {
    /// First hour of the day requests are allowed, inclusive.
    pub start_hour: u8,
    /// Hour from which requests are refused again, exclusive.
    pub end_hour: u8,
}

impl Default for AccessHoursConfig {
    fn default() -> Self {
        Self {
            start_hour: 6,
            end_hour: 21,
        }
    }
}

impl AccessHoursConfig {
    /// Whether the given hour (0-23) falls inside the window.
    pub fn allows(&self, hour: u8) -> bool {
        self.start_hour <= hour && hour < self.end_hour
    }
}

/// Paths that only privileged roles may reach.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RoleConfig {
    /// Path prefixes requiring one of `allowed_roles`.
    pub protected_paths: Vec<String>,
    /// Roles allowed on the protected paths.
    pub allowed_roles: BTreeSet<Role>,
}

impl Default for RoleConfig {
    fn default() -> Self {
        Self {
            protected_paths: Vec::new(),
            allowed_roles: BTreeSet::from([Role::Admin, Role::Moderator]),
        }
    }
}

impl RoleConfig {
    /// Whether a request to `path` has to pass the role check.
    pub fn protects(&self, path: &str) -> bool {
        self.protected_paths.iter().any(|prefix| path.starts_with(prefix.as_str()))
    }
}
