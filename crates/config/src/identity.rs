//! Actor identity configuration.
//!
//! Authentication happens in front of Parley. The host forwards the authenticated
//! user id in a header, and this tells the server which one.

use serde::Deserialize;

/// Identity header configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IdentityConfig {
    /// HTTP header carrying the acting user's id.
    pub header: String,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            header: "x-user-id".to_string(),
        }
    }
}
