//! User roles.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Role of a user, ordered from least to most privileged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Read-only visitor.
    Guest,
    /// Regular member.
    #[default]
    Member,
    /// Can moderate conversations.
    Moderator,
    /// Full access.
    Admin,
}

impl Role {
    /// The lowercase name used in configuration and JSON.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Guest => "guest",
            Role::Member => "member",
            Role::Moderator => "moderator",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
