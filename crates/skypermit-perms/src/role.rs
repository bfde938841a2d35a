//! Role claims carried by an actor.
//!
//! Three authority roles can move applications. Each has a viewer
//! counterpart that may read the same scoped listing but not act on it.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use skypermit_core::AuthorityRole;

/// A role claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,
    AtcAdmin,
    AfmluAdmin,
    ViewerAdmin,
    AtcViewerAdmin,
    AfmluViewerAdmin,
}

impl Role {
    pub const ALL: [Role; 6] = [
        Self::Admin,
        Self::AtcAdmin,
        Self::AfmluAdmin,
        Self::ViewerAdmin,
        Self::AtcViewerAdmin,
        Self::AfmluViewerAdmin,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "ADMIN",
            Self::AtcAdmin => "ATC_ADMIN",
            Self::AfmluAdmin => "AFMLU_ADMIN",
            Self::ViewerAdmin => "VIEWER_ADMIN",
            Self::AtcViewerAdmin => "ATC_VIEWER_ADMIN",
            Self::AfmluViewerAdmin => "AFMLU_VIEWER_ADMIN",
        }
    }
}

impl From<AuthorityRole> for Role {
    fn from(role: AuthorityRole) -> Self {
        match role {
            AuthorityRole::Admin => Self::Admin,
            AuthorityRole::AtcAdmin => Self::AtcAdmin,
            AuthorityRole::AfmluAdmin => Self::AfmluAdmin,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    /// Accepts both `ADMIN` and Spring-style `ROLE_ADMIN`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.strip_prefix("ROLE_").unwrap_or(s);
        Self::ALL
            .into_iter()
            .find(|role| role.as_str() == name)
            .ok_or_else(|| format!("unknown role: {}", s))
    }
}
