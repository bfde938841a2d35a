//! The acting principal of a request.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use skypermit_core::UserId;

use crate::role::Role;

/// Identity and role claims of whoever invokes an operation.
///
/// Authentication happens upstream; by the time an `Actor` exists its
/// claims are trusted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: UserId,
    pub roles: BTreeSet<Role>,
}

impl Actor {
    /// An actor with no roles, e.g. a drone operator.
    pub fn new(id: UserId) -> Self {
        Self {
            id,
            roles: BTreeSet::new(),
        }
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.roles.insert(role);
        self
    }

    pub fn with_roles(mut self, roles: impl IntoIterator<Item = Role>) -> Self {
        self.roles.extend(roles);
        self
    }

    /// Build an actor from the authority claims of an authenticated token.
    ///
    /// Claims may carry a `ROLE_` prefix. Claims naming no known role are
    /// ignored.
    pub fn from_claims<I, S>(id: UserId, claims: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let roles = claims
            .into_iter()
            .filter_map(|claim| claim.as_ref().parse::<Role>().ok())
            .collect();
        Self { id, roles }
    }
}
