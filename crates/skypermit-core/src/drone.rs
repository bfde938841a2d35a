//! Read-only views of registry entities: operator drones and user profiles.
//!
//! The registry itself lives outside this workspace; these are the shapes
//! the gate needs to decide ownership and UIN status.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::{DroneId, UserId};

/// Registration status of an operator drone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperatorDroneStatus {
    Registered,
    UinDraft,
    UinSubmitted,
    UinApproved,
    UinRejected,
}

impl OperatorDroneStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Registered => "REGISTERED",
            Self::UinDraft => "UIN_DRAFT",
            Self::UinSubmitted => "UIN_SUBMITTED",
            Self::UinApproved => "UIN_APPROVED",
            Self::UinRejected => "UIN_REJECTED",
        }
    }
}

impl fmt::Display for OperatorDroneStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a drone is held by an individual or an organization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperatorKind {
    Individual,
    Organization,
}

/// The operator a drone is registered to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OperatorRef {
    pub kind: OperatorKind,
    pub id: u64,
}

impl OperatorRef {
    pub const fn individual(id: u64) -> Self {
        Self {
            kind: OperatorKind::Individual,
            id,
        }
    }

    pub const fn organization(id: u64) -> Self {
        Self {
            kind: OperatorKind::Organization,
            id,
        }
    }
}

/// A drone as recorded by the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatorDrone {
    pub id: DroneId,
    pub operator: OperatorRef,
    /// Unique identifying number, issued once the UIN application is approved.
    pub uin: Option<String>,
    pub status: OperatorDroneStatus,
}

impl OperatorDrone {
    pub fn is_uin_approved(&self) -> bool {
        self.status == OperatorDroneStatus::UinApproved
    }
}

/// A user's operator memberships.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: UserId,
    pub individual_operator_id: Option<u64>,
    pub organization_operator_id: Option<u64>,
}

impl UserProfile {
    /// A profile with no operator memberships.
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            individual_operator_id: None,
            organization_operator_id: None,
        }
    }

    /// Whether this user operates the given drone.
    pub fn owns(&self, drone: &OperatorDrone) -> bool {
        let operator_id = match drone.operator.kind {
            OperatorKind::Individual => self.individual_operator_id,
            OperatorKind::Organization => self.organization_operator_id,
        };
        operator_id == Some(drone.operator.id)
    }
}
