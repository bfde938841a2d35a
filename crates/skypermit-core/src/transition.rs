//! Authority transitions as data.
//!
//! Each authority role owns exactly one row: the status it may act on and
//! the status it moves the application to on approval or rejection. The
//! three approval paths share one function driven by this table.
//!
//! ```text
//! DRAFT ─► SUBMITTED ─┬─ ADMIN ───────► APPROVED | REJECTED
//!                     └─ ATC_ADMIN ───► APPROVEDBYATC | REJECTEDBYATC
//!                                           │
//!                     AFMLU_ADMIN ◄─────────┘
//!                         └──────────► APPROVEDBYAFMLU | REJECTEDBYAFMLU
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::application::ApplicationStatus;
use crate::error::TransitionError;

/// The three gating authorities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthorityRole {
    /// Central administrator; single-authority fast path.
    Admin,
    /// Air-traffic-control administrator; first stage of the pipeline.
    AtcAdmin,
    /// Airspace/frequency-management administrator; second stage.
    AfmluAdmin,
}

impl AuthorityRole {
    pub const ALL: [AuthorityRole; 3] = [Self::Admin, Self::AtcAdmin, Self::AfmluAdmin];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "ADMIN",
            Self::AtcAdmin => "ATC_ADMIN",
            Self::AfmluAdmin => "AFMLU_ADMIN",
        }
    }
}

impl fmt::Display for AuthorityRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The outcome an authority requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Decision {
    Approve,
    Reject,
}

/// One row of the transition table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub role: AuthorityRole,
    pub precondition: ApplicationStatus,
    pub on_approve: ApplicationStatus,
    pub on_reject: ApplicationStatus,
}

/// The full authority transition table.
pub const TRANSITIONS: [Transition; 3] = [
    Transition {
        role: AuthorityRole::Admin,
        precondition: ApplicationStatus::Submitted,
        on_approve: ApplicationStatus::Approved,
        on_reject: ApplicationStatus::Rejected,
    },
    Transition {
        role: AuthorityRole::AtcAdmin,
        precondition: ApplicationStatus::Submitted,
        on_approve: ApplicationStatus::ApprovedByAtc,
        on_reject: ApplicationStatus::RejectedByAtc,
    },
    Transition {
        role: AuthorityRole::AfmluAdmin,
        precondition: ApplicationStatus::ApprovedByAtc,
        on_approve: ApplicationStatus::ApprovedByAfmlu,
        on_reject: ApplicationStatus::RejectedByAfmlu,
    },
];

impl Transition {
    /// Look up the row for a role.
    pub fn for_role(role: AuthorityRole) -> &'static Transition {
        match role {
            AuthorityRole::Admin => &TRANSITIONS[0],
            AuthorityRole::AtcAdmin => &TRANSITIONS[1],
            AuthorityRole::AfmluAdmin => &TRANSITIONS[2],
        }
    }

    pub fn outcome(&self, decision: Decision) -> ApplicationStatus {
        match decision {
            Decision::Approve => self.on_approve,
            Decision::Reject => self.on_reject,
        }
    }

    /// Compute the next status, or fail if `current` is not this row's
    /// precondition.
    pub fn apply(
        &self,
        current: ApplicationStatus,
        decision: Decision,
    ) -> Result<ApplicationStatus, TransitionError> {
        if current != self.precondition {
            return Err(TransitionError::NotInSubmittedStatus {
                role: self.role,
                required: self.precondition,
                actual: current,
            });
        }
        Ok(self.outcome(decision))
    }
}

/// Apply an authority decision to a status.
pub fn apply_decision(
    role: AuthorityRole,
    current: ApplicationStatus,
    decision: Decision,
) -> Result<ApplicationStatus, TransitionError> {
    Transition::for_role(role).apply(current, decision)
}
