//! Error types for SkyPermit core.

use thiserror::Error;

use crate::application::ApplicationStatus;
use crate::drone::OperatorDroneStatus;
use crate::transition::AuthorityRole;
use crate::types::{DroneId, EntryDigest, UserId};

/// Client-side validation failures for application content and log uploads.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("UIN not approved for drone {drone_id} (status {status})")]
    DroneNotApproved {
        drone_id: DroneId,
        status: OperatorDroneStatus,
    },

    #[error("invalid drone id: {0}")]
    InvalidDroneId(DroneId),

    #[error("invalid recurring time expression: {0}")]
    InvalidScheduleExpression(String),

    #[error("invalid recurring time duration: {0:?}")]
    InvalidScheduleDuration(Option<i64>),

    #[error("invalid flight window: start {start} is not before end {end}")]
    InvalidFlightWindow { start: i64, end: i64 },

    #[error("invalid fly area: {0}")]
    InvalidFlyArea(String),

    #[error("malformed flight log: {0}")]
    MalformedFlightLog(String),

    #[error("flight log of {size} bytes exceeds limit of {limit} bytes")]
    FlightLogTooLarge { size: usize, limit: usize },
}

/// Failures of the drone-reference gate, in check order.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GateError {
    #[error("drone not found: {0}")]
    DroneNotFound(DroneId),

    #[error("user {user_id} does not own drone {drone_id}")]
    NotOwner { user_id: UserId, drone_id: DroneId },

    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

/// An approval attempted from the wrong precondition status.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("application is {actual}, {role} approval requires {required}")]
    NotInSubmittedStatus {
        role: AuthorityRole,
        required: ApplicationStatus,
        actual: ApplicationStatus,
    },
}

/// Flight-log chain integrity failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainError {
    #[error("chain broken: expected previous hash {expected:?}, got {got:?}")]
    Broken {
        expected: Option<EntryDigest>,
        got: Option<EntryDigest>,
    },

    #[error("digest mismatch at seq {0}")]
    DigestMismatch(u64),

    #[error("invalid sequence number: expected {expected}, got {got}")]
    InvalidSequence { expected: u64, got: u64 },

    #[error("entry at seq {0} belongs to another application")]
    ForeignEntry(u64),
}
