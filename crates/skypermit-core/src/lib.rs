//! # SkyPermit Core
//!
//! Pure primitives for SkyPermit: applications, approval transitions,
//! validation and the flight-log chain.
//!
//! This crate contains no I/O, no storage, no networking. It is pure
//! computation over application records and hash-linked log entries.
//!
//! ## Key Types
//!
//! - [`Application`] - A flight permission request and its decision history
//! - [`ApplicationStatus`] - Lifecycle status; moves only forward
//! - [`Transition`] - One row of the authority transition table
//! - [`FlightLogEntry`] / [`LogRecord`] - Hash-linked post-flight logs
//!
//! ## Canonicalization
//!
//! Log entries are digested over deterministic CBOR. See [`canonical`].

pub mod application;
pub mod canonical;
pub mod chain;
pub mod crypto;
pub mod drone;
pub mod error;
pub mod schedule;
pub mod transition;
pub mod types;
pub mod validation;

pub use application::{
    Application, ApplicationForm, ApplicationStatus, DecisionRecord, LatLong, Submission,
};
pub use canonical::canonical_entry_bytes;
pub use chain::{check_extends, verify_chain, FlightLogEntry, LogRecord, DIGEST_DOMAIN};
pub use crypto::Blake3Hash;
pub use drone::{OperatorDrone, OperatorDroneStatus, OperatorKind, OperatorRef, UserProfile};
pub use error::{ChainError, GateError, TransitionError, ValidationError};
pub use schedule::{QuartzSchedule, ScheduleValidator};
pub use transition::{apply_decision, AuthorityRole, Decision, Transition, TRANSITIONS};
pub use types::{ApplicationId, DroneId, EntryDigest, UserId};
pub use validation::{validate_drone_reference, validate_recurrence, validate_submission};
