//! # SkyPermit
//!
//! Flight permissions for drone operators, and tamper-evident proof that
//! flights happened as authorized.
//!
//! ## Overview
//!
//! The kernel couples two subsystems:
//!
//! - **Approvals**: an application moves from `DRAFT` through `SUBMITTED`
//!   to an approved or rejected outcome, decided by the central
//!   administrator or by ATC followed by AFMLU
//! - **Flight logs**: once approved and flown, each permit accumulates an
//!   append-only chain of logs, each naming the digest of its predecessor
//!
//! ## Key Concepts
//!
//! - **Actor**: every call names who is acting and with which roles
//! - **Transition table**: one row per authority role, see
//!   [`core::TRANSITIONS`]
//! - **Conditional writes**: transitions compare-and-set on status, log
//!   appends compare-and-append on the chain tail
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use skypermit::{Collaborators, Kernel, KernelConfig};
//! use skypermit::core::{ApplicationForm, Submission, UserId};
//! use skypermit::perms::Actor;
//! use skypermit::store::SqliteStore;
//! # use skypermit::{ArtifactStore, DroneRegistry, UserProfiles};
//!
//! # async fn example(
//! #     drones: Arc<dyn DroneRegistry>,
//! #     profiles: Arc<dyn UserProfiles>,
//! #     artifacts: Arc<dyn ArtifactStore>,
//! # ) {
//! // Open storage
//! let store = SqliteStore::open("skypermit.db").unwrap();
//!
//! // Wire the kernel to the registry, profile and artifact services
//! let services = Collaborators::new(drones, profiles, artifacts);
//! let kernel = Kernel::new(store, services, KernelConfig::default());
//!
//! // An operator drafts an application
//! let operator = Actor::new(UserId(42));
//! let draft = kernel
//!     .create_application(&operator, ApplicationForm::default(), Submission::Draft)
//!     .await;
//! # }
//! ```
//!
//! ## Re-exports
//!
//! This crate re-exports the component crates for convenience:
//!
//! - `skypermit::core` - Core types, transitions, validation, chain digests
//! - `skypermit::store` - Storage abstraction and SQLite
//! - `skypermit::perms` - Actors, roles and access checks

pub mod collaborators;
pub mod config;
pub mod error;
pub mod flight_log;
pub mod kernel;

// Re-export component crates
pub use skypermit_core as core;
pub use skypermit_perms as perms;
pub use skypermit_store as store;

// Re-export main types for convenience
pub use collaborators::{
    ArtifactStore, Clock, Collaborators, DroneRegistry, PermissionArtifact, SystemClock,
    UserProfiles,
};
pub use config::KernelConfig;
pub use error::{ErrorKind, KernelError, Result};
pub use flight_log::FlightLogSubmission;
pub use kernel::{Kernel, AFMLU_VIEW_STATUSES, ATC_VIEW_STATUSES};

// Re-export commonly used core types
pub use skypermit_core::{
    Application, ApplicationForm, ApplicationId, ApplicationStatus, AuthorityRole, Decision,
    DroneId, EntryDigest, LogRecord, Submission, UserId,
};
pub use skypermit_perms::{Actor, Role};
