//! # SkyPermit Testkit
//!
//! Testing utilities for SkyPermit.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Fixtures**: in-memory registry, profile and artifact services, a
//!   manual clock, and a kernel wired to a cast of actors
//! - **Generators**: Proptest strategies for property-based testing
//!
//! ## Test Fixtures
//!
//! Quickly set up test scenarios:
//!
//! ```rust,ignore
//! use skypermit_testkit::fixtures::TestFixture;
//!
//! let fixture = TestFixture::new();
//! let application = fixture.approved_application().await;
//! fixture.finish_flight(&application);
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use skypermit_testkit::generators::{chain_from_params, ChainParams};
//!
//! proptest! {
//!     #[test]
//!     fn chains_verify(params: ChainParams) {
//!         let records = chain_from_params(&params);
//!         prop_assert!(skypermit_core::verify_chain(&records).is_ok());
//!     }
//! }
//! ```

pub mod fixtures;
pub mod generators;

pub use fixtures::{
    flight_log_document, valid_form, ManualClock, MemoryArtifacts, MemoryDroneRegistry,
    StaticProfiles, TestFixture,
};
pub use generators::{chain_from_params, ChainParams};
