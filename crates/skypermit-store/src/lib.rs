//! # SkyPermit Store
//!
//! Storage abstraction for SkyPermit. Provides a trait-based interface
//! for application and flight-log persistence with SQLite and in-memory
//! implementations.
//!
//! ## Overview
//!
//! The store module abstracts storage behind the [`Store`] trait, allowing
//! the kernel to be storage-agnostic. The primary implementation is
//! [`SqliteStore`], with [`MemoryStore`] for testing.
//!
//! ## Key Types
//!
//! - [`Store`] - The async trait for all storage operations
//! - [`SqliteStore`] - SQLite-based persistent storage
//! - [`MemoryStore`] - In-memory storage for tests
//! - [`UpdateResult`] - Outcome of a status compare-and-set
//! - [`AppendResult`] - Outcome of a tail compare-and-append
//!
//! ## Usage
//!
//! ```rust,no_run
//! use skypermit_store::{SqliteStore, Store};
//!
//! async fn example() {
//!     // Open a SQLite database
//!     let store = SqliteStore::open("skypermit.db").unwrap();
//!
//!     // Or use an in-memory database for testing
//!     let store = SqliteStore::open_memory().unwrap();
//!
//!     let applications = store.list_applications().await.unwrap();
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **Conditional updates**: application writes name the status they expect
//! - **Conditional appends**: log appends name the tail digest they extend
//! - **Append-only logs**: no operation edits or removes a log record

pub mod error;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{AppendResult, ChainTail, InsertResult, Store, UpdateResult};
