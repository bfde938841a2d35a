//! Store trait: the abstract interface for application and flight-log
//! persistence.
//!
//! This trait allows the kernel to be storage-agnostic. Implementations
//! include SQLite (primary) and in-memory (for tests).

use async_trait::async_trait;
use skypermit_core::{
    Application, ApplicationId, ApplicationStatus, DroneId, EntryDigest, LogRecord,
};

use crate::error::Result;

/// Result of inserting an application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertResult {
    /// Application was inserted.
    Inserted,
    /// An application with this id already exists. Nothing was written.
    AlreadyExists,
}

/// Result of a conditional application update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateResult {
    /// The stored status matched and the application was replaced.
    Updated,
    /// The stored status no longer matches the expected one.
    StatusMismatch {
        /// The status found in the store.
        actual: ApplicationStatus,
    },
    /// No application with this id exists.
    Missing,
}

/// Result of a conditional log append.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppendResult {
    /// The record was appended and is the new tail.
    Appended,
    /// The tail is no longer the expected one. Nothing was written.
    TailMoved {
        /// The tail digest found in the store.
        actual: Option<EntryDigest>,
    },
}

/// The current end of an application's flight-log chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainTail {
    pub seq: u64,
    pub digest: EntryDigest,
}

/// The Store trait: async interface for permit persistence.
///
/// All methods are async to support both sync (SQLite) and async backends.
/// For SQLite, we use `spawn_blocking` internally to avoid blocking the runtime.
///
/// # Design Notes
///
/// - **Conditional updates**: `update_application` is a compare-and-set on
///   the stored status, so concurrent transitions serialize.
/// - **Conditional appends**: `append_log_record` only writes if the chain
///   tail is still `expected_tail`, so at most one of several racing appends
///   extending the same tail wins.
/// - **Append-only logs**: there is no operation that edits or removes a
///   log record.
#[async_trait]
pub trait Store: Send + Sync {
    // ─────────────────────────────────────────────────────────────────────────
    // Application Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Insert a new application.
    async fn insert_application(&self, application: &Application) -> Result<InsertResult>;

    /// Get an application by id.
    async fn get_application(&self, id: &ApplicationId) -> Result<Option<Application>>;

    /// Replace an application if its stored status is `expected_status`.
    async fn update_application(
        &self,
        application: &Application,
        expected_status: ApplicationStatus,
    ) -> Result<UpdateResult>;

    /// All applications, oldest first.
    async fn list_applications(&self) -> Result<Vec<Application>>;

    /// Applications whose status is one of `statuses`, oldest first.
    async fn list_applications_with_status(
        &self,
        statuses: &[ApplicationStatus],
    ) -> Result<Vec<Application>>;

    /// Applications referencing a drone, oldest first.
    async fn list_applications_by_drone(&self, drone_id: DroneId) -> Result<Vec<Application>>;

    // ─────────────────────────────────────────────────────────────────────────
    // Flight-Log Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Append a record if the chain tail is still `expected_tail`.
    ///
    /// `None` expects an empty chain. The record's `seq` must be one past
    /// the tail's.
    async fn append_log_record(
        &self,
        record: &LogRecord,
        expected_tail: Option<&EntryDigest>,
    ) -> Result<AppendResult>;

    /// The current tail of an application's chain, if any entry exists.
    async fn chain_tail(&self, application_id: &ApplicationId) -> Result<Option<ChainTail>>;

    /// All records of an application's chain, ordered by seq.
    async fn log_records(&self, application_id: &ApplicationId) -> Result<Vec<LogRecord>>;
}
