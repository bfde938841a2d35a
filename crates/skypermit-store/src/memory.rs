//! In-memory implementation of the Store trait.
//!
//! This is primarily for testing. It has the same semantics as SQLite
//! but keeps everything in memory with no persistence.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use tracing::debug;

use skypermit_core::{
    Application, ApplicationId, ApplicationStatus, DroneId, EntryDigest, LogRecord,
};

use crate::error::{Result, StoreError};
use crate::traits::{AppendResult, ChainTail, InsertResult, Store, UpdateResult};

/// In-memory store implementation.
///
/// All data is lost when the store is dropped. Thread-safe via RwLock;
/// conditional writes hold the write lock for the whole check-and-write.
pub struct MemoryStore {
    inner: RwLock<MemoryStoreInner>,
}

#[derive(Default)]
struct MemoryStoreInner {
    /// Applications indexed by id.
    applications: HashMap<ApplicationId, Application>,

    /// Insertion order, for stable listings.
    order: Vec<ApplicationId>,

    /// Flight-log chains, each ordered by seq.
    logs: HashMap<ApplicationId, Vec<LogRecord>>,
}

impl MemoryStoreInner {
    fn ordered(&self, mut filter: impl FnMut(&Application) -> bool) -> Vec<Application> {
        self.order
            .iter()
            .filter_map(|id| self.applications.get(id))
            .filter(|app| filter(*app))
            .cloned()
            .collect()
    }
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(MemoryStoreInner::default()),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, MemoryStoreInner>> {
        self.inner
            .read()
            .map_err(|e| StoreError::Poisoned(e.to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, MemoryStoreInner>> {
        self.inner
            .write()
            .map_err(|e| StoreError::Poisoned(e.to_string()))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_application(&self, application: &Application) -> Result<InsertResult> {
        let mut inner = self.write()?;

        if inner.applications.contains_key(&application.id) {
            return Ok(InsertResult::AlreadyExists);
        }

        inner.order.push(application.id);
        inner
            .applications
            .insert(application.id, application.clone());

        debug!(
            application_id = %application.id,
            status = %application.status,
            "inserted application"
        );
        Ok(InsertResult::Inserted)
    }

    async fn get_application(&self, id: &ApplicationId) -> Result<Option<Application>> {
        let inner = self.read()?;
        Ok(inner.applications.get(id).cloned())
    }

    async fn update_application(
        &self,
        application: &Application,
        expected_status: ApplicationStatus,
    ) -> Result<UpdateResult> {
        let mut inner = self.write()?;

        let stored = match inner.applications.get_mut(&application.id) {
            Some(stored) => stored,
            None => return Ok(UpdateResult::Missing),
        };

        if stored.status != expected_status {
            debug!(
                application_id = %application.id,
                expected = %expected_status,
                actual = %stored.status,
                "conditional update lost"
            );
            return Ok(UpdateResult::StatusMismatch {
                actual: stored.status,
            });
        }

        *stored = application.clone();
        debug!(
            application_id = %application.id,
            status = %application.status,
            "updated application"
        );
        Ok(UpdateResult::Updated)
    }

    async fn list_applications(&self) -> Result<Vec<Application>> {
        let inner = self.read()?;
        Ok(inner.ordered(|_| true))
    }

    async fn list_applications_with_status(
        &self,
        statuses: &[ApplicationStatus],
    ) -> Result<Vec<Application>> {
        let inner = self.read()?;
        Ok(inner.ordered(|app| statuses.contains(&app.status)))
    }

    async fn list_applications_by_drone(&self, drone_id: DroneId) -> Result<Vec<Application>> {
        let inner = self.read()?;
        Ok(inner.ordered(|app| app.drone_id() == drone_id))
    }

    async fn append_log_record(
        &self,
        record: &LogRecord,
        expected_tail: Option<&EntryDigest>,
    ) -> Result<AppendResult> {
        let mut inner = self.write()?;
        let application_id = record.entry.application_id;
        let chain = inner.logs.entry(application_id).or_default();

        let actual = chain.last().map(|r| r.digest);
        if actual.as_ref() != expected_tail {
            debug!(%application_id, "conditional append lost: tail moved");
            return Ok(AppendResult::TailMoved { actual });
        }

        let next_seq = chain.len() as u64 + 1;
        if record.seq != next_seq {
            return Err(StoreError::InvalidData(format!(
                "record seq {} does not follow tail seq {}",
                record.seq,
                next_seq - 1
            )));
        }

        chain.push(record.clone());
        debug!(%application_id, seq = record.seq, digest = %record.digest, "appended log record");
        Ok(AppendResult::Appended)
    }

    async fn chain_tail(&self, application_id: &ApplicationId) -> Result<Option<ChainTail>> {
        let inner = self.read()?;
        Ok(inner
            .logs
            .get(application_id)
            .and_then(|chain| chain.last())
            .map(|r| ChainTail {
                seq: r.seq,
                digest: r.digest,
            }))
    }

    async fn log_records(&self, application_id: &ApplicationId) -> Result<Vec<LogRecord>> {
        let inner = self.read()?;
        Ok(inner.logs.get(application_id).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use skypermit_core::{ApplicationForm, FlightLogEntry, Submission, UserId};

    fn application(id: u8, drone: u64, submission: Submission) -> Application {
        Application::new(
            ApplicationId::from_bytes([id; 16]),
            UserId(1),
            ApplicationForm {
                drone_id: DroneId(drone),
                start_at: 0,
                end_at: 10,
                ..ApplicationForm::default()
            },
            Some("UA0001".into()),
            submission,
            id as i64,
        )
    }

    fn record(app: ApplicationId, seq: u64, previous_hash: Option<EntryDigest>) -> LogRecord {
        let entry = FlightLogEntry::new(app, "UA0001", format!("sig-{}", seq), previous_hash);
        LogRecord::seal(seq, entry, Bytes::from(format!("log {}", seq)), 100)
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let store = MemoryStore::new();
        let app = application(1, 7, Submission::Draft);

        assert_eq!(store.insert_application(&app).await.unwrap(), InsertResult::Inserted);
        assert_eq!(
            store.insert_application(&app).await.unwrap(),
            InsertResult::AlreadyExists
        );
        assert_eq!(store.get_application(&app.id).await.unwrap(), Some(app));
    }

    #[tokio::test]
    async fn test_update_is_compare_and_set() {
        let store = MemoryStore::new();
        let mut app = application(1, 7, Submission::Submit);
        store.insert_application(&app).await.unwrap();

        app.status = ApplicationStatus::Approved;
        assert_eq!(
            store
                .update_application(&app, ApplicationStatus::Submitted)
                .await
                .unwrap(),
            UpdateResult::Updated
        );

        // a second writer still expecting SUBMITTED loses
        app.status = ApplicationStatus::Rejected;
        assert_eq!(
            store
                .update_application(&app, ApplicationStatus::Submitted)
                .await
                .unwrap(),
            UpdateResult::StatusMismatch {
                actual: ApplicationStatus::Approved
            }
        );

        let stored = store.get_application(&app.id).await.unwrap().unwrap();
        assert_eq!(stored.status, ApplicationStatus::Approved);
    }

    #[tokio::test]
    async fn test_update_missing() {
        let store = MemoryStore::new();
        let app = application(1, 7, Submission::Draft);
        assert_eq!(
            store
                .update_application(&app, ApplicationStatus::Draft)
                .await
                .unwrap(),
            UpdateResult::Missing
        );
    }

    #[tokio::test]
    async fn test_listings() {
        let store = MemoryStore::new();
        store.insert_application(&application(1, 7, Submission::Draft)).await.unwrap();
        store.insert_application(&application(2, 8, Submission::Submit)).await.unwrap();
        store.insert_application(&application(3, 7, Submission::Submit)).await.unwrap();

        let all = store.list_applications().await.unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].id, ApplicationId::from_bytes([1; 16]));

        let submitted = store
            .list_applications_with_status(&[ApplicationStatus::Submitted])
            .await
            .unwrap();
        assert_eq!(submitted.len(), 2);

        let by_drone = store.list_applications_by_drone(DroneId(7)).await.unwrap();
        let ids: Vec<_> = by_drone.iter().map(|a| a.id.0[0]).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[tokio::test]
    async fn test_append_requires_expected_tail() {
        let store = MemoryStore::new();
        let app = ApplicationId::from_bytes([1; 16]);

        let first = record(app, 1, None);
        assert_eq!(
            store.append_log_record(&first, None).await.unwrap(),
            AppendResult::Appended
        );

        // a stale writer that still believes the chain is empty
        let stale = record(app, 1, None);
        assert_eq!(
            store.append_log_record(&stale, None).await.unwrap(),
            AppendResult::TailMoved {
                actual: Some(first.digest)
            }
        );

        let second = record(app, 2, Some(first.digest));
        assert_eq!(
            store
                .append_log_record(&second, Some(&first.digest))
                .await
                .unwrap(),
            AppendResult::Appended
        );

        let tail = store.chain_tail(&app).await.unwrap().unwrap();
        assert_eq!(tail.seq, 2);
        assert_eq!(tail.digest, second.digest);
        assert_eq!(store.log_records(&app).await.unwrap(), vec![first, second]);
    }

    #[tokio::test]
    async fn test_append_rejects_seq_gap() {
        let store = MemoryStore::new();
        let app = ApplicationId::from_bytes([1; 16]);
        let skipped = record(app, 2, None);
        assert!(matches!(
            store.append_log_record(&skipped, None).await,
            Err(StoreError::InvalidData(_))
        ));
        assert!(store.chain_tail(&app).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_chains_are_per_application() {
        let store = MemoryStore::new();
        let a = ApplicationId::from_bytes([1; 16]);
        let b = ApplicationId::from_bytes([2; 16]);

        store.append_log_record(&record(a, 1, None), None).await.unwrap();
        assert_eq!(
            store.append_log_record(&record(b, 1, None), None).await.unwrap(),
            AppendResult::Appended
        );
        assert!(store.log_records(&ApplicationId::from_bytes([3; 16])).await.unwrap().is_empty());
    }

    proptest::proptest! {
        #[test]
        fn test_stale_appends_never_land(len in 1usize..8, stale in 0usize..8) {
            let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
            runtime.block_on(async {
                let store = MemoryStore::new();
                let app = ApplicationId::from_bytes([5; 16]);
                let mut chain: Vec<LogRecord> = Vec::new();
                for seq in 1..=len as u64 {
                    let tail = chain.last().map(|r| r.digest);
                    let next = record(app, seq, tail);
                    store.append_log_record(&next, tail.as_ref()).await.unwrap();
                    chain.push(next);
                }

                // Any predecessor other than the tail is stale
                let stale = stale % len;
                let stale_tail = if stale == 0 { None } else { Some(chain[stale - 1].digest) };
                let late = record(app, len as u64 + 1, stale_tail);
                let result = store.append_log_record(&late, stale_tail.as_ref()).await.unwrap();
                assert_eq!(
                    result,
                    AppendResult::TailMoved { actual: chain.last().map(|r| r.digest) }
                );
                assert_eq!(store.log_records(&app).await.unwrap(), chain);
            });
        }
    }
}
