//! SQLite implementation of the Store trait.
//!
//! This is the primary storage backend for SkyPermit. It uses rusqlite
//! with bundled SQLite, wrapped in async via tokio::spawn_blocking.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Transaction};
use tracing::debug;

use skypermit_core::{
    Application, ApplicationId, ApplicationStatus, Blake3Hash, DroneId, EntryDigest,
    FlightLogEntry, LogRecord,
};

use crate::error::{Result, StoreError};
use crate::migration;
use crate::traits::{AppendResult, ChainTail, InsertResult, Store, UpdateResult};

/// SQLite-based store implementation.
///
/// Thread-safe via internal Mutex. All operations use spawn_blocking
/// to avoid blocking the async runtime. Conditional writes run inside a
/// transaction while the mutex is held.
pub struct SqliteStore {
    /// The SQLite connection, protected by a mutex.
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if it doesn't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory SQLite database.
    ///
    /// Useful for testing.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run a blocking operation on the connection off the async runtime.
    async fn run<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = conn
                .lock()
                .map_err(|e| StoreError::Poisoned(e.to_string()))?;
            f(&mut conn)
        })
        .await
        .map_err(|e| StoreError::TaskFailed(e.to_string()))?
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Row encoding
// ─────────────────────────────────────────────────────────────────────────────

fn encode_application(application: &Application) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    ciborium::into_writer(application, &mut buf)
        .map_err(|e| StoreError::Serialization(e.to_string()))?;
    Ok(buf)
}

fn decode_application(body: &[u8]) -> Result<Application> {
    ciborium::from_reader(body).map_err(|e| StoreError::Serialization(e.to_string()))
}

fn decode_status(text: &str) -> Result<ApplicationStatus> {
    text.parse().map_err(StoreError::InvalidData)
}

fn fixed<const N: usize>(bytes: Vec<u8>, column: &str) -> Result<[u8; N]> {
    bytes.try_into().map_err(|b: Vec<u8>| {
        StoreError::InvalidData(format!("{}: expected {} bytes, got {}", column, N, b.len()))
    })
}

/// A flight_logs row before conversion.
struct RawLogRow {
    seq: i64,
    digest: Vec<u8>,
    previous_hash: Option<Vec<u8>>,
    drone_uin: String,
    signature: String,
    payload_hash: Vec<u8>,
    payload: Vec<u8>,
    accepted_at: i64,
}

impl RawLogRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            seq: row.get("seq")?,
            digest: row.get("digest")?,
            previous_hash: row.get("previous_hash")?,
            drone_uin: row.get("drone_uin")?,
            signature: row.get("signature")?,
            payload_hash: row.get("payload_hash")?,
            payload: row.get("payload")?,
            accepted_at: row.get("accepted_at")?,
        })
    }

    fn into_record(self, application_id: ApplicationId) -> Result<LogRecord> {
        let previous_hash = match self.previous_hash {
            Some(bytes) => Some(EntryDigest(fixed(bytes, "previous_hash")?)),
            None => None,
        };
        Ok(LogRecord {
            seq: self.seq as u64,
            entry: FlightLogEntry {
                application_id,
                drone_uin: self.drone_uin,
                signature: self.signature,
                previous_hash,
            },
            payload_hash: Blake3Hash(fixed(self.payload_hash, "payload_hash")?),
            payload: Bytes::from(self.payload),
            digest: EntryDigest(fixed(self.digest, "digest")?),
            accepted_at: self.accepted_at,
        })
    }
}

fn query_applications(
    conn: &Connection,
    sql: &str,
    params: impl rusqlite::Params,
) -> Result<Vec<Application>> {
    let mut stmt = conn.prepare(sql)?;
    let bodies = stmt
        .query_map(params, |row| row.get::<_, Vec<u8>>(0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    bodies.iter().map(|body| decode_application(body)).collect()
}

fn tail_in(tx: &Transaction<'_>, application_id: &ApplicationId) -> Result<Option<ChainTail>> {
    let row: Option<(i64, Vec<u8>)> = tx
        .query_row(
            "SELECT seq, digest FROM flight_logs
             WHERE application_id = ?1
             ORDER BY seq DESC LIMIT 1",
            params![application_id.0.as_slice()],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;

    match row {
        Some((seq, digest)) => Ok(Some(ChainTail {
            seq: seq as u64,
            digest: EntryDigest(fixed(digest, "digest")?),
        })),
        None => Ok(None),
    }
}

#[async_trait]
impl Store for SqliteStore {
    async fn insert_application(&self, application: &Application) -> Result<InsertResult> {
        let application = application.clone();
        let body = encode_application(&application)?;

        self.run(move |conn| {
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO applications (
                    application_id, applicant_id, drone_id, status,
                    created_at, updated_at, body
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    application.id.0.as_slice(),
                    application.applicant_id.0 as i64,
                    application.drone_id().0 as i64,
                    application.status.as_str(),
                    application.created_at,
                    application.updated_at,
                    body,
                ],
            )?;

            if inserted == 0 {
                return Ok(InsertResult::AlreadyExists);
            }
            debug!(
                application_id = %application.id,
                status = %application.status,
                "inserted application"
            );
            Ok(InsertResult::Inserted)
        })
        .await
    }

    async fn get_application(&self, id: &ApplicationId) -> Result<Option<Application>> {
        let id = *id;

        self.run(move |conn| {
            let body: Option<Vec<u8>> = conn
                .query_row(
                    "SELECT body FROM applications WHERE application_id = ?1",
                    params![id.0.as_slice()],
                    |row| row.get(0),
                )
                .optional()?;
            body.map(|b| decode_application(&b)).transpose()
        })
        .await
    }

    async fn update_application(
        &self,
        application: &Application,
        expected_status: ApplicationStatus,
    ) -> Result<UpdateResult> {
        let application = application.clone();
        let body = encode_application(&application)?;

        self.run(move |conn| {
            let tx = conn.transaction()?;

            let updated = tx.execute(
                "UPDATE applications
                 SET drone_id = ?1, status = ?2, updated_at = ?3, body = ?4
                 WHERE application_id = ?5 AND status = ?6",
                params![
                    application.drone_id().0 as i64,
                    application.status.as_str(),
                    application.updated_at,
                    body,
                    application.id.0.as_slice(),
                    expected_status.as_str(),
                ],
            )?;

            let result = if updated == 1 {
                debug!(
                    application_id = %application.id,
                    status = %application.status,
                    "updated application"
                );
                UpdateResult::Updated
            } else {
                let actual: Option<String> = tx
                    .query_row(
                        "SELECT status FROM applications WHERE application_id = ?1",
                        params![application.id.0.as_slice()],
                        |row| row.get(0),
                    )
                    .optional()?;
                match actual {
                    Some(text) => {
                        let actual = decode_status(&text)?;
                        debug!(
                            application_id = %application.id,
                            expected = %expected_status,
                            %actual,
                            "conditional update lost"
                        );
                        UpdateResult::StatusMismatch { actual }
                    }
                    None => UpdateResult::Missing,
                }
            };

            tx.commit()?;
            Ok(result)
        })
        .await
    }

    async fn list_applications(&self) -> Result<Vec<Application>> {
        self.run(|conn| {
            query_applications(
                conn,
                "SELECT body FROM applications ORDER BY created_at, rowid",
                [],
            )
        })
        .await
    }

    async fn list_applications_with_status(
        &self,
        statuses: &[ApplicationStatus],
    ) -> Result<Vec<Application>> {
        if statuses.is_empty() {
            return Ok(Vec::new());
        }
        let names: Vec<&'static str> = statuses.iter().map(|s| s.as_str()).collect();

        self.run(move |conn| {
            let placeholders = vec!["?"; names.len()].join(", ");
            let sql = format!(
                "SELECT body FROM applications WHERE status IN ({}) ORDER BY created_at, rowid",
                placeholders
            );
            query_applications(conn, &sql, params_from_iter(names.iter()))
        })
        .await
    }

    async fn list_applications_by_drone(&self, drone_id: DroneId) -> Result<Vec<Application>> {
        self.run(move |conn| {
            query_applications(
                conn,
                "SELECT body FROM applications WHERE drone_id = ?1 ORDER BY created_at, rowid",
                params![drone_id.0 as i64],
            )
        })
        .await
    }

    async fn append_log_record(
        &self,
        record: &LogRecord,
        expected_tail: Option<&EntryDigest>,
    ) -> Result<AppendResult> {
        let record = record.clone();
        let expected_tail = expected_tail.copied();

        self.run(move |conn| {
            let tx = conn.transaction()?;
            let application_id = record.entry.application_id;

            let tail = tail_in(&tx, &application_id)?;
            let actual = tail.map(|t| t.digest);
            if actual != expected_tail {
                debug!(%application_id, "conditional append lost: tail moved");
                return Ok(AppendResult::TailMoved { actual });
            }

            let next_seq = tail.map_or(1, |t| t.seq + 1);
            if record.seq != next_seq {
                return Err(StoreError::InvalidData(format!(
                    "record seq {} does not follow tail seq {}",
                    record.seq,
                    next_seq - 1
                )));
            }

            tx.execute(
                "INSERT INTO flight_logs (
                    application_id, seq, digest, previous_hash, drone_uin,
                    signature, payload_hash, payload, accepted_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    application_id.0.as_slice(),
                    record.seq as i64,
                    record.digest.0.as_slice(),
                    record.entry.previous_hash.as_ref().map(|d| d.0.to_vec()),
                    record.entry.drone_uin,
                    record.entry.signature,
                    record.payload_hash.0.as_slice(),
                    record.payload.as_ref(),
                    record.accepted_at,
                ],
            )?;
            tx.commit()?;

            debug!(
                %application_id,
                seq = record.seq,
                digest = %record.digest,
                "appended log record"
            );
            Ok(AppendResult::Appended)
        })
        .await
    }

    async fn chain_tail(&self, application_id: &ApplicationId) -> Result<Option<ChainTail>> {
        let application_id = *application_id;

        self.run(move |conn| {
            let tx = conn.transaction()?;
            let tail = tail_in(&tx, &application_id)?;
            tx.commit()?;
            Ok(tail)
        })
        .await
    }

    async fn log_records(&self, application_id: &ApplicationId) -> Result<Vec<LogRecord>> {
        let application_id = *application_id;

        self.run(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT seq, digest, previous_hash, drone_uin, signature,
                        payload_hash, payload, accepted_at
                 FROM flight_logs
                 WHERE application_id = ?1
                 ORDER BY seq",
            )?;
            let rows = stmt
                .query_map(params![application_id.0.as_slice()], RawLogRow::from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            rows.into_iter()
                .map(|row| row.into_record(application_id))
                .collect()
        })
        .await
    }
}
