//! SQLite-backed checksum ledger.
//!
//! # Schema
//!
//! ```sql
//! algorithms(id, name UNIQUE, created_at, updated_at)
//! files(id, path, algorithm_id -> algorithms.id, checksum, created_at, updated_at)
//! UNIQUE INDEX path_algorithm_index ON files(path, algorithm_id)
//! ```
//!
//! Algorithm rows are registered on first use with a single idempotent
//! `INSERT OR IGNORE` and are never deleted. Every operation that touches more
//! than one statement runs inside one immediate transaction; a transaction
//! that is dropped without `commit` rolls back.

use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, ErrorCode, Transaction, TransactionBehavior};

use super::{path_key, ChecksumRecord, Ledger, LedgerError, LedgerResult, Timestamps, UpsertOutcome};
use crate::checksum::Algorithm;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS algorithms (
        id INTEGER PRIMARY KEY,
        name TEXT NOT NULL UNIQUE,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );
    CREATE TABLE IF NOT EXISTS files (
        id INTEGER PRIMARY KEY,
        path TEXT NOT NULL,
        algorithm_id INTEGER NOT NULL REFERENCES algorithms(id),
        checksum TEXT NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );
    CREATE UNIQUE INDEX IF NOT EXISTS path_algorithm_index ON files(path, algorithm_id);
";

/// How long a connection waits on a lock held by another process.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Ledger stored in a SQLite database.
pub struct SqliteLedger {
    conn: Mutex<Connection>,
    location: String,
}

impl std::fmt::Debug for SqliteLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteLedger")
            .field("location", &self.location)
            .finish_non_exhaustive()
    }
}

/// A stored row for one key, before it is turned into a record.
struct FileRow {
    id: i64,
    checksum: String,
    timestamps: Timestamps,
}

impl SqliteLedger {
    /// Open (or create) the database at `location` and ensure the schema exists.
    ///
    /// `location` is handed to SQLite unchanged, so `":memory:"` opens a
    /// private in-memory database.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened, is not a SQLite
    /// database, or the schema cannot be created.
    pub fn open(location: &str) -> LedgerResult<Self> {
        let conn = Connection::open(location)?;
        Self::init(conn, location)
    }

    /// Open a private in-memory ledger.
    ///
    /// # Errors
    ///
    /// Returns an error if the schema cannot be created.
    pub fn open_in_memory() -> LedgerResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init(conn, ":memory:")
    }

    fn init(conn: Connection, location: &str) -> LedgerResult<Self> {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(SCHEMA)?;
        let ledger = Self {
            conn: Mutex::new(conn),
            location: location.to_string(),
        };
        log::debug!(
            "Opened SQLite ledger at {} (algorithms: [{}])",
            ledger.location(),
            ledger.algorithm_names()?.join(", ")
        );
        Ok(ledger)
    }

    /// The location string the ledger was opened with.
    #[must_use]
    pub fn location(&self) -> &str {
        &self.location
    }

    /// Names of every registered algorithm, in registration order.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn algorithm_names(&self) -> LedgerResult<Vec<String>> {
        let conn = self.conn.lock().map_err(|_| LedgerError::LockPoisoned)?;
        let mut stmt = conn.prepare("SELECT name FROM algorithms ORDER BY id")?;
        let names = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(names)
    }

    /// Run `op` inside an immediate transaction, committing only on success.
    fn with_transaction<T>(
        &self,
        op: impl FnOnce(&Transaction<'_>) -> LedgerResult<T>,
    ) -> LedgerResult<T> {
        let mut conn = self.conn.lock().map_err(|_| LedgerError::LockPoisoned)?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let value = op(&tx)?;
        tx.commit()?;
        Ok(value)
    }
}

/// Register `name` if it is new and return its id.
fn resolve_algorithm(tx: &Transaction<'_>, name: &str) -> rusqlite::Result<i64> {
    let now = Utc::now();
    tx.execute(
        "INSERT OR IGNORE INTO algorithms (name, created_at, updated_at) VALUES (?1, ?2, ?2)",
        params![name, now],
    )?;
    tx.query_row(
        "SELECT id FROM algorithms WHERE name = ?1",
        params![name],
        |row| row.get(0),
    )
}

/// Every stored row for `(path, algorithm_id)`. More than one means the
/// unique index was bypassed.
fn rows_for_key(
    tx: &Transaction<'_>,
    path: &str,
    algorithm: &str,
    algorithm_id: i64,
) -> LedgerResult<Option<FileRow>> {
    let mut stmt = tx.prepare_cached(
        "SELECT id, checksum, created_at, updated_at FROM files
         WHERE path = ?1 AND algorithm_id = ?2",
    )?;
    let mut rows = stmt
        .query_map(params![path, algorithm_id], |row| {
            Ok(FileRow {
                id: row.get(0)?,
                checksum: row.get(1)?,
                timestamps: Timestamps {
                    created_at: row.get::<_, DateTime<Utc>>(2)?,
                    updated_at: row.get::<_, DateTime<Utc>>(3)?,
                },
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    match rows.len() {
        0 => Ok(None),
        1 => Ok(rows.pop()),
        count => Err(LedgerError::Inconsistent {
            path: path.to_string(),
            algorithm: algorithm.to_string(),
            count,
        }),
    }
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == ErrorCode::ConstraintViolation
                && e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

fn update_checksum(
    tx: &Transaction<'_>,
    path: &str,
    algorithm_id: i64,
    checksum: &str,
    updated_at: DateTime<Utc>,
) -> rusqlite::Result<usize> {
    tx.execute(
        "UPDATE files SET checksum = ?1, updated_at = ?2 WHERE path = ?3 AND algorithm_id = ?4",
        params![checksum, updated_at, path, algorithm_id],
    )
}

/// Insert a new row for the key. If another writer created the key first,
/// the unique-index violation is absorbed and the write becomes an update.
fn insert_checksum(
    tx: &Transaction<'_>,
    path: &str,
    algorithm_id: i64,
    checksum: &str,
) -> rusqlite::Result<UpsertOutcome> {
    let timestamps = Timestamps::now();
    let inserted = tx.execute(
        "INSERT INTO files (path, algorithm_id, checksum, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            path,
            algorithm_id,
            checksum,
            timestamps.created_at,
            timestamps.updated_at
        ],
    );

    match inserted {
        Ok(_) => Ok(UpsertOutcome::Inserted),
        Err(e) if is_unique_violation(&e) => {
            log::debug!("Write conflict on {path}; retrying as update");
            update_checksum(tx, path, algorithm_id, checksum, timestamps.updated_at)?;
            Ok(UpsertOutcome::Updated)
        }
        Err(e) => Err(e),
    }
}

impl Ledger for SqliteLedger {
    fn backend_name(&self) -> &'static str {
        "database"
    }

    fn lookup(&self, path: &Path, algorithm: Algorithm) -> LedgerResult<Option<ChecksumRecord>> {
        let key = path_key(path);
        let name = algorithm.as_str();

        let row = self.with_transaction(|tx| {
            let algorithm_id = resolve_algorithm(tx, name)?;
            rows_for_key(tx, &key, name, algorithm_id)
        })?;

        Ok(row.map(|row| {
            ChecksumRecord::new(key.as_ref(), name, row.checksum).with_timestamps(row.timestamps)
        }))
    }

    fn upsert(
        &self,
        path: &Path,
        algorithm: Algorithm,
        checksum: &str,
    ) -> LedgerResult<UpsertOutcome> {
        let key = path_key(path);
        let name = algorithm.as_str();

        self.with_transaction(|tx| {
            let algorithm_id = resolve_algorithm(tx, name)?;
            match rows_for_key(tx, &key, name, algorithm_id)? {
                Some(mut row) => {
                    row.timestamps.touch();
                    update_checksum(tx, &key, algorithm_id, checksum, row.timestamps.updated_at)?;
                    log::trace!("Updated files row {} for {key}", row.id);
                    Ok(UpsertOutcome::Updated)
                }
                None => Ok(insert_checksum(tx, &key, algorithm_id, checksum)?),
            }
        })
    }

    fn records(&self) -> LedgerResult<Vec<ChecksumRecord>> {
        let conn = self.conn.lock().map_err(|_| LedgerError::LockPoisoned)?;
        let mut stmt = conn.prepare(
            "SELECT f.path, a.name, f.checksum, f.created_at, f.updated_at
             FROM files f JOIN algorithms a ON a.id = f.algorithm_id
             ORDER BY f.id",
        )?;
        let records = stmt
            .query_map([], |row| {
                Ok(ChecksumRecord::new(
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                )
                .with_timestamps(Timestamps {
                    created_at: row.get(3)?,
                    updated_at: row.get(4)?,
                }))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }
}
