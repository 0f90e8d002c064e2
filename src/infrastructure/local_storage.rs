//! Local SQLite storage for feeding sessions.
//!
//! One database file per data directory, opened once per process and shared
//! by every operation. Each call runs on tokio's blocking pool so the caller
//! only suspends, it never blocks the event loop.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef};
use rusqlite::{params, Connection, Row, ToSql};

use crate::domain::{AppError, FeedingSession, NewSession, Result, SyncStatus};

/// Version stamped into `PRAGMA user_version` once the schema exists.
pub const SCHEMA_VERSION: i64 = 1;

const SESSION_COLUMNS: &str = "id, start_time, end_time, duration_ms, amount_ml, sync_status";

const SCHEMA: &str = r"
    CREATE TABLE IF NOT EXISTS sessions (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        start_time INTEGER NOT NULL,
        end_time INTEGER NOT NULL,
        duration_ms INTEGER NOT NULL,
        amount_ml INTEGER NOT NULL,
        sync_status TEXT NOT NULL,
        CHECK (end_time >= start_time),
        CHECK (duration_ms = end_time - start_time),
        CHECK (amount_ml >= 0),
        CHECK (sync_status IN ('pending', 'synced'))
    );

    CREATE INDEX IF NOT EXISTS idx_sessions_start_time
        ON sessions(start_time);
    CREATE INDEX IF NOT EXISTS idx_sessions_sync_status
        ON sessions(sync_status);
";

impl ToSql for SyncStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for SyncStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e: AppError| FromSqlError::Other(Box::new(e)))
    }
}

/// Session repository using SQLite.
#[derive(Clone)]
pub struct SessionStore {
    conn: Arc<Mutex<Connection>>,
}

impl SessionStore {
    /// Opens or creates the session database and makes sure the schema exists.
    ///
    /// # Errors
    /// Returns `StorageUnavailable` if the file cannot be opened, the schema
    /// cannot be created, or the database was written by a newer version.
    pub async fn open(path: &Path) -> Result<Self> {
        let path = path.to_path_buf();
        let target = path.clone();

        let conn = tokio::task::spawn_blocking(move || open_connection(&target))
            .await
            .map_err(|e| AppError::StorageUnavailable {
                path: path.clone(),
                message: format!("open task failed: {e}"),
            })??;

        tracing::debug!(path = %path.display(), "Session store ready");

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Adds a session and returns it with its store-assigned id.
    ///
    /// # Errors
    /// Returns error if the write fails; nothing is stored in that case.
    pub async fn insert(&self, session: NewSession) -> Result<FeedingSession> {
        self.with_conn(move |conn| {
            let tx = conn.transaction().map_err(AppError::database)?;
            tx.execute(
                r"
            INSERT INTO sessions (start_time, end_time, duration_ms, amount_ml, sync_status)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ",
                params![
                    session.start_time().timestamp_millis(),
                    session.end_time().timestamp_millis(),
                    session.duration_ms(),
                    session.amount_ml(),
                    session.sync_status(),
                ],
            )
            .map_err(AppError::database)?;
            let id = tx.last_insert_rowid();
            tx.commit().map_err(AppError::database)?;

            tracing::debug!(id, "Session inserted");
            Ok(session.with_id(id))
        })
        .await
    }

    /// Every stored session in id order.
    pub async fn get_all(&self) -> Result<Vec<FeedingSession>> {
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare(&format!("SELECT {SESSION_COLUMNS} FROM sessions ORDER BY id"))
                .map_err(AppError::database)?;

            let rows = stmt
                .query_map([], row_to_session)
                .map_err(AppError::database)?;

            rows.collect::<rusqlite::Result<Vec<_>>>()
                .map_err(AppError::database)
        })
        .await
    }

    /// Sessions with the given sync status, looked up through the status index.
    pub async fn get_by_status(&self, status: SyncStatus) -> Result<Vec<FeedingSession>> {
        self.with_conn(move |conn| {
            let mut stmt = conn
                .prepare(&format!(
                    "SELECT {SESSION_COLUMNS} FROM sessions INDEXED BY idx_sessions_sync_status
                     WHERE sync_status = ?1 ORDER BY id"
                ))
                .map_err(AppError::database)?;

            let rows = stmt
                .query_map([status], row_to_session)
                .map_err(AppError::database)?;

            rows.collect::<rusqlite::Result<Vec<_>>>()
                .map_err(AppError::database)
        })
        .await
    }

    /// Replaces the record with the same id, inserting it if missing.
    pub async fn update(&self, session: &FeedingSession) -> Result<()> {
        let session = session.clone();
        self.with_conn(move |conn| {
            conn.execute(
                r"
            INSERT INTO sessions (id, start_time, end_time, duration_ms, amount_ml, sync_status)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(id) DO UPDATE SET
                start_time = excluded.start_time,
                end_time = excluded.end_time,
                duration_ms = excluded.duration_ms,
                amount_ml = excluded.amount_ml,
                sync_status = excluded.sync_status
            ",
                params![
                    session.id,
                    session.start_time.timestamp_millis(),
                    session.end_time.timestamp_millis(),
                    session.duration_ms,
                    session.amount_ml,
                    session.sync_status,
                ],
            )
            .map_err(AppError::database)?;

            Ok(())
        })
        .await
    }

    /// Number of stored sessions.
    pub async fn count(&self) -> Result<usize> {
        self.with_conn(|conn| {
            conn.query_row("SELECT COUNT(*) FROM sessions", [], |row| {
                row.get::<_, i64>(0)
            })
            .map(|c| usize::try_from(c).unwrap_or_default())
            .map_err(AppError::database)
        })
        .await
    }

    /// Runs `op` against the shared connection on the blocking pool.
    async fn with_conn<T, F>(&self, op: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);

        tokio::task::spawn_blocking(move || {
            let mut guard = conn.lock().map_err(|_| AppError::Database {
                message: "session store lock poisoned".into(),
                source: None,
            })?;
            op(&mut guard)
        })
        .await
        .map_err(|e| AppError::Database {
            message: format!("storage task failed: {e}"),
            source: None,
        })?
    }
}

fn open_connection(path: &Path) -> Result<Connection> {
    let unavailable = |message: String| AppError::StorageUnavailable {
        path: path.to_path_buf(),
        message,
    };

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| unavailable(format!("cannot create directory: {e}")))?;
    }

    let mut conn = Connection::open(path).map_err(|e| unavailable(e.to_string()))?;

    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA synchronous = NORMAL;",
    )
    .map_err(|e| unavailable(e.to_string()))?;

    init_schema(&mut conn).map_err(|e| match e {
        AppError::StorageUnavailable { .. } => e,
        other => unavailable(other.to_string()),
    })?;

    Ok(conn)
}

/// Creates the schema on first open and checks the version on later opens.
fn init_schema(conn: &mut Connection) -> Result<()> {
    let version: i64 = conn
        .query_row("PRAGMA user_version", [], |row| row.get(0))
        .map_err(AppError::database)?;

    match version {
        0 => {
            let tx = conn.transaction().map_err(AppError::database)?;
            tx.execute_batch(SCHEMA).map_err(AppError::database)?;
            tx.pragma_update(None, "user_version", SCHEMA_VERSION)
                .map_err(AppError::database)?;
            tx.commit().map_err(AppError::database)?;

            tracing::info!(version = SCHEMA_VERSION, "Created session schema");
            Ok(())
        }
        SCHEMA_VERSION => Ok(()),
        newer => Err(AppError::StorageUnavailable {
            path: conn.path().map(PathBuf::from).unwrap_or_default(),
            message: format!(
                "schema version {newer} is newer than supported version {SCHEMA_VERSION}"
            ),
        }),
    }
}

fn row_to_session(row: &Row) -> rusqlite::Result<FeedingSession> {
    Ok(FeedingSession {
        id: row.get(0)?,
        start_time: millis_column(row, 1)?,
        end_time: millis_column(row, 2)?,
        duration_ms: row.get(3)?,
        amount_ml: row.get(4)?,
        sync_status: row.get(5)?,
    })
}

fn millis_column(row: &Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let millis: i64 = row.get(idx)?;
    DateTime::from_timestamp_millis(millis)
        .ok_or(rusqlite::Error::IntegralValueOutOfRange(idx, millis))
}
