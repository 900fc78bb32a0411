//! Database layer: connection handle, schema migrations, and the
//! repositories built on top of it.

pub mod attachments;
pub mod filter;
pub mod history;
pub mod labels;
pub mod lists;
pub mod reminders;
pub mod subtasks;
pub mod tasks;

use std::path::Path;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, SecondsFormat, Timelike, Utc};
use rusqlite::{Connection, Row};
use uuid::Uuid;

use crate::error::{RepoError, RepoResult};

mod embedded {
    use refinery::embed_migrations;
    embed_migrations!("migrations");
}

/// Database handle wrapping a SQLite connection.
///
/// The connection is never exposed outside this module; repositories scope
/// every statement and transaction through the closure helpers below.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open or create the database at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> RepoResult<Self> {
        let conn = Connection::open(path)?;

        // Enable WAL mode for concurrent access
        conn.execute_batch(
            "PRAGMA journal_mode=WAL;
             PRAGMA foreign_keys=ON;
             PRAGMA busy_timeout=5000;",
        )?;

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };

        db.run_migrations()?;

        Ok(db)
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> RepoResult<Self> {
        let conn = Connection::open_in_memory()?;

        conn.execute_batch("PRAGMA foreign_keys=ON;")?;

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };

        db.run_migrations()?;

        Ok(db)
    }

    /// Run database migrations.
    fn run_migrations(&self) -> RepoResult<()> {
        let mut conn = self.conn.lock().unwrap();
        embedded::migrations::runner().run(&mut *conn)?;
        Ok(())
    }

    /// Execute a function with exclusive access to the connection.
    pub(crate) fn with_conn<F, T>(&self, f: F) -> RepoResult<T>
    where
        F: FnOnce(&Connection) -> RepoResult<T>,
    {
        let conn = self.conn.lock().unwrap();
        f(&conn)
    }

    /// Execute a function with mutable access to the connection (for transactions).
    pub(crate) fn with_conn_mut<F, T>(&self, f: F) -> RepoResult<T>
    where
        F: FnOnce(&mut Connection) -> RepoResult<T>,
    {
        let mut conn = self.conn.lock().unwrap();
        f(&mut conn)
    }
}

/// Generate a fresh time-ordered identifier.
pub fn new_id() -> String {
    Uuid::now_v7().to_string()
}

/// Current instant, truncated to the stored millisecond precision so a
/// returned post-image compares equal to its re-read row.
pub fn now() -> DateTime<Utc> {
    let now = Utc::now();
    now.with_nanosecond(now.nanosecond() / 1_000_000 * 1_000_000)
        .unwrap_or(now)
}

/// Encode an instant in the single stored form: RFC 3339 UTC with fixed
/// millisecond precision (`2026-08-25T12:34:56.789Z`), which sorts
/// lexicographically.
pub fn fmt_instant(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Decode a stored instant.
pub fn parse_instant(raw: &str) -> chrono::ParseResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw).map(|at| at.with_timezone(&Utc))
}

/// Read a required instant column.
pub(crate) fn get_instant(row: &Row, col: &str) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(col)?;
    parse_instant(&raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })
}

/// Read a nullable instant column.
pub(crate) fn get_opt_instant(row: &Row, col: &str) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let raw: Option<String> = row.get(col)?;
    match raw {
        None => Ok(None),
        Some(raw) => parse_instant(&raw).map(Some).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
        }),
    }
}

/// Map a foreign key violation to `InvalidReference` against the entity the
/// statement references; any other failure passes through as `Storage`.
pub(crate) fn map_fk(err: rusqlite::Error, entity: &'static str, id: &str) -> RepoError {
    if is_fk_violation(&err) {
        RepoError::invalid_reference(entity, id)
    } else {
        err.into()
    }
}

fn is_fk_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY
    )
}
