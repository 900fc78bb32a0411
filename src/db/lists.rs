//! List storage. Every task belongs to exactly one list, so this is where
//! the cascade that removes a list's tasks (and their audit trail) starts.

use rusqlite::{Row, params};

use super::{Database, fmt_instant, get_instant, new_id, now};
use crate::error::RepoResult;
use crate::types::List;

pub struct ListRepository {
    db: Database,
}

impl ListRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn create(&self, name: impl Into<String>) -> RepoResult<List> {
        let list = List {
            id: new_id(),
            name: name.into(),
            created_at: now(),
        };

        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO lists (id, name, created_at) VALUES (?1, ?2, ?3)",
                params![list.id, list.name, fmt_instant(list.created_at)],
            )?;
            Ok(())
        })?;

        Ok(list)
    }

    pub fn find_by_id(&self, id: &str) -> RepoResult<Option<List>> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT id, name, created_at FROM lists WHERE id = ?1")?;
            match stmt.query_row(params![id], parse_list_row) {
                Ok(list) => Ok(Some(list)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
    }

    /// Look a list up by its display name. Names are not unique; the oldest
    /// match wins, which keeps repeated `add` runs targeting the same list.
    pub fn find_by_name(&self, name: &str) -> RepoResult<Option<List>> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, name, created_at FROM lists
                 WHERE name = ?1 ORDER BY created_at LIMIT 1",
            )?;
            match stmt.query_row(params![name], parse_list_row) {
                Ok(list) => Ok(Some(list)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
    }

    pub fn find_all(&self) -> RepoResult<Vec<List>> {
        self.db.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT id, name, created_at FROM lists ORDER BY created_at")?;
            let rows = stmt.query_map([], parse_list_row)?;
            Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
        })
    }

    /// Delete a list and, via cascade, every task in it. Idempotent.
    pub fn delete(&self, id: &str) -> RepoResult<bool> {
        self.db.with_conn(|conn| {
            let removed = conn.execute("DELETE FROM lists WHERE id = ?1", params![id])?;
            Ok(removed > 0)
        })
    }
}

fn parse_list_row(row: &Row) -> rusqlite::Result<List> {
    Ok(List {
        id: row.get("id")?,
        name: row.get("name")?,
        created_at: get_instant(row, "created_at")?,
    })
}
