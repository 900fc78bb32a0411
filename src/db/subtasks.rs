//! Subtask storage. Plain owned rows; no audit trail and no derived fields.

use rusqlite::{Row, params};

use super::{Database, fmt_instant, get_instant, map_fk, new_id, now};
use crate::error::RepoResult;
use crate::types::Subtask;

pub struct SubtaskRepository {
    db: Database,
}

impl SubtaskRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn create(&self, task_id: &str, name: impl Into<String>) -> RepoResult<Subtask> {
        let subtask = Subtask {
            id: new_id(),
            task_id: task_id.to_string(),
            name: name.into(),
            completed: false,
            created_at: now(),
        };

        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO subtasks (id, task_id, name, completed, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    subtask.id,
                    subtask.task_id,
                    subtask.name,
                    subtask.completed,
                    fmt_instant(subtask.created_at),
                ],
            )
            .map_err(|e| map_fk(e, "task", task_id))?;
            Ok(())
        })?;

        Ok(subtask)
    }

    pub fn find_by_task_id(&self, task_id: &str) -> RepoResult<Vec<Subtask>> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, task_id, name, completed, created_at
                 FROM subtasks WHERE task_id = ?1 ORDER BY created_at",
            )?;
            let rows = stmt.query_map(params![task_id], parse_subtask_row)?;
            Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
        })
    }

    /// Flip the checkbox. Returns whether the subtask existed.
    pub fn set_completed(&self, id: &str, completed: bool) -> RepoResult<bool> {
        self.db.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE subtasks SET completed = ?1 WHERE id = ?2",
                params![completed, id],
            )?;
            Ok(changed > 0)
        })
    }

    pub fn delete(&self, id: &str) -> RepoResult<bool> {
        self.db.with_conn(|conn| {
            let removed = conn.execute("DELETE FROM subtasks WHERE id = ?1", params![id])?;
            Ok(removed > 0)
        })
    }
}

fn parse_subtask_row(row: &Row) -> rusqlite::Result<Subtask> {
    Ok(Subtask {
        id: row.get("id")?,
        task_id: row.get("task_id")?,
        name: row.get("name")?,
        completed: row.get("completed")?,
        created_at: get_instant(row, "created_at")?,
    })
}
