//! Reminder storage. Rows only; actually firing a reminder is someone
//! else's job.

use chrono::{DateTime, Utc};
use rusqlite::{Row, params};

use super::{Database, fmt_instant, get_instant, map_fk, new_id, now};
use crate::error::RepoResult;
use crate::types::Reminder;

pub struct ReminderRepository {
    db: Database,
}

impl ReminderRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn create(&self, task_id: &str, remind_at: DateTime<Utc>) -> RepoResult<Reminder> {
        let reminder = Reminder {
            id: new_id(),
            task_id: task_id.to_string(),
            remind_at,
            created_at: now(),
        };

        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO reminders (id, task_id, remind_at, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    reminder.id,
                    reminder.task_id,
                    fmt_instant(reminder.remind_at),
                    fmt_instant(reminder.created_at),
                ],
            )
            .map_err(|e| map_fk(e, "task", task_id))?;
            Ok(())
        })?;

        Ok(reminder)
    }

    pub fn find_by_task_id(&self, task_id: &str) -> RepoResult<Vec<Reminder>> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, task_id, remind_at, created_at
                 FROM reminders WHERE task_id = ?1 ORDER BY remind_at",
            )?;
            let rows = stmt.query_map(params![task_id], parse_reminder_row)?;
            Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
        })
    }

    pub fn delete(&self, id: &str) -> RepoResult<bool> {
        self.db.with_conn(|conn| {
            let removed = conn.execute("DELETE FROM reminders WHERE id = ?1", params![id])?;
            Ok(removed > 0)
        })
    }
}

fn parse_reminder_row(row: &Row) -> rusqlite::Result<Reminder> {
    Ok(Reminder {
        id: row.get("id")?,
        task_id: row.get("task_id")?,
        remind_at: get_instant(row, "remind_at")?,
        created_at: get_instant(row, "created_at")?,
    })
}
