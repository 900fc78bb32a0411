//! Task repository façade: creation, audited updates, reads, and deletion.

use chrono::{DateTime, Utc};
use rusqlite::{Connection, Row, ToSql, params};

use super::filter::TaskFilter;
use super::history::{collect_changes, record_changes};
use super::{Database, fmt_instant, get_instant, get_opt_instant, map_fk, new_id, now};
use crate::error::RepoResult;
use crate::types::{NewTask, Priority, Task, TaskChanges};

/// The persistence contract for tasks.
///
/// `update` is the only path permitted to write history; the row update and
/// its audit records commit in one transaction, so a reader never observes
/// one without the other.
pub struct TaskRepository {
    db: Database,
}

impl TaskRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Create a task. Identity and both timestamps are assigned here, never
    /// by the caller; the row is written in one statement and no history is
    /// recorded for the initial state.
    pub fn create(&self, input: NewTask) -> RepoResult<Task> {
        let at = now();
        let task = Task {
            id: new_id(),
            list_id: input.list_id,
            name: input.name,
            description: input.description,
            date: input.date,
            deadline: input.deadline,
            estimated_minutes: input.estimated_minutes,
            actual_minutes: input.actual_minutes,
            priority: input.priority,
            recurrence: input.recurrence,
            completed: false,
            completed_at: None,
            deleted_at: None,
            created_at: at,
            updated_at: at,
        };

        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO tasks (
                    id, list_id, name, description, date, deadline,
                    estimated_minutes, actual_minutes, priority, recurrence,
                    completed, completed_at, deleted_at, created_at, updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
                params![
                    task.id,
                    task.list_id,
                    task.name,
                    task.description,
                    task.date.map(fmt_instant),
                    task.deadline.map(fmt_instant),
                    task.estimated_minutes,
                    task.actual_minutes,
                    task.priority.as_str(),
                    task.recurrence,
                    task.completed,
                    task.completed_at.map(fmt_instant),
                    task.deleted_at.map(fmt_instant),
                    fmt_instant(task.created_at),
                    fmt_instant(task.updated_at),
                ],
            )
            .map_err(|e| map_fk(e, "list", &task.list_id))?;
            Ok(())
        })?;

        Ok(task)
    }

    /// Fetch one live task. Trashed tasks are invisible here, as in every
    /// default read.
    pub fn find_by_id(&self, id: &str) -> RepoResult<Option<Task>> {
        self.db.with_conn(|conn| get_live_task(conn, id))
    }

    /// All live tasks matching the filter, in the contract ordering
    /// (scheduled date ascending, undated last, newest created first on ties).
    pub fn find_with_filters(&self, filter: &TaskFilter) -> RepoResult<Vec<Task>> {
        let (sql, sql_params) = filter.to_query(now());
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(&sql)?;
            let param_refs: Vec<&dyn ToSql> = sql_params.iter().map(|p| p.as_ref()).collect();
            let rows = stmt.query_map(&param_refs[..], parse_task_row)?;
            Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
        })
    }

    /// Live tasks whose deadline has passed and which are not completed.
    pub fn find_overdue(&self) -> RepoResult<Vec<Task>> {
        self.find_with_filters(&TaskFilter::default().with_overdue())
    }

    /// Apply a partial change-set to a live task.
    ///
    /// An empty change-set returns the pre-image untouched (without
    /// advancing `updated_at`); an unknown or trashed id returns `Ok(None)`.
    /// Otherwise the row update and one history row per actually-changed
    /// field commit atomically, `updated_at` is refreshed even when nothing
    /// differed, and the post-image is returned.
    pub fn update(&self, id: &str, changes: TaskChanges) -> RepoResult<Option<Task>> {
        if changes.is_empty() {
            return self.find_by_id(id);
        }

        let at = now();
        self.db.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let Some(before) = get_live_task(&tx, id)? else {
                return Ok(None);
            };
            let after = apply_changes(&before, &changes, at);
            let diff = collect_changes(&before, &after, &changes.touched_fields());

            tx.execute(
                "UPDATE tasks SET
                    list_id = ?1, name = ?2, description = ?3, date = ?4,
                    deadline = ?5, estimated_minutes = ?6, actual_minutes = ?7,
                    priority = ?8, recurrence = ?9, completed = ?10,
                    completed_at = ?11, updated_at = ?12
                 WHERE id = ?13",
                params![
                    after.list_id,
                    after.name,
                    after.description,
                    after.date.map(fmt_instant),
                    after.deadline.map(fmt_instant),
                    after.estimated_minutes,
                    after.actual_minutes,
                    after.priority.as_str(),
                    after.recurrence,
                    after.completed,
                    after.completed_at.map(fmt_instant),
                    fmt_instant(after.updated_at),
                    id,
                ],
            )
            .map_err(|e| map_fk(e, "list", &after.list_id))?;

            record_changes(&tx, id, &diff, at)?;

            tx.commit()?;
            Ok(Some(after))
        })
    }

    /// Mark a task complete. Thin wrapper over `update`, which owns the
    /// completion-instant invariant.
    pub fn mark_complete(&self, id: &str) -> RepoResult<Option<Task>> {
        self.update(id, TaskChanges::default().with_completed(true))
    }

    /// Reopen a completed task, clearing the completion instant.
    pub fn mark_incomplete(&self, id: &str) -> RepoResult<Option<Task>> {
        self.update(id, TaskChanges::default().with_completed(false))
    }

    /// Hard-delete the task and everything owned by it (subtasks, reminders,
    /// attachments, labels links, history) via cascade. Returns whether a
    /// row was removed; a missing id is `false`, never an error.
    pub fn delete(&self, id: &str) -> RepoResult<bool> {
        self.db.with_conn(|conn| {
            let removed = conn.execute("DELETE FROM tasks WHERE id = ?1", params![id])?;
            Ok(removed > 0)
        })
    }

    /// Trash a live task, hiding it from all default reads. Not audited;
    /// deletion bypasses the audit engine.
    pub fn soft_delete(&self, id: &str) -> RepoResult<bool> {
        let at = fmt_instant(now());
        self.db.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE tasks SET deleted_at = ?1, updated_at = ?1
                 WHERE id = ?2 AND deleted_at IS NULL",
                params![at, id],
            )?;
            Ok(changed > 0)
        })
    }

    /// Bring a trashed task back.
    pub fn restore(&self, id: &str) -> RepoResult<bool> {
        let at = fmt_instant(now());
        self.db.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE tasks SET deleted_at = NULL, updated_at = ?1
                 WHERE id = ?2 AND deleted_at IS NOT NULL",
                params![at, id],
            )?;
            Ok(changed > 0)
        })
    }
}

fn parse_task_row(row: &Row) -> rusqlite::Result<Task> {
    let priority_raw: String = row.get("priority")?;
    let priority = Priority::from_str(&priority_raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            0,
            rusqlite::types::Type::Text,
            format!("unknown priority: {priority_raw}").into(),
        )
    })?;

    Ok(Task {
        id: row.get("id")?,
        list_id: row.get("list_id")?,
        name: row.get("name")?,
        description: row.get("description")?,
        date: get_opt_instant(row, "date")?,
        deadline: get_opt_instant(row, "deadline")?,
        estimated_minutes: row.get("estimated_minutes")?,
        actual_minutes: row.get("actual_minutes")?,
        priority,
        recurrence: row.get("recurrence")?,
        completed: row.get("completed")?,
        completed_at: get_opt_instant(row, "completed_at")?,
        deleted_at: get_opt_instant(row, "deleted_at")?,
        created_at: get_instant(row, "created_at")?,
        updated_at: get_instant(row, "updated_at")?,
    })
}

/// Fetch a live (non-trashed) task using an existing connection.
fn get_live_task(conn: &Connection, id: &str) -> RepoResult<Option<Task>> {
    let mut stmt =
        conn.prepare("SELECT t.* FROM tasks t WHERE t.id = ?1 AND t.deleted_at IS NULL")?;

    let result = stmt.query_row(params![id], parse_task_row);

    match result {
        Ok(task) => Ok(Some(task)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Compute the post-image: effective values from the change-set over the
/// pre-image. The completion instant follows the flag: it is set exactly on
/// the false-to-true transition and cleared exactly on true-to-false.
fn apply_changes(before: &Task, changes: &TaskChanges, at: DateTime<Utc>) -> Task {
    let completed = changes.completed.unwrap_or(before.completed);
    let completed_at = if completed == before.completed {
        before.completed_at
    } else if completed {
        Some(at)
    } else {
        None
    };

    Task {
        list_id: changes
            .list_id
            .clone()
            .unwrap_or_else(|| before.list_id.clone()),
        name: changes.name.clone().unwrap_or_else(|| before.name.clone()),
        description: changes
            .description
            .clone()
            .unwrap_or_else(|| before.description.clone()),
        date: changes.date.unwrap_or(before.date),
        deadline: changes.deadline.unwrap_or(before.deadline),
        estimated_minutes: changes.estimated_minutes.unwrap_or(before.estimated_minutes),
        actual_minutes: changes.actual_minutes.unwrap_or(before.actual_minutes),
        priority: changes.priority.unwrap_or(before.priority),
        recurrence: changes
            .recurrence
            .clone()
            .unwrap_or_else(|| before.recurrence.clone()),
        completed,
        completed_at,
        updated_at: at,
        ..before.clone()
    }
}
