//! Field-level change auditing for tasks.
//!
//! The diff step compares the canonical encoding of each touched field
//! between the pre- and post-image; adding a newly tracked field is one new
//! `TrackedField` variant plus one arm in [`encode_field`].

use chrono::{DateTime, Utc};
use rusqlite::{Connection, Row, params};
use serde_json::Value;

use super::{Database, fmt_instant, get_instant};
use crate::error::RepoResult;
use crate::types::{Task, TaskHistory, TrackedField};

/// One computed field-level difference, ready to persist.
#[derive(Debug, Clone)]
pub(crate) struct FieldChange {
    pub(crate) field: TrackedField,
    pub(crate) old_value: Option<String>,
    pub(crate) new_value: Option<String>,
}

/// Canonical serialized form of a tracked field's value on `task`.
///
/// Present values become their JSON text (strings quoted, instants in the
/// stored RFC 3339 form, priority as its lowercase name); an absent value is
/// `None` and lands in the store as SQL NULL. The quoting keeps the string
/// `"null"` distinguishable from an absent value.
pub(crate) fn encode_field(field: TrackedField, task: &Task) -> Option<String> {
    let value = match field {
        TrackedField::Name => Value::String(task.name.clone()),
        TrackedField::Description => text_value(task.description.as_deref()),
        TrackedField::Date => instant_value(task.date),
        TrackedField::Deadline => instant_value(task.deadline),
        TrackedField::EstimatedMinutes => int_value(task.estimated_minutes),
        TrackedField::ActualMinutes => int_value(task.actual_minutes),
        TrackedField::Priority => Value::String(task.priority.as_str().to_string()),
        TrackedField::Recurrence => text_value(task.recurrence.as_deref()),
        TrackedField::ListId => Value::String(task.list_id.clone()),
        TrackedField::Completed => Value::Bool(task.completed),
    };
    match value {
        Value::Null => None,
        value => Some(value.to_string()),
    }
}

fn text_value(value: Option<&str>) -> Value {
    value.map_or(Value::Null, |s| Value::String(s.to_string()))
}

fn instant_value(value: Option<DateTime<Utc>>) -> Value {
    value.map_or(Value::Null, |at| Value::String(fmt_instant(at)))
}

fn int_value(value: Option<i64>) -> Value {
    value.map_or(Value::Null, |n| Value::Number(n.into()))
}

/// Diff the touched fields between the pre- and post-image. Fields absent
/// from `touched` are never candidates; equal values produce nothing.
pub(crate) fn collect_changes(
    before: &Task,
    after: &Task,
    touched: &[TrackedField],
) -> Vec<FieldChange> {
    let mut changes = Vec::new();
    for &field in touched {
        let old_value = encode_field(field, before);
        let new_value = encode_field(field, after);
        if old_value != new_value {
            changes.push(FieldChange {
                field,
                old_value,
                new_value,
            });
        }
    }
    changes
}

/// Append one history row per change, inside the caller's transaction so
/// the row update and its audit trail commit or roll back together.
pub(crate) fn record_changes(
    conn: &Connection,
    task_id: &str,
    changes: &[FieldChange],
    at: DateTime<Utc>,
) -> RepoResult<()> {
    let at = fmt_instant(at);
    for change in changes {
        debug_assert!(
            change.old_value != change.new_value,
            "a recorded change must differ: {}",
            change.field.as_str()
        );
        conn.execute(
            "INSERT INTO task_history (task_id, field, old_value, new_value, changed_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                task_id,
                change.field.as_str(),
                change.old_value,
                change.new_value,
                at
            ],
        )?;
    }
    Ok(())
}

/// Read access to the audit log.
pub struct TaskHistoryRepository {
    db: Database,
}

impl TaskHistoryRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// All recorded changes for a task, oldest first.
    pub fn find_by_task_id(&self, task_id: &str) -> RepoResult<Vec<TaskHistory>> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, task_id, field, old_value, new_value, changed_at
                 FROM task_history WHERE task_id = ?1 ORDER BY id",
            )?;
            let rows = stmt.query_map(params![task_id], parse_history_row)?;
            Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
        })
    }
}

fn parse_history_row(row: &Row) -> rusqlite::Result<TaskHistory> {
    let field_raw: String = row.get("field")?;
    let field = TrackedField::from_str(&field_raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            0,
            rusqlite::types::Type::Text,
            format!("unknown tracked field: {field_raw}").into(),
        )
    })?;

    Ok(TaskHistory {
        id: row.get("id")?,
        task_id: row.get("task_id")?,
        field,
        old_value: row.get("old_value")?,
        new_value: row.get("new_value")?,
        changed_at: get_instant(row, "changed_at")?,
    })
}
