//! Domain types for the task planner core.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::RepoResult;

/// Task priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
    #[default]
    None,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
            Priority::None => "none",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "high" => Some(Priority::High),
            "medium" => Some(Priority::Medium),
            "low" => Some(Priority::Low),
            "none" => Some(Priority::None),
            _ => None,
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Priority::from_str(&s.to_lowercase())
            .ok_or_else(|| format!("unknown priority '{s}' (expected high, medium, low, or none)"))
    }
}

/// The central schedulable unit of work.
///
/// `completed == true` iff `completed_at` is set; the repository maintains
/// that invariant on every write. A task with `deleted_at` set is trashed
/// and excluded from all default reads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub list_id: String,
    pub name: String,
    pub description: Option<String>,
    /// Scheduled instant; drives list ordering.
    pub date: Option<DateTime<Utc>>,
    /// Due instant; drives the overdue criterion.
    pub deadline: Option<DateTime<Utc>>,
    pub estimated_minutes: Option<i64>,
    pub actual_minutes: Option<i64>,
    pub priority: Priority,
    /// Opaque recurrence rule, stored as-is and not interpreted here.
    pub recurrence: Option<String>,
    pub completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a task. Identity and timestamps are assigned by the
/// repository, never the caller.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewTask {
    pub list_id: String,
    pub name: String,
    pub description: Option<String>,
    pub date: Option<DateTime<Utc>>,
    pub deadline: Option<DateTime<Utc>>,
    pub estimated_minutes: Option<i64>,
    pub actual_minutes: Option<i64>,
    #[serde(default)]
    pub priority: Priority,
    pub recurrence: Option<String>,
}

impl NewTask {
    pub fn new(list_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            list_id: list_id.into(),
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_date(mut self, date: DateTime<Utc>) -> Self {
        self.date = Some(date);
        self
    }

    pub fn with_deadline(mut self, deadline: DateTime<Utc>) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_estimated_minutes(mut self, minutes: i64) -> Self {
        self.estimated_minutes = Some(minutes);
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_recurrence(mut self, rule: impl Into<String>) -> Self {
        self.recurrence = Some(rule.into());
        self
    }
}

/// A partial change-set for an existing task.
///
/// The outer `Option` is presence in the change-set; for nullable fields the
/// inner `Option` is the requested value, so `Some(None)` clears the field.
/// Fields left `None` are never touched and never diffed.
#[derive(Debug, Clone, Default)]
pub struct TaskChanges {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub date: Option<Option<DateTime<Utc>>>,
    pub deadline: Option<Option<DateTime<Utc>>>,
    pub estimated_minutes: Option<Option<i64>>,
    pub actual_minutes: Option<Option<i64>>,
    pub priority: Option<Priority>,
    pub recurrence: Option<Option<String>>,
    pub list_id: Option<String>,
    pub completed: Option<bool>,
}

impl TaskChanges {
    /// True when no field is present, i.e. the update is a no-op.
    pub fn is_empty(&self) -> bool {
        self.touched_fields().is_empty()
    }

    /// The tracked fields present in this change-set, in declaration order.
    /// Only these are candidates for diffing.
    pub fn touched_fields(&self) -> Vec<TrackedField> {
        let mut fields = Vec::new();
        if self.name.is_some() {
            fields.push(TrackedField::Name);
        }
        if self.description.is_some() {
            fields.push(TrackedField::Description);
        }
        if self.date.is_some() {
            fields.push(TrackedField::Date);
        }
        if self.deadline.is_some() {
            fields.push(TrackedField::Deadline);
        }
        if self.estimated_minutes.is_some() {
            fields.push(TrackedField::EstimatedMinutes);
        }
        if self.actual_minutes.is_some() {
            fields.push(TrackedField::ActualMinutes);
        }
        if self.priority.is_some() {
            fields.push(TrackedField::Priority);
        }
        if self.recurrence.is_some() {
            fields.push(TrackedField::Recurrence);
        }
        if self.list_id.is_some() {
            fields.push(TrackedField::ListId);
        }
        if self.completed.is_some() {
            fields.push(TrackedField::Completed);
        }
        fields
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = Some(description);
        self
    }

    pub fn with_date(mut self, date: Option<DateTime<Utc>>) -> Self {
        self.date = Some(date);
        self
    }

    pub fn with_deadline(mut self, deadline: Option<DateTime<Utc>>) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_estimated_minutes(mut self, minutes: Option<i64>) -> Self {
        self.estimated_minutes = Some(minutes);
        self
    }

    pub fn with_actual_minutes(mut self, minutes: Option<i64>) -> Self {
        self.actual_minutes = Some(minutes);
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn with_recurrence(mut self, rule: Option<String>) -> Self {
        self.recurrence = Some(rule);
        self
    }

    pub fn with_list(mut self, list_id: impl Into<String>) -> Self {
        self.list_id = Some(list_id.into());
        self
    }

    pub fn with_completed(mut self, completed: bool) -> Self {
        self.completed = Some(completed);
        self
    }
}

/// The task attributes the audit engine tracks.
///
/// `completed_at` is deliberately absent: toggling completion is recorded
/// under `Completed` with the boolean before/after values, and the
/// completion instant follows the flag rather than being diffed itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackedField {
    Name,
    Description,
    Date,
    Deadline,
    EstimatedMinutes,
    ActualMinutes,
    Priority,
    Recurrence,
    ListId,
    Completed,
}

impl TrackedField {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrackedField::Name => "name",
            TrackedField::Description => "description",
            TrackedField::Date => "date",
            TrackedField::Deadline => "deadline",
            TrackedField::EstimatedMinutes => "estimated_minutes",
            TrackedField::ActualMinutes => "actual_minutes",
            TrackedField::Priority => "priority",
            TrackedField::Recurrence => "recurrence",
            TrackedField::ListId => "list_id",
            TrackedField::Completed => "completed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "name" => Some(TrackedField::Name),
            "description" => Some(TrackedField::Description),
            "date" => Some(TrackedField::Date),
            "deadline" => Some(TrackedField::Deadline),
            "estimated_minutes" => Some(TrackedField::EstimatedMinutes),
            "actual_minutes" => Some(TrackedField::ActualMinutes),
            "priority" => Some(TrackedField::Priority),
            "recurrence" => Some(TrackedField::Recurrence),
            "list_id" => Some(TrackedField::ListId),
            "completed" => Some(TrackedField::Completed),
            _ => None,
        }
    }
}

/// One recorded field-level change. Append-only; never updated.
///
/// `old_value`/`new_value` hold the canonical JSON text of the field value
/// (`"null"` is a string, absent is `None`), so values round-trip back to
/// comparable form via [`TaskHistory::old_value_json`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskHistory {
    pub id: i64,
    pub task_id: String,
    pub field: TrackedField,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub changed_at: DateTime<Utc>,
}

impl TaskHistory {
    /// Decode the serialized old value back to JSON.
    pub fn old_value_json(&self) -> RepoResult<Option<Value>> {
        decode_value(&self.old_value)
    }

    /// Decode the serialized new value back to JSON.
    pub fn new_value_json(&self) -> RepoResult<Option<Value>> {
        decode_value(&self.new_value)
    }
}

fn decode_value(raw: &Option<String>) -> RepoResult<Option<Value>> {
    match raw {
        None => Ok(None),
        Some(text) => Ok(Some(serde_json::from_str(text)?)),
    }
}

/// A list owning tasks. Every task belongs to exactly one list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct List {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// A label, attachable to any number of tasks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Label {
    pub id: String,
    pub name: String,
    pub color: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A subtask owned by one task; removed when the task is deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subtask {
    pub id: String,
    pub task_id: String,
    pub name: String,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
}

/// A reminder owned by one task. Delivery is an external concern.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reminder {
    pub id: String,
    pub task_id: String,
    pub remind_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// File metadata attached to a task. Content handling is an external concern.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attachment {
    pub id: String,
    pub task_id: String,
    pub file_name: String,
    pub file_path: String,
    pub created_at: DateTime<Utc>,
}
