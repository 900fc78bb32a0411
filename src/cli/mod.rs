//! CLI command definitions for task-ledger.
//!
//! This module defines the command surface using clap's derive macros.
//! Only parsing and flag-to-domain mapping happen here; everything that
//! touches storage lives in the entry point.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use clap::{Args, Parser, Subcommand};

use crate::db::filter::TaskFilter;
use crate::types::{NewTask, Priority, TaskChanges};

/// Task planner with an audited change history
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the database file (default: <data dir>/task-ledger/tasks.db)
    #[arg(short, long, global = true)]
    pub database: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Logging output: 0/off, 1/stdout, 2/stderr (default), or filename
    #[arg(short, long, default_value = "2", global = true)]
    pub log: String,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Add a task
    Add(AddArgs),

    /// List tasks (default if no subcommand given)
    List(ListArgs),

    /// Change fields on a task, recording every change in its history
    Edit(EditArgs),

    /// Mark a task complete
    Done {
        /// Task id
        id: String,
    },

    /// Reopen a completed task
    Reopen {
        /// Task id
        id: String,
    },

    /// Move a task to the trash (recoverable with `restore`)
    Trash {
        /// Task id
        id: String,
    },

    /// Bring a task back from the trash
    Restore {
        /// Task id
        id: String,
    },

    /// Delete a task permanently, together with its history
    Rm {
        /// Task id
        id: String,
    },

    /// Show a task's change history
    History {
        /// Task id
        id: String,
    },

    /// Show all lists
    Lists,

    /// Add a list
    AddList {
        /// List name
        name: String,
    },
}

/// Arguments for the add subcommand
#[derive(Args, Debug)]
pub struct AddArgs {
    /// Task name
    pub name: String,

    /// List to add the task to (created on first use)
    #[arg(long, default_value = "Inbox", value_name = "NAME")]
    pub list: String,

    /// Longer description
    #[arg(long)]
    pub description: Option<String>,

    /// Scheduled date (RFC 3339 or YYYY-MM-DD)
    #[arg(long, value_parser = parse_cli_instant, value_name = "DATE")]
    pub date: Option<DateTime<Utc>>,

    /// Deadline (RFC 3339 or YYYY-MM-DD)
    #[arg(long, value_parser = parse_cli_instant, value_name = "DATE")]
    pub deadline: Option<DateTime<Utc>>,

    /// Estimated effort in minutes
    #[arg(long, value_name = "MINUTES")]
    pub estimate: Option<i64>,

    /// Priority: high, medium, low, or none
    #[arg(short, long)]
    pub priority: Option<Priority>,

    /// Recurrence rule, stored verbatim
    #[arg(long, value_name = "RULE")]
    pub recurrence: Option<String>,
}

impl AddArgs {
    /// Build the creation payload once the list name is resolved to an id.
    pub fn to_new_task(&self, list_id: &str) -> NewTask {
        NewTask {
            list_id: list_id.to_string(),
            name: self.name.clone(),
            description: self.description.clone(),
            date: self.date,
            deadline: self.deadline,
            estimated_minutes: self.estimate,
            actual_minutes: None,
            priority: self.priority.unwrap_or_default(),
            recurrence: self.recurrence.clone(),
        }
    }
}

/// Arguments for the list subcommand. All criteria combine with AND.
#[derive(Args, Debug, Default)]
pub struct ListArgs {
    /// Only tasks in this list
    #[arg(long, value_name = "NAME")]
    pub list: Option<String>,

    /// Only tasks scheduled on or after this date
    #[arg(long, value_parser = parse_cli_instant, value_name = "DATE")]
    pub from: Option<DateTime<Utc>>,

    /// Only tasks scheduled on or before this date
    #[arg(long, value_parser = parse_cli_instant, value_name = "DATE")]
    pub to: Option<DateTime<Utc>>,

    /// Only completed tasks
    #[arg(long, conflicts_with = "open")]
    pub done: bool,

    /// Only tasks not yet completed
    #[arg(long)]
    pub open: bool,

    /// Only tasks with this priority
    #[arg(short, long)]
    pub priority: Option<Priority>,

    /// Only tasks past their deadline and not completed
    #[arg(long)]
    pub overdue: bool,

    /// Case-insensitive substring match on name or description
    #[arg(short, long, value_name = "TEXT")]
    pub search: Option<String>,

    /// Only tasks carrying this label
    #[arg(long, value_name = "NAME")]
    pub label: Option<String>,
}

impl ListArgs {
    /// Build the storage filter. List and label names must already be
    /// resolved to ids by the caller.
    pub fn to_filter(&self, list_id: Option<String>, label_id: Option<String>) -> TaskFilter {
        TaskFilter {
            list_id,
            date_from: self.from,
            date_to: self.to,
            completed: match (self.done, self.open) {
                (true, _) => Some(true),
                (_, true) => Some(false),
                _ => None,
            },
            priority: self.priority,
            overdue: self.overdue,
            search: self.search.clone(),
            label_id,
        }
    }
}

/// Arguments for the edit subcommand. Only flags that are given touch the
/// task; the `--clear-*` flags null a field out instead of setting it.
#[derive(Args, Debug, Default)]
pub struct EditArgs {
    /// Task id
    pub id: String,

    /// Rename the task
    #[arg(long)]
    pub name: Option<String>,

    /// Replace the description
    #[arg(long, conflicts_with = "clear_description")]
    pub description: Option<String>,

    /// Remove the description
    #[arg(long)]
    pub clear_description: bool,

    /// Reschedule (RFC 3339 or YYYY-MM-DD)
    #[arg(long, value_parser = parse_cli_instant, value_name = "DATE", conflicts_with = "clear_date")]
    pub date: Option<DateTime<Utc>>,

    /// Unschedule the task
    #[arg(long)]
    pub clear_date: bool,

    /// Move the deadline (RFC 3339 or YYYY-MM-DD)
    #[arg(long, value_parser = parse_cli_instant, value_name = "DATE", conflicts_with = "clear_deadline")]
    pub deadline: Option<DateTime<Utc>>,

    /// Drop the deadline
    #[arg(long)]
    pub clear_deadline: bool,

    /// Estimated effort in minutes
    #[arg(long, value_name = "MINUTES", conflicts_with = "clear_estimate")]
    pub estimate: Option<i64>,

    /// Drop the estimate
    #[arg(long)]
    pub clear_estimate: bool,

    /// Actual effort in minutes
    #[arg(long, value_name = "MINUTES", conflicts_with = "clear_actual")]
    pub actual: Option<i64>,

    /// Drop the recorded actual effort
    #[arg(long)]
    pub clear_actual: bool,

    /// Priority: high, medium, low, or none
    #[arg(long)]
    pub priority: Option<Priority>,

    /// Recurrence rule, stored verbatim
    #[arg(long, value_name = "RULE", conflicts_with = "clear_recurrence")]
    pub recurrence: Option<String>,

    /// Stop the task recurring
    #[arg(long)]
    pub clear_recurrence: bool,

    /// Move the task to another list
    #[arg(long, value_name = "NAME")]
    pub list: Option<String>,
}

impl EditArgs {
    /// Fold the flags into a change-set. The list name, if any, must
    /// already be resolved to an id by the caller.
    pub fn to_changes(&self, list_id: Option<String>) -> TaskChanges {
        let mut changes = TaskChanges {
            name: self.name.clone(),
            priority: self.priority,
            list_id,
            ..TaskChanges::default()
        };

        if self.clear_description {
            changes.description = Some(None);
        } else if let Some(text) = &self.description {
            changes.description = Some(Some(text.clone()));
        }

        if self.clear_date {
            changes.date = Some(None);
        } else if self.date.is_some() {
            changes.date = Some(self.date);
        }

        if self.clear_deadline {
            changes.deadline = Some(None);
        } else if self.deadline.is_some() {
            changes.deadline = Some(self.deadline);
        }

        if self.clear_estimate {
            changes.estimated_minutes = Some(None);
        } else if self.estimate.is_some() {
            changes.estimated_minutes = Some(self.estimate);
        }

        if self.clear_actual {
            changes.actual_minutes = Some(None);
        } else if self.actual.is_some() {
            changes.actual_minutes = Some(self.actual);
        }

        if self.clear_recurrence {
            changes.recurrence = Some(None);
        } else if let Some(rule) = &self.recurrence {
            changes.recurrence = Some(Some(rule.clone()));
        }

        changes
    }
}

/// Parse a user-supplied instant: a full RFC 3339 timestamp, or a bare
/// `YYYY-MM-DD` which becomes midnight UTC.
pub fn parse_cli_instant(raw: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Ok(at.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|midnight| Utc.from_utc_datetime(&midnight))
        .ok_or_else(|| format!("expected RFC 3339 or YYYY-MM-DD, got {raw:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_cli_instant_accepts_both_forms() {
        let midnight = parse_cli_instant("2026-08-25").unwrap();
        assert_eq!(midnight.to_rfc3339(), "2026-08-25T00:00:00+00:00");

        let precise = parse_cli_instant("2026-08-25T09:15:00Z").unwrap();
        assert_eq!(precise.timestamp(), midnight.timestamp() + 9 * 3600 + 15 * 60);

        assert!(parse_cli_instant("yesterday").is_err());
    }

    #[test]
    fn list_flags_map_onto_the_filter() {
        let args = ListArgs {
            done: true,
            overdue: true,
            search: Some("groceries".into()),
            ..ListArgs::default()
        };
        let filter = args.to_filter(Some("list-1".into()), None);

        assert_eq!(filter.list_id.as_deref(), Some("list-1"));
        assert_eq!(filter.completed, Some(true));
        assert!(filter.overdue);
        assert_eq!(filter.search.as_deref(), Some("groceries"));
        assert!(filter.label_id.is_none());
    }

    #[test]
    fn clear_flags_become_explicit_nulls() {
        let args = EditArgs {
            id: "t1".into(),
            name: Some("Renamed".into()),
            clear_description: true,
            clear_deadline: true,
            ..EditArgs::default()
        };
        let changes = args.to_changes(None);

        assert_eq!(changes.name.as_deref(), Some("Renamed"));
        assert_eq!(changes.description, Some(None));
        assert_eq!(changes.deadline, Some(None));
        assert!(changes.date.is_none());
    }
}
