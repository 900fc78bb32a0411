//! Filter criteria and query assembly for task list views.
//!
//! Criteria combine with AND; an omitted criterion imposes no constraint.
//! Every criterion value is bound as a parameter, never written into the
//! query text.

use chrono::{DateTime, Utc};
use rusqlite::ToSql;

use super::fmt_instant;
use crate::types::Priority;

/// Result ordering for every list read: scheduled date ascending with
/// undated tasks last, ties broken by newest creation first.
const TASK_ORDER: &str = "ORDER BY t.date IS NULL, t.date, t.created_at DESC";

/// An optional set of constraints selecting a subset of tasks.
#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    /// Exact match on the owning list.
    pub list_id: Option<String>,
    /// Inclusive lower bound on the scheduled date.
    pub date_from: Option<DateTime<Utc>>,
    /// Inclusive upper bound on the scheduled date.
    pub date_to: Option<DateTime<Utc>>,
    /// Exact match on the completion flag.
    pub completed: Option<bool>,
    /// Exact match on priority.
    pub priority: Option<Priority>,
    /// Restrict to tasks whose deadline has passed and which are not yet
    /// completed. Independent of and additive with the date bounds.
    pub overdue: bool,
    /// Substring match against name or description, insensitive to ASCII
    /// case. The term is matched literally; pattern characters carry no
    /// meaning.
    pub search: Option<String>,
    /// Restrict to tasks carrying the given label.
    pub label_id: Option<String>,
}

impl TaskFilter {
    pub fn with_list(mut self, list_id: impl Into<String>) -> Self {
        self.list_id = Some(list_id.into());
        self
    }

    pub fn with_date_from(mut self, from: DateTime<Utc>) -> Self {
        self.date_from = Some(from);
        self
    }

    pub fn with_date_to(mut self, to: DateTime<Utc>) -> Self {
        self.date_to = Some(to);
        self
    }

    pub fn with_completed(mut self, completed: bool) -> Self {
        self.completed = Some(completed);
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn with_overdue(mut self) -> Self {
        self.overdue = true;
        self
    }

    pub fn with_search(mut self, term: impl Into<String>) -> Self {
        self.search = Some(term.into());
        self
    }

    pub fn with_label(mut self, label_id: impl Into<String>) -> Self {
        self.label_id = Some(label_id.into());
        self
    }

    /// Render this filter into a SELECT with bound parameters. `now` anchors
    /// the overdue comparison so reads stay pure.
    pub(crate) fn to_query(&self, now: DateTime<Utc>) -> (String, Vec<Box<dyn ToSql>>) {
        let mut builder = QueryBuilder::new();

        // Trashed tasks are invisible to every default read.
        builder.push("t.deleted_at IS NULL", vec![]);

        if let Some(ref list_id) = self.list_id {
            builder.push("t.list_id = ?", vec![Box::new(list_id.clone())]);
        }
        if let Some(from) = self.date_from {
            builder.push("t.date >= ?", vec![Box::new(fmt_instant(from))]);
        }
        if let Some(to) = self.date_to {
            builder.push("t.date <= ?", vec![Box::new(fmt_instant(to))]);
        }
        if let Some(completed) = self.completed {
            builder.push("t.completed = ?", vec![Box::new(completed)]);
        }
        if let Some(priority) = self.priority {
            builder.push("t.priority = ?", vec![Box::new(priority.as_str())]);
        }
        if self.overdue {
            builder.push(
                "(t.deadline < ? AND t.completed = 0)",
                vec![Box::new(fmt_instant(now))],
            );
        }
        if let Some(ref term) = self.search {
            // SQLite's LOWER() folds ASCII only, so the term must fold the
            // same alphabet or non-ASCII text stored verbatim never matches.
            let pattern = format!("%{}%", escape_like(&term.to_ascii_lowercase()));
            builder.push(
                "(LOWER(t.name) LIKE ? ESCAPE '\\' OR LOWER(t.description) LIKE ? ESCAPE '\\')",
                vec![Box::new(pattern.clone()), Box::new(pattern)],
            );
        }
        if let Some(ref label_id) = self.label_id {
            builder.push(
                "EXISTS (SELECT 1 FROM task_labels tl \
                 WHERE tl.task_id = t.id AND tl.label_id = ?)",
                vec![Box::new(label_id.clone())],
            );
        }

        builder.into_query("SELECT t.* FROM tasks t", TASK_ORDER)
    }
}

/// Accumulates `(predicate, bound values)` pairs and joins them with AND at
/// the end, so criterion values never reach the SQL text.
struct QueryBuilder {
    clauses: Vec<String>,
    params: Vec<Box<dyn ToSql>>,
}

impl QueryBuilder {
    fn new() -> Self {
        Self {
            clauses: Vec::new(),
            params: Vec::new(),
        }
    }

    fn push(&mut self, clause: &str, values: Vec<Box<dyn ToSql>>) {
        debug_assert_eq!(
            clause.matches('?').count(),
            values.len(),
            "predicate placeholders must match bound values: {clause}"
        );
        self.clauses.push(clause.to_string());
        self.params.extend(values);
    }

    fn into_query(self, base: &str, order: &str) -> (String, Vec<Box<dyn ToSql>>) {
        let mut sql = base.to_string();
        if !self.clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&self.clauses.join(" AND "));
        }
        sql.push(' ');
        sql.push_str(order);
        (sql, self.params)
    }
}

/// Escape LIKE pattern characters so a search term matches literally.
fn escape_like(term: &str) -> String {
    let mut out = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::now;

    #[test]
    fn escape_like_leaves_plain_terms_alone() {
        assert_eq!(escape_like("buy groceries"), "buy groceries");
    }

    #[test]
    fn escape_like_escapes_pattern_characters() {
        assert_eq!(escape_like("100%"), "100\\%");
        assert_eq!(escape_like("a_b"), "a\\_b");
        assert_eq!(escape_like("back\\slash"), "back\\\\slash");
        assert_eq!(escape_like("%_\\"), "\\%\\_\\\\");
    }

    #[test]
    fn empty_filter_selects_all_live_tasks_with_ordering() {
        let (sql, params) = TaskFilter::default().to_query(now());
        assert_eq!(
            sql,
            "SELECT t.* FROM tasks t WHERE t.deleted_at IS NULL \
             ORDER BY t.date IS NULL, t.date, t.created_at DESC"
        );
        assert!(params.is_empty());
    }

    #[test]
    fn each_criterion_contributes_one_predicate() {
        let filter = TaskFilter::default()
            .with_list("list-1")
            .with_completed(false)
            .with_priority(Priority::Low);
        let (sql, params) = filter.to_query(now());
        assert!(sql.contains("t.list_id = ?"));
        assert!(sql.contains("t.completed = ?"));
        assert!(sql.contains("t.priority = ?"));
        assert_eq!(sql.matches(" AND ").count(), 3);
        assert_eq!(params.len(), 3);
    }

    #[test]
    fn search_binds_the_pattern_once_per_column() {
        let (sql, params) = TaskFilter::default().with_search("buy").to_query(now());
        assert!(sql.contains("LOWER(t.name) LIKE ? ESCAPE '\\'"));
        assert!(sql.contains("LOWER(t.description) LIKE ? ESCAPE '\\'"));
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn overdue_compares_deadline_and_open_state() {
        let (sql, params) = TaskFilter::default().with_overdue().to_query(now());
        assert!(sql.contains("(t.deadline < ? AND t.completed = 0)"));
        assert_eq!(params.len(), 1);
    }

    #[test]
    fn label_criterion_uses_the_association_table() {
        let (sql, params) = TaskFilter::default().with_label("label-9").to_query(now());
        assert!(sql.contains("EXISTS (SELECT 1 FROM task_labels tl"));
        assert_eq!(params.len(), 1);
    }

    #[test]
    fn placeholder_count_always_matches_bound_values() {
        let filter = TaskFilter::default()
            .with_list("l")
            .with_date_from(now())
            .with_date_to(now())
            .with_completed(true)
            .with_priority(Priority::High)
            .with_overdue()
            .with_search("x")
            .with_label("lab");
        let (sql, params) = filter.to_query(now());
        assert_eq!(sql.matches('?').count(), params.len());
    }
}
