//! Label storage and the task/label many-to-many relation behind the
//! label filter criterion.

use rusqlite::{Row, params};

use super::{Database, fmt_instant, get_instant, map_fk, new_id, now};
use crate::error::{RepoError, RepoResult};
use crate::types::Label;

pub struct LabelRepository {
    db: Database,
}

impl LabelRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn create(&self, name: impl Into<String>, color: Option<String>) -> RepoResult<Label> {
        let label = Label {
            id: new_id(),
            name: name.into(),
            color,
            created_at: now(),
        };

        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO labels (id, name, color, created_at) VALUES (?1, ?2, ?3, ?4)",
                params![label.id, label.name, label.color, fmt_instant(label.created_at)],
            )?;
            Ok(())
        })?;

        Ok(label)
    }

    pub fn find_all(&self) -> RepoResult<Vec<Label>> {
        self.db.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT id, name, color, created_at FROM labels ORDER BY name")?;
            let rows = stmt.query_map([], parse_label_row)?;
            Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
        })
    }

    /// Delete a label everywhere; its task links go with it. Idempotent.
    pub fn delete(&self, id: &str) -> RepoResult<bool> {
        self.db.with_conn(|conn| {
            let removed = conn.execute("DELETE FROM labels WHERE id = ?1", params![id])?;
            Ok(removed > 0)
        })
    }

    /// Link a label to a task. Attaching an already-attached pair is a
    /// no-op; an unknown task or label id is an `InvalidReference`.
    pub fn attach(&self, task_id: &str, label_id: &str) -> RepoResult<()> {
        self.db.with_conn(|conn| {
            // Check the task side explicitly so the error names the right
            // entity; the link table's FK failure alone cannot tell them apart.
            let task_exists: bool = conn
                .query_row("SELECT 1 FROM tasks WHERE id = ?1", params![task_id], |_| {
                    Ok(true)
                })
                .unwrap_or(false);
            if !task_exists {
                return Err(RepoError::invalid_reference("task", task_id));
            }

            conn.execute(
                "INSERT OR IGNORE INTO task_labels (task_id, label_id) VALUES (?1, ?2)",
                params![task_id, label_id],
            )
            .map_err(|e| map_fk(e, "label", label_id))?;
            Ok(())
        })
    }

    /// Remove a link. Returns whether one existed.
    pub fn detach(&self, task_id: &str, label_id: &str) -> RepoResult<bool> {
        self.db.with_conn(|conn| {
            let removed = conn.execute(
                "DELETE FROM task_labels WHERE task_id = ?1 AND label_id = ?2",
                params![task_id, label_id],
            )?;
            Ok(removed > 0)
        })
    }

    pub fn find_by_task_id(&self, task_id: &str) -> RepoResult<Vec<Label>> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT l.id, l.name, l.color, l.created_at
                 FROM labels l
                 JOIN task_labels tl ON tl.label_id = l.id
                 WHERE tl.task_id = ?1
                 ORDER BY l.name",
            )?;
            let rows = stmt.query_map(params![task_id], parse_label_row)?;
            Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
        })
    }
}

fn parse_label_row(row: &Row) -> rusqlite::Result<Label> {
    Ok(Label {
        id: row.get("id")?,
        name: row.get("name")?,
        color: row.get("color")?,
        created_at: get_instant(row, "created_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::lists::ListRepository;
    use crate::db::tasks::TaskRepository;
    use crate::types::NewTask;

    fn setup() -> (LabelRepository, TaskRepository, String) {
        let db = Database::open_in_memory().expect("in-memory database");
        let list = ListRepository::new(db.clone())
            .create("Personal")
            .expect("create list");
        (
            LabelRepository::new(db.clone()),
            TaskRepository::new(db),
            list.id,
        )
    }

    #[test]
    fn attach_and_detach_round_trip() {
        let (labels, tasks, list_id) = setup();
        let task = tasks.create(NewTask::new(&list_id, "Paint fence")).unwrap();
        let urgent = labels.create("urgent", Some("#d00".into())).unwrap();
        let outdoor = labels.create("outdoor", None).unwrap();

        labels.attach(&task.id, &urgent.id).unwrap();
        labels.attach(&task.id, &outdoor.id).unwrap();
        // Attaching twice changes nothing.
        labels.attach(&task.id, &urgent.id).unwrap();

        let names: Vec<String> = labels
            .find_by_task_id(&task.id)
            .unwrap()
            .into_iter()
            .map(|l| l.name)
            .collect();
        assert_eq!(names, vec!["outdoor", "urgent"]);

        assert!(labels.detach(&task.id, &urgent.id).unwrap());
        assert!(!labels.detach(&task.id, &urgent.id).unwrap());
        assert_eq!(labels.find_by_task_id(&task.id).unwrap().len(), 1);
    }

    #[test]
    fn attach_rejects_unknown_task_and_label() {
        let (labels, tasks, list_id) = setup();
        let task = tasks.create(NewTask::new(&list_id, "Real task")).unwrap();
        let label = labels.create("real", None).unwrap();

        let err = labels.attach("no-such-task", &label.id).unwrap_err();
        assert!(err.is_invalid_reference());
        assert!(err.to_string().contains("task"));

        let err = labels.attach(&task.id, "no-such-label").unwrap_err();
        assert!(err.is_invalid_reference());
        assert!(err.to_string().contains("label"));
    }
}
