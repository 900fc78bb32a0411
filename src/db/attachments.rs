//! Attachment metadata storage. Only names and paths live here; file
//! content never enters the database.

use rusqlite::{Row, params};

use super::{Database, fmt_instant, get_instant, map_fk, new_id, now};
use crate::error::RepoResult;
use crate::types::Attachment;

pub struct AttachmentRepository {
    db: Database,
}

impl AttachmentRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn create(
        &self,
        task_id: &str,
        file_name: impl Into<String>,
        file_path: impl Into<String>,
    ) -> RepoResult<Attachment> {
        let attachment = Attachment {
            id: new_id(),
            task_id: task_id.to_string(),
            file_name: file_name.into(),
            file_path: file_path.into(),
            created_at: now(),
        };

        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO attachments (id, task_id, file_name, file_path, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    attachment.id,
                    attachment.task_id,
                    attachment.file_name,
                    attachment.file_path,
                    fmt_instant(attachment.created_at),
                ],
            )
            .map_err(|e| map_fk(e, "task", task_id))?;
            Ok(())
        })?;

        Ok(attachment)
    }

    pub fn find_by_task_id(&self, task_id: &str) -> RepoResult<Vec<Attachment>> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, task_id, file_name, file_path, created_at
                 FROM attachments WHERE task_id = ?1 ORDER BY created_at",
            )?;
            let rows = stmt.query_map(params![task_id], parse_attachment_row)?;
            Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
        })
    }

    pub fn delete(&self, id: &str) -> RepoResult<bool> {
        self.db.with_conn(|conn| {
            let removed = conn.execute("DELETE FROM attachments WHERE id = ?1", params![id])?;
            Ok(removed > 0)
        })
    }
}

fn parse_attachment_row(row: &Row) -> rusqlite::Result<Attachment> {
    Ok(Attachment {
        id: row.get("id")?,
        task_id: row.get("task_id")?,
        file_name: row.get("file_name")?,
        file_path: row.get("file_path")?,
        created_at: get_instant(row, "created_at")?,
    })
}
