use anyhow::Result;
use rusqlite::{Row, params};

use crate::models::NoteRow;
use crate::{Database, OptionalExt};

impl Database {
    // -- Notes --

    pub fn insert_note(&self, id: &str, batch_id: &str, author_id: &str, title: &str, body: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO batch_notes (id, batch_id, author_id, title, body) VALUES (?1, ?2, ?3, ?4, ?5)",
                params![id, batch_id, author_id, title, body],
            )?;
            Ok(())
        })
    }

    pub fn get_note(&self, id: &str) -> Result<Option<NoteRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, batch_id, author_id, title, body, created_at FROM batch_notes WHERE id = ?1",
                [id],
                map_note,
            )
            .optional()
        })
    }

    pub fn list_notes_for_batch(&self, batch_id: &str) -> Result<Vec<NoteRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, batch_id, author_id, title, body, created_at
                 FROM batch_notes
                 WHERE batch_id = ?1
                 ORDER BY created_at DESC, rowid DESC",
            )?;

            let rows = stmt
                .query_map([batch_id], map_note)?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    pub fn update_note(&self, id: &str, title: &str, body: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE batch_notes SET title = ?2, body = ?3 WHERE id = ?1",
                (id, title, body),
            )?;
            Ok(changed > 0)
        })
    }

    pub fn delete_note(&self, id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let deleted = conn.execute("DELETE FROM batch_notes WHERE id = ?1", [id])?;
            Ok(deleted > 0)
        })
    }
}

fn map_note(row: &Row<'_>) -> rusqlite::Result<NoteRow> {
    Ok(NoteRow {
        id: row.get(0)?,
        batch_id: row.get(1)?,
        author_id: row.get(2)?,
        title: row.get(3)?,
        body: row.get(4)?,
        created_at: row.get(5)?,
    })
}
