use anyhow::Result;
use rusqlite::{Row, params};

use crate::models::ActionRow;
use crate::{Database, OptionalExt};

impl Database {
    // -- Actions --

    pub fn insert_action(
        &self,
        id: &str,
        batch_id: &str,
        performer_id: &str,
        title: &str,
        description: &str,
        action_type: &str,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO batch_actions (id, batch_id, performer_id, title, description, action_type)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![id, batch_id, performer_id, title, description, action_type],
            )?;
            Ok(())
        })
    }

    pub fn get_action(&self, id: &str) -> Result<Option<ActionRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, batch_id, performer_id, title, description, action_type, performed_at
                 FROM batch_actions WHERE id = ?1",
                [id],
                map_action,
            )
            .optional()
        })
    }

    /// Newest first.
    pub fn list_actions_for_batch(&self, batch_id: &str) -> Result<Vec<ActionRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, batch_id, performer_id, title, description, action_type, performed_at
                 FROM batch_actions
                 WHERE batch_id = ?1
                 ORDER BY performed_at DESC, rowid DESC",
            )?;

            let rows = stmt
                .query_map([batch_id], map_action)?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    pub fn delete_action(&self, id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let deleted = conn.execute("DELETE FROM batch_actions WHERE id = ?1", [id])?;
            Ok(deleted > 0)
        })
    }
}

fn map_action(row: &Row<'_>) -> rusqlite::Result<ActionRow> {
    Ok(ActionRow {
        id: row.get(0)?,
        batch_id: row.get(1)?,
        performer_id: row.get(2)?,
        title: row.get(3)?,
        description: row.get(4)?,
        action_type: row.get(5)?,
        performed_at: row.get(6)?,
    })
}
