use anyhow::Result;
use rusqlite::Row;

use crate::models::BatchRow;
use crate::{Database, OptionalExt};

impl Database {
    // -- Batches --

    pub fn create_batch(&self, id: &str, owner_id: &str, name: &str, batch_type: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO batches (id, owner_id, name, batch_type) VALUES (?1, ?2, ?3, ?4)",
                (id, owner_id, name, batch_type),
            )?;
            Ok(())
        })
    }

    pub fn get_batch(&self, id: &str) -> Result<Option<BatchRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, owner_id, name, batch_type, created_at FROM batches WHERE id = ?1",
                [id],
                map_batch,
            )
            .optional()
        })
    }

    pub fn list_batches_for_owner(&self, owner_id: &str) -> Result<Vec<BatchRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, owner_id, name, batch_type, created_at
                 FROM batches
                 WHERE owner_id = ?1
                 ORDER BY created_at DESC, name",
            )?;

            let rows = stmt
                .query_map([owner_id], map_batch)?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    pub fn update_batch(&self, id: &str, name: &str, batch_type: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE batches SET name = ?2, batch_type = ?3 WHERE id = ?1",
                (id, name, batch_type),
            )?;
            Ok(changed > 0)
        })
    }

    /// Ratings, actions, notes and containers go with it.
    pub fn delete_batch(&self, id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let deleted = conn.execute("DELETE FROM batches WHERE id = ?1", [id])?;
            Ok(deleted > 0)
        })
    }
}

fn map_batch(row: &Row<'_>) -> rusqlite::Result<BatchRow> {
    Ok(BatchRow {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        name: row.get(2)?,
        batch_type: row.get(3)?,
        created_at: row.get(4)?,
    })
}
