use anyhow::Result;
use rusqlite::{Row, params};

use crate::models::ContainerRow;
use crate::{Database, OptionalExt};

const CONTAINER_COLUMNS: &str = "id, batch_id, owner_id, name, volume, unit, created_at";

impl Database {
    // -- Containers --

    pub fn insert_container(
        &self,
        id: &str,
        batch_id: &str,
        owner_id: &str,
        name: &str,
        volume: Option<f64>,
        unit: Option<&str>,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO containers (id, batch_id, owner_id, name, volume, unit) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![id, batch_id, owner_id, name, volume, unit],
            )?;
            Ok(())
        })
    }

    pub fn get_container(&self, id: &str) -> Result<Option<ContainerRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                &format!("SELECT {CONTAINER_COLUMNS} FROM containers WHERE id = ?1"),
                [id],
                map_container,
            )
            .optional()
        })
    }

    pub fn list_containers_for_owner(&self, owner_id: &str) -> Result<Vec<ContainerRow>> {
        self.list_containers_where("owner_id", owner_id)
    }

    pub fn list_containers_for_batch(&self, batch_id: &str) -> Result<Vec<ContainerRow>> {
        self.list_containers_where("batch_id", batch_id)
    }

    pub fn update_container(&self, id: &str, name: &str, volume: Option<f64>, unit: Option<&str>) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE containers SET name = ?2, volume = ?3, unit = ?4 WHERE id = ?1",
                params![id, name, volume, unit],
            )?;
            Ok(changed > 0)
        })
    }

    pub fn delete_container(&self, id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let deleted = conn.execute("DELETE FROM containers WHERE id = ?1", [id])?;
            Ok(deleted > 0)
        })
    }

    fn list_containers_where(&self, column: &str, value: &str) -> Result<Vec<ContainerRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {CONTAINER_COLUMNS} FROM containers WHERE {column} = ?1 ORDER BY name"
            ))?;

            let rows = stmt
                .query_map([value], map_container)?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }
}

fn map_container(row: &Row<'_>) -> rusqlite::Result<ContainerRow> {
    Ok(ContainerRow {
        id: row.get(0)?,
        batch_id: row.get(1)?,
        owner_id: row.get(2)?,
        name: row.get(3)?,
        volume: row.get(4)?,
        unit: row.get(5)?,
        created_at: row.get(6)?,
    })
}
