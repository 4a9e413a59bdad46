use anyhow::Result;
use rusqlite::{Row, params};

use crate::models::RecipeRow;
use crate::{Database, OptionalExt};

impl Database {
    // -- Recipes --

    pub fn insert_recipe(
        &self,
        id: &str,
        owner_id: &str,
        name: &str,
        style: Option<&str>,
        instructions: Option<&str>,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO recipes (id, owner_id, name, style, instructions) VALUES (?1, ?2, ?3, ?4, ?5)",
                params![id, owner_id, name, style, instructions],
            )?;
            Ok(())
        })
    }

    pub fn get_recipe(&self, id: &str) -> Result<Option<RecipeRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, owner_id, name, style, instructions, created_at FROM recipes WHERE id = ?1",
                [id],
                map_recipe,
            )
            .optional()
        })
    }

    pub fn list_recipes_for_owner(&self, owner_id: &str) -> Result<Vec<RecipeRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, owner_id, name, style, instructions, created_at
                 FROM recipes WHERE owner_id = ?1 ORDER BY name",
            )?;

            let rows = stmt
                .query_map([owner_id], map_recipe)?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    pub fn delete_recipe(&self, id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let deleted = conn.execute("DELETE FROM recipes WHERE id = ?1", [id])?;
            Ok(deleted > 0)
        })
    }
}

fn map_recipe(row: &Row<'_>) -> rusqlite::Result<RecipeRow> {
    Ok(RecipeRow {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        name: row.get(2)?,
        style: row.get(3)?,
        instructions: row.get(4)?,
        created_at: row.get(5)?,
    })
}

#[cfg(test)]
mod tests {
    use crate::queries::test_support::{open, seed_user};

    #[test]
    fn recipes_belong_to_their_owner() {
        let db = open();
        let bob = seed_user(&db, "bob");
        let alice = seed_user(&db, "alice");

        db.insert_recipe("r1", &bob, "Traditional mead", Some("Mead"), Some("Honey, water, yeast"))
            .unwrap();

        assert_eq!(db.list_recipes_for_owner(&bob).unwrap().len(), 1);
        assert!(db.list_recipes_for_owner(&alice).unwrap().is_empty());

        let row = db.get_recipe("r1").unwrap().unwrap();
        assert_eq!(row.style.as_deref(), Some("Mead"));

        assert!(db.delete_recipe("r1").unwrap());
        assert!(db.get_recipe("r1").unwrap().is_none());
    }
}
