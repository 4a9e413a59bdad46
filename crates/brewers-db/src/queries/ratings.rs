use anyhow::Result;
use rusqlite::{Row, params};

use crate::models::RatingRow;
use crate::{Database, OptionalExt};

impl Database {
    // -- Ratings --

    /// Plain insert. A second rating for the same (batch, user) pair fails on
    /// the composite primary key; callers classify it with `is_unique_violation`.
    pub fn insert_rating(
        &self,
        batch_id: &str,
        user_id: &str,
        rating: i64,
        comment: Option<&str>,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO batch_ratings (batch_id, user_id, rating, comment) VALUES (?1, ?2, ?3, ?4)",
                params![batch_id, user_id, rating, comment],
            )?;
            Ok(())
        })
    }

    pub fn get_rating(&self, batch_id: &str, user_id: &str) -> Result<Option<RatingRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT r.batch_id, r.user_id, u.username, r.rating, r.comment, r.created_at
                 FROM batch_ratings r
                 JOIN users u ON r.user_id = u.id
                 WHERE r.batch_id = ?1 AND r.user_id = ?2",
                [batch_id, user_id],
                map_rating,
            )
            .optional()
        })
    }

    pub fn list_ratings_for_batch(&self, batch_id: &str) -> Result<Vec<RatingRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT r.batch_id, r.user_id, u.username, r.rating, r.comment, r.created_at
                 FROM batch_ratings r
                 JOIN users u ON r.user_id = u.id
                 WHERE r.batch_id = ?1
                 ORDER BY r.created_at DESC",
            )?;

            let rows = stmt
                .query_map([batch_id], map_rating)?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    pub fn rating_values_for_batch(&self, batch_id: &str) -> Result<Vec<i64>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT rating FROM batch_ratings WHERE batch_id = ?1")?;

            let values = stmt
                .query_map([batch_id], |row| row.get(0))?
                .collect::<std::result::Result<Vec<i64>, _>>()?;

            Ok(values)
        })
    }
}

fn map_rating(row: &Row<'_>) -> rusqlite::Result<RatingRow> {
    Ok(RatingRow {
        batch_id: row.get(0)?,
        user_id: row.get(1)?,
        username: row.get(2)?,
        rating: row.get(3)?,
        comment: row.get(4)?,
        created_at: row.get(5)?,
    })
}
