use anyhow::Result;
use rusqlite::{Connection, Row, params};
use tracing::info;

use crate::models::{NewUser, ProfileUpdate, UserRow, UserSearch};
use crate::{Database, OptionalExt};

const USER_COLUMNS: &str =
    "id, username, email, password, first_name, last_name, city, state, zip, created_at";

impl Database {
    // -- Users --

    pub fn create_user(&self, user: &NewUser<'_>) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (id, username, email, password, first_name, last_name, city, state, zip)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    user.id,
                    user.username,
                    user.email,
                    user.password_hash,
                    user.first_name,
                    user.last_name,
                    user.city,
                    user.state,
                    user.zip,
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "username", username))
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id", id))
    }

    /// Returns false when no such user exists.
    pub fn update_profile(&self, id: &str, update: &ProfileUpdate<'_>) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE users
                 SET email = ?2, first_name = ?3, last_name = ?4, city = ?5, state = ?6, zip = ?7
                 WHERE id = ?1",
                params![
                    id,
                    update.email,
                    update.first_name,
                    update.last_name,
                    update.city,
                    update.state,
                    update.zip,
                ],
            )?;
            Ok(changed > 0)
        })
    }

    pub fn update_password(&self, id: &str, password_hash: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE users SET password = ?2 WHERE id = ?1",
                (id, password_hash),
            )?;
            Ok(changed > 0)
        })
    }

    /// Deletes the user and, through foreign key cascades, their batches (with
    /// every rating, action, note and container attached to them), recipes,
    /// ratings, friendships and pending password resets.
    pub fn delete_user(&self, id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let batches: i64 = tx.query_row(
                "SELECT COUNT(*) FROM batches WHERE owner_id = ?1",
                [id],
                |row| row.get(0),
            )?;
            let deleted = tx.execute("DELETE FROM users WHERE id = ?1", [id])?;

            tx.commit()?;

            if deleted > 0 {
                info!("Deleted user {} along with {} batches", id, batches);
            }
            Ok(deleted > 0)
        })
    }

    pub fn search_users(&self, search: &UserSearch<'_>) -> Result<Vec<UserRow>> {
        self.with_conn(|conn| {
            let mut clauses: Vec<&str> = Vec::new();
            let mut patterns: Vec<String> = Vec::new();

            let filters = [
                ("username LIKE ? ESCAPE '\\'", search.username),
                ("first_name LIKE ? ESCAPE '\\'", search.first_name),
                ("last_name LIKE ? ESCAPE '\\'", search.last_name),
                ("zip LIKE ? ESCAPE '\\'", search.zip),
            ];
            for (clause, value) in filters {
                if let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) {
                    clauses.push(clause);
                    patterns.push(like_pattern(value));
                }
            }

            let mut sql = format!("SELECT {USER_COLUMNS} FROM users");
            if !clauses.is_empty() {
                sql.push_str(" WHERE ");
                sql.push_str(&clauses.join(" AND "));
            }
            sql.push_str(" ORDER BY username COLLATE NOCASE LIMIT 100");

            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(rusqlite::params_from_iter(patterns.iter()), map_user)?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    // -- Password resets --

    pub fn insert_password_reset(&self, token_hash: &str, user_id: &str, expires_at: i64) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO password_resets (token_hash, user_id, expires_at) VALUES (?1, ?2, ?3)",
                params![token_hash, user_id, expires_at],
            )?;
            Ok(())
        })
    }

    /// Consumes a reset token and stores `password_hash` for its user in one
    /// transaction. Returns the user id only if the token exists and has not
    /// expired at `now`; otherwise nothing changes. Expired tokens are purged
    /// on the way.
    pub fn reset_password(
        &self,
        token_hash: &str,
        now: i64,
        password_hash: &str,
    ) -> Result<Option<String>> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            tx.execute("DELETE FROM password_resets WHERE expires_at <= ?1", [now])?;

            let user_id: Option<String> = tx
                .query_row(
                    "SELECT user_id FROM password_resets WHERE token_hash = ?1",
                    [token_hash],
                    |row| row.get(0),
                )
                .optional()?;

            if let Some(id) = &user_id {
                tx.execute(
                    "UPDATE users SET password = ?2 WHERE id = ?1",
                    (id, password_hash),
                )?;
                tx.execute("DELETE FROM password_resets WHERE token_hash = ?1", [token_hash])?;
            }

            tx.commit()?;
            Ok(user_id)
        })
    }
}

pub(crate) fn map_user(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        password: row.get(3)?,
        first_name: row.get(4)?,
        last_name: row.get(5)?,
        city: row.get(6)?,
        state: row.get(7)?,
        zip: row.get(8)?,
        created_at: row.get(9)?,
    })
}

fn query_user(conn: &Connection, column: &str, value: &str) -> Result<Option<UserRow>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE {column} = ?1");
    let mut stmt = conn.prepare(&sql)?;

    let row = stmt.query_row([value], map_user).optional()?;

    Ok(row)
}

/// `%value%` for a `LIKE ... ESCAPE '\'` clause. Wildcards in the input
/// match literally.
fn like_pattern(value: &str) -> String {
    let mut pattern = String::with_capacity(value.len() + 2);
    pattern.push('%');
    for c in value.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

#[cfg(test)]
mod tests {
    use crate::is_unique_violation;
    use crate::models::{NewUser, ProfileUpdate, UserSearch};
    use crate::queries::test_support::{open, seed_batch, seed_user};

    #[test]
    fn username_is_unique_regardless_of_case() {
        let db = open();
        seed_user(&db, "bob");

        let err = db
            .create_user(&NewUser {
                id: "other",
                username: "BOB",
                email: "someone@example.com",
                password_hash: "hash",
                first_name: "",
                last_name: "",
                city: None,
                state: None,
                zip: None,
            })
            .unwrap_err();

        assert!(is_unique_violation(&err));
    }

    #[test]
    fn lookup_by_username_and_id() {
        let db = open();
        let id = seed_user(&db, "alice");

        let by_name = db.get_user_by_username("alice").unwrap().unwrap();
        assert_eq!(by_name.id, id);

        let by_id = db.get_user_by_id(&id).unwrap().unwrap();
        assert_eq!(by_id.username, "alice");
        assert_eq!(by_id.zip.as_deref(), Some("97331"));

        assert!(db.get_user_by_id("missing").unwrap().is_none());
    }

    #[test]
    fn profile_update_rejects_taken_email() {
        let db = open();
        let alice = seed_user(&db, "alice");
        seed_user(&db, "bob");

        let err = db
            .update_profile(
                &alice,
                &ProfileUpdate {
                    email: "bob@example.com",
                    first_name: "Alice",
                    last_name: "Jones",
                    city: Some("Corvallis"),
                    state: Some("OR"),
                    zip: None,
                },
            )
            .unwrap_err();
        assert!(is_unique_violation(&err));
    }

    #[test]
    fn search_filters_are_combined() {
        let db = open();
        seed_user(&db, "alice");
        seed_user(&db, "alina");
        seed_user(&db, "bob");

        let all = db.search_users(&UserSearch::default()).unwrap();
        assert_eq!(all.len(), 3);

        let ali = db
            .search_users(&UserSearch {
                username: Some("ALI"),
                ..Default::default()
            })
            .unwrap();
        let names: Vec<_> = ali.iter().map(|u| u.username.as_str()).collect();
        assert_eq!(names, vec!["alice", "alina"]);

        let none = db
            .search_users(&UserSearch {
                username: Some("ali"),
                zip: Some("00000"),
                ..Default::default()
            })
            .unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn wildcards_in_search_terms_match_literally() {
        let db = open();
        seed_user(&db, "john_doe");
        seed_user(&db, "johndoe");
        seed_user(&db, "half%off");

        let names = |term: &str| -> Vec<String> {
            db.search_users(&UserSearch {
                username: Some(term),
                ..Default::default()
            })
            .unwrap()
            .into_iter()
            .map(|u| u.username)
            .collect()
        };

        assert_eq!(names("john_doe"), vec!["john_doe"]);
        assert_eq!(names("_"), vec!["john_doe"]);
        assert_eq!(names("%"), vec!["half%off"]);
        assert_eq!(names("john"), vec!["john_doe", "johndoe"]);
    }

    #[test]
    fn deleting_user_cascades_to_owned_data() {
        let db = open();
        let bob = seed_user(&db, "bob");
        let alice = seed_user(&db, "alice");
        let bobs_batch = seed_batch(&db, &bob, "Bob's mead");
        let alices_batch = seed_batch(&db, &alice, "Alice's cider");

        db.insert_rating(&alices_batch, &bob, 80, None).unwrap();
        db.insert_rating(&bobs_batch, &alice, 90, None).unwrap();
        db.add_friend(&bob, &alice).unwrap();
        db.insert_recipe("r1", &bob, "Traditional", None, None).unwrap();

        assert!(db.delete_user(&bob).unwrap());

        assert!(db.get_batch(&bobs_batch).unwrap().is_none());
        assert!(db.get_rating(&bobs_batch, &alice).unwrap().is_none());
        assert!(db.get_rating(&alices_batch, &bob).unwrap().is_none());
        assert!(db.list_friends(&alice).unwrap().is_empty());
        assert!(db.list_recipes_for_owner(&bob).unwrap().is_empty());
        assert!(db.get_batch(&alices_batch).unwrap().is_some());

        assert!(!db.delete_user(&bob).unwrap());
    }

    #[test]
    fn reset_tokens_are_single_use_and_expire() {
        let db = open();
        let bob = seed_user(&db, "bob");

        db.insert_password_reset("live", &bob, 2_000).unwrap();
        db.insert_password_reset("stale", &bob, 1_000).unwrap();

        assert_eq!(db.reset_password("live", 1_500, "new-hash").unwrap(), Some(bob.clone()));
        assert_eq!(db.get_user_by_id(&bob).unwrap().unwrap().password, "new-hash");

        assert_eq!(db.reset_password("live", 1_500, "other-hash").unwrap(), None);
        assert_eq!(db.reset_password("stale", 1_500, "other-hash").unwrap(), None);
        assert_eq!(db.get_user_by_id(&bob).unwrap().unwrap().password, "new-hash");
    }

    #[test]
    fn unknown_reset_token_changes_nothing() {
        let db = open();
        let bob = seed_user(&db, "bob");
        db.insert_password_reset("live", &bob, 2_000).unwrap();

        assert_eq!(db.reset_password("wrong", 1_500, "new-hash").unwrap(), None);
        assert_eq!(db.get_user_by_id(&bob).unwrap().unwrap().password, "hash");

        // The real token is still usable.
        assert_eq!(db.reset_password("live", 1_500, "new-hash").unwrap(), Some(bob));
    }
}
