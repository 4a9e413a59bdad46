use anyhow::{Result, bail};
use rusqlite::Connection;

use crate::Database;
use crate::models::UserRow;
use crate::queries::users::map_user;

impl Database {
    // -- Friends --

    /// Makes two users friends in both directions. Returns false if they
    /// already were, which is not an error.
    pub fn add_friend(&self, user_id: &str, friend_id: &str) -> Result<bool> {
        let (low, high) = canonical_pair(user_id, friend_id)?;
        self.with_conn(|conn| {
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO friendships (user_low, user_high) VALUES (?1, ?2)",
                (low, high),
            )?;
            Ok(inserted > 0)
        })
    }

    /// Removes the friendship in both directions at once. Returns false if
    /// there was nothing to remove.
    pub fn remove_friend(&self, user_id: &str, friend_id: &str) -> Result<bool> {
        let (low, high) = canonical_pair(user_id, friend_id)?;
        self.with_conn(|conn| {
            let deleted = conn.execute(
                "DELETE FROM friendships WHERE user_low = ?1 AND user_high = ?2",
                (low, high),
            )?;
            Ok(deleted > 0)
        })
    }

    pub fn are_friends(&self, user_id: &str, friend_id: &str) -> Result<bool> {
        let Ok((low, high)) = canonical_pair(user_id, friend_id) else {
            return Ok(false);
        };
        self.with_conn(|conn| {
            let found: i64 = conn.query_row(
                "SELECT COUNT(*) FROM friendships WHERE user_low = ?1 AND user_high = ?2",
                (low, high),
                |row| row.get(0),
            )?;
            Ok(found > 0)
        })
    }

    /// Distinct users one hop away from `user_id`, by username.
    pub fn list_friends(&self, user_id: &str) -> Result<Vec<UserRow>> {
        self.with_conn(|conn| query_friends(conn, user_id))
    }

    pub fn friend_ids(&self, user_id: &str) -> Result<Vec<String>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT user_high FROM friendships WHERE user_low = ?1
                 UNION
                 SELECT user_low FROM friendships WHERE user_high = ?1",
            )?;

            let ids = stmt
                .query_map([user_id], |row| row.get(0))?
                .collect::<std::result::Result<Vec<String>, _>>()?;

            Ok(ids)
        })
    }
}

/// Orders a pair so each friendship has exactly one row.
fn canonical_pair<'a>(a: &'a str, b: &'a str) -> Result<(&'a str, &'a str)> {
    if a == b {
        bail!("a user cannot befriend themselves");
    }
    Ok(if a < b { (a, b) } else { (b, a) })
}

fn query_friends(conn: &Connection, user_id: &str) -> Result<Vec<UserRow>> {
    let mut stmt = conn.prepare(
        "SELECT u.id, u.username, u.email, u.password, u.first_name, u.last_name,
                u.city, u.state, u.zip, u.created_at
         FROM users u
         WHERE u.id IN (
             SELECT user_high FROM friendships WHERE user_low = ?1
             UNION
             SELECT user_low FROM friendships WHERE user_high = ?1
         )
         ORDER BY u.username COLLATE NOCASE",
    )?;

    let rows = stmt
        .query_map([user_id], map_user)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::canonical_pair;
    use crate::queries::test_support::{open, seed_user};

    #[test]
    fn pair_order_does_not_depend_on_argument_order() {
        assert_eq!(canonical_pair("a", "b").unwrap(), ("a", "b"));
        assert_eq!(canonical_pair("b", "a").unwrap(), ("a", "b"));
        assert!(canonical_pair("a", "a").is_err());
    }

    #[test]
    fn friendship_is_symmetric() {
        let db = open();
        let alice = seed_user(&db, "alice");
        let bob = seed_user(&db, "bob");

        assert!(db.add_friend(&alice, &bob).unwrap());

        let alices: Vec<_> = db.list_friends(&alice).unwrap().into_iter().map(|u| u.id).collect();
        let bobs: Vec<_> = db.list_friends(&bob).unwrap().into_iter().map(|u| u.id).collect();
        assert_eq!(alices, vec![bob.clone()]);
        assert_eq!(bobs, vec![alice.clone()]);
        assert!(db.are_friends(&bob, &alice).unwrap());
    }

    #[test]
    fn adding_twice_in_either_direction_is_a_no_op() {
        let db = open();
        let alice = seed_user(&db, "alice");
        let bob = seed_user(&db, "bob");

        assert!(db.add_friend(&alice, &bob).unwrap());
        assert!(!db.add_friend(&alice, &bob).unwrap());
        assert!(!db.add_friend(&bob, &alice).unwrap());

        assert_eq!(db.list_friends(&alice).unwrap().len(), 1);
        assert_eq!(db.friend_ids(&bob).unwrap(), vec![alice]);
    }

    #[test]
    fn removal_clears_both_directions() {
        let db = open();
        let alice = seed_user(&db, "alice");
        let bob = seed_user(&db, "bob");
        let carol = seed_user(&db, "carol");

        db.add_friend(&alice, &bob).unwrap();
        db.add_friend(&carol, &alice).unwrap();

        assert!(db.remove_friend(&bob, &alice).unwrap());
        assert!(!db.remove_friend(&alice, &bob).unwrap());

        assert!(db.list_friends(&bob).unwrap().is_empty());
        let alices: Vec<_> = db.list_friends(&alice).unwrap().into_iter().map(|u| u.username).collect();
        assert_eq!(alices, vec!["carol"]);
    }

    #[test]
    fn self_friendship_is_rejected() {
        let db = open();
        let alice = seed_user(&db, "alice");

        assert!(db.add_friend(&alice, &alice).is_err());
        assert!(!db.are_friends(&alice, &alice).unwrap());
    }

    #[test]
    fn unknown_user_cannot_be_added() {
        let db = open();
        let alice = seed_user(&db, "alice");

        assert!(db.add_friend(&alice, "missing").is_err());
    }
}
