use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id          TEXT PRIMARY KEY,
            username    TEXT NOT NULL UNIQUE COLLATE NOCASE,
            email       TEXT NOT NULL UNIQUE COLLATE NOCASE,
            password    TEXT NOT NULL,
            first_name  TEXT NOT NULL DEFAULT '',
            last_name   TEXT NOT NULL DEFAULT '',
            city        TEXT,
            state       TEXT,
            zip         TEXT,
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS batches (
            id          TEXT PRIMARY KEY,
            owner_id    TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            name        TEXT NOT NULL CHECK (length(trim(name)) > 0),
            batch_type  TEXT NOT NULL,
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_batches_owner
            ON batches(owner_id);

        -- One rating per user per batch; the composite key is the guard.
        CREATE TABLE IF NOT EXISTS batch_ratings (
            batch_id    TEXT NOT NULL REFERENCES batches(id) ON DELETE CASCADE,
            user_id     TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            rating      INTEGER NOT NULL CHECK (rating BETWEEN 0 AND 100),
            comment     TEXT,
            created_at  TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (batch_id, user_id)
        );

        CREATE TABLE IF NOT EXISTS batch_actions (
            id            TEXT PRIMARY KEY,
            batch_id      TEXT NOT NULL REFERENCES batches(id) ON DELETE CASCADE,
            performer_id  TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            title         TEXT NOT NULL CHECK (length(trim(title)) > 0),
            description   TEXT NOT NULL CHECK (length(trim(description)) > 0),
            action_type   TEXT NOT NULL,
            performed_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_actions_batch
            ON batch_actions(batch_id, performed_at);

        CREATE TABLE IF NOT EXISTS batch_notes (
            id          TEXT PRIMARY KEY,
            batch_id    TEXT NOT NULL REFERENCES batches(id) ON DELETE CASCADE,
            author_id   TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            title       TEXT NOT NULL,
            body        TEXT NOT NULL,
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_notes_batch
            ON batch_notes(batch_id, created_at);

        CREATE TABLE IF NOT EXISTS containers (
            id          TEXT PRIMARY KEY,
            batch_id    TEXT NOT NULL REFERENCES batches(id) ON DELETE CASCADE,
            owner_id    TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            name        TEXT NOT NULL,
            volume      REAL,
            unit        TEXT,
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_containers_owner
            ON containers(owner_id);
        CREATE INDEX IF NOT EXISTS idx_containers_batch
            ON containers(batch_id);

        CREATE TABLE IF NOT EXISTS recipes (
            id            TEXT PRIMARY KEY,
            owner_id      TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            name          TEXT NOT NULL,
            style         TEXT,
            instructions  TEXT,
            created_at    TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- One undirected row per friendship, stored as (lower id, higher id).
        CREATE TABLE IF NOT EXISTS friendships (
            user_low    TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            user_high   TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            created_at  TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (user_low, user_high),
            CHECK (user_low < user_high)
        );

        CREATE INDEX IF NOT EXISTS idx_friendships_high
            ON friendships(user_high);

        CREATE TABLE IF NOT EXISTS password_resets (
            token_hash  TEXT PRIMARY KEY,
            user_id     TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            expires_at  INTEGER NOT NULL
        );
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
