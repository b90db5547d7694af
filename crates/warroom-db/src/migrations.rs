//! Versioned schema migrations, tracked with `PRAGMA user_version`.
//!
//! Every migration runs inside a transaction and bumps the version on
//! success, so a half-applied step never leaves the version advanced.
//! Schema changes happen here and only here — handlers never alter or
//! recreate tables at request time.

use anyhow::{Result, anyhow};
use rusqlite::Connection;
use tracing::info;

/// Migration steps in order. Index 0 upgrades version 0 -> 1, and so on.
const MIGRATIONS: &[&str] = &[V1_INITIAL, V2_UPLOADS];

const V1_INITIAL: &str = "
    CREATE TABLE room_chats (
        id          INTEGER PRIMARY KEY AUTOINCREMENT,
        room_id     TEXT NOT NULL,
        sender_name TEXT NOT NULL,
        message     TEXT NOT NULL,
        is_ai       INTEGER NOT NULL DEFAULT 0,
        created_at  TEXT NOT NULL DEFAULT (datetime('now'))
    );

    CREATE INDEX idx_room_chats_room
        ON room_chats(room_id, created_at);

    CREATE TABLE users (
        id            TEXT PRIMARY KEY,
        username      TEXT NOT NULL UNIQUE,
        password      TEXT NOT NULL,
        room_id       TEXT NOT NULL,
        device_id     TEXT,
        message_count INTEGER NOT NULL DEFAULT 0,
        created_at    TEXT NOT NULL DEFAULT (datetime('now'))
    );

    CREATE TABLE leads (
        id          INTEGER PRIMARY KEY AUTOINCREMENT,
        name        TEXT NOT NULL,
        email       TEXT NOT NULL,
        message     TEXT NOT NULL,
        created_at  TEXT NOT NULL DEFAULT (datetime('now'))
    );
";

const V2_UPLOADS: &str = "
    CREATE TABLE uploads (
        id          TEXT PRIMARY KEY,
        owner_id    TEXT NOT NULL REFERENCES users(id),
        mime_type   TEXT NOT NULL,
        size        INTEGER NOT NULL,
        created_at  TEXT NOT NULL DEFAULT (datetime('now'))
    );

    CREATE INDEX idx_users_device ON users(device_id);
";

pub fn run(conn: &Connection) -> Result<()> {
    let current: u32 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;

    if current as usize > MIGRATIONS.len() {
        return Err(anyhow!(
            "database schema version {} is newer than this binary supports ({})",
            current,
            MIGRATIONS.len()
        ));
    }

    for (idx, sql) in MIGRATIONS.iter().enumerate().skip(current as usize) {
        let target = idx as u32 + 1;
        conn.execute_batch(&format!(
            "BEGIN;\n{}\nPRAGMA user_version = {};\nCOMMIT;",
            sql, target
        ))?;
        info!("Applied schema migration v{}", target);
    }

    Ok(())
}
