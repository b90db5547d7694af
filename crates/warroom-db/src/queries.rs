use crate::Database;
use crate::models::{ChatRow, QuotaOutcome, UserRow};
use anyhow::Result;
use rusqlite::{Connection, OptionalExtension, params};

impl Database {
    // -- Chat --

    pub fn insert_chat(&self, room_id: &str, sender_name: &str, message: &str, is_ai: bool) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO room_chats (room_id, sender_name, message, is_ai) VALUES (?1, ?2, ?3, ?4)",
                params![room_id, sender_name, message, is_ai],
            )?;
            Ok(())
        })
    }

    /// Full conversation for a room, oldest first. The autoincrement id breaks
    /// ties between rows inserted within the same clock second.
    pub fn room_history(&self, room_id: &str) -> Result<Vec<ChatRow>> {
        self.with_conn(|conn| query_room_chats(conn, room_id, None))
    }

    /// Oldest-first prefix of the room used as model context.
    pub fn room_context(&self, room_id: &str, limit: u32) -> Result<Vec<ChatRow>> {
        self.with_conn(|conn| query_room_chats(conn, room_id, Some(limit)))
    }

    /// Deletes every row for the room. Returns the number of rows removed.
    pub fn clear_room(&self, room_id: &str) -> Result<usize> {
        self.with_conn(|conn| {
            let n = conn.execute("DELETE FROM room_chats WHERE room_id = ?1", [room_id])?;
            Ok(n)
        })
    }

    /// Number of distinct human (non-AI) sender names seen in the room.
    pub fn distinct_human_senders(&self, room_id: &str) -> Result<u32> {
        self.with_conn(|conn| {
            let n = conn.query_row(
                "SELECT COUNT(DISTINCT sender_name) FROM room_chats WHERE room_id = ?1 AND is_ai = 0",
                [room_id],
                |row| row.get(0),
            )?;
            Ok(n)
        })
    }

    // -- Users --

    pub fn create_user(
        &self,
        id: &str,
        username: &str,
        password_hash: &str,
        room_id: &str,
        device_id: Option<&str>,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (id, username, password, room_id, device_id) VALUES (?1, ?2, ?3, ?4, ?5)",
                params![id, username, password_hash, room_id, device_id],
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

    /// First-seen device binding: true when any account already carries this
    /// device fingerprint.
    pub fn device_in_use(&self, device_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let hit: Option<String> = conn
                .query_row(
                    "SELECT id FROM users WHERE device_id = ?1 LIMIT 1",
                    [device_id],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(hit.is_some())
        })
    }

    /// Atomic quota increment for a chat send. A single conditional UPDATE
    /// decides and counts in one statement, so two concurrent sends from the
    /// same user cannot both slip under the ceiling.
    ///
    /// Allow-listed users increment like everyone else; they are just never
    /// refused.
    pub fn consume_message_quota(
        &self,
        username: &str,
        allow_listed: bool,
        ceiling: u32,
    ) -> Result<QuotaOutcome> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE users SET message_count = message_count + 1
                 WHERE username = ?1 AND (?2 OR message_count < ?3)",
                params![username, allow_listed, ceiling],
            )?;

            let used: Option<u32> = conn
                .query_row(
                    "SELECT message_count FROM users WHERE username = ?1",
                    [username],
                    |row| row.get(0),
                )
                .optional()?;

            Ok(match (changed, used) {
                (1, Some(used)) => QuotaOutcome::Granted { used },
                (_, Some(used)) => QuotaOutcome::LimitReached { used },
                (_, None) => QuotaOutcome::Unregistered,
            })
        })
    }

    // -- Leads --

    pub fn insert_lead(&self, name: &str, email: &str, message: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO leads (name, email, message) VALUES (?1, ?2, ?3)",
                params![name, email, message],
            )?;
            Ok(())
        })
    }

    // -- Uploads --

    pub fn insert_upload(&self, id: &str, owner_id: &str, mime_type: &str, size: i64) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO uploads (id, owner_id, mime_type, size) VALUES (?1, ?2, ?3, ?4)",
                params![id, owner_id, mime_type, size],
            )?;
            Ok(())
        })
    }
}

fn query_room_chats(conn: &Connection, room_id: &str, limit: Option<u32>) -> Result<Vec<ChatRow>> {
    let sql = match limit {
        Some(_) => {
            "SELECT id, room_id, sender_name, message, is_ai, created_at
             FROM room_chats WHERE room_id = ?1
             ORDER BY created_at ASC, id ASC LIMIT ?2"
        }
        None => {
            "SELECT id, room_id, sender_name, message, is_ai, created_at
             FROM room_chats WHERE room_id = ?1
             ORDER BY created_at ASC, id ASC"
        }
    };

    let mut stmt = conn.prepare(sql)?;
    let map_row = |row: &rusqlite::Row<'_>| {
        Ok(ChatRow {
            id: row.get(0)?,
            room_id: row.get(1)?,
            sender_name: row.get(2)?,
            message: row.get(3)?,
            is_ai: row.get(4)?,
            created_at: row.get(5)?,
        })
    };

    let rows = match limit {
        Some(n) => stmt.query_map(params![room_id, n], map_row)?.collect::<std::result::Result<Vec<_>, _>>()?,
        None => stmt.query_map([room_id], map_row)?.collect::<std::result::Result<Vec<_>, _>>()?,
    };

    Ok(rows)
}

fn query_user(conn: &Connection, column: &str, value: &str) -> Result<Option<UserRow>> {
    // `column` is a compile-time constant, never caller input.
    let sql = format!(
        "SELECT id, username, password, room_id, device_id, message_count, created_at
         FROM users WHERE {} = ?1",
        column
    );

    let row = conn
        .query_row(&sql, [value], |row| {
            Ok(UserRow {
                id: row.get(0)?,
                username: row.get(1)?,
                password: row.get(2)?,
                room_id: row.get(3)?,
                device_id: row.get(4)?,
                message_count: row.get(5)?,
                created_at: row.get(6)?,
            })
        })
        .optional()?;

    Ok(row)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn db() -> Database {
        Database::open_in_memory().unwrap()
    }

    fn insert_at(db: &Database, room: &str, sender: &str, msg: &str, ts: &str) {
        db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO room_chats (room_id, sender_name, message, is_ai, created_at)
                 VALUES (?1, ?2, ?3, 0, ?4)",
                params![room, sender, msg, ts],
            )?;
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn history_is_chronological_with_id_tiebreak() {
        let db = db();
        insert_at(&db, "r1", "bob", "second", "2026-01-02 10:00:00");
        insert_at(&db, "r1", "alice", "first", "2026-01-01 10:00:00");
        // Same clock second: insertion (id) order decides.
        insert_at(&db, "r1", "carol", "third", "2026-01-02 10:00:00");

        let rows = db.room_history("r1").unwrap();
        let texts: Vec<&str> = rows.iter().map(|r| r.message.as_str()).collect();
        assert_eq!(texts, vec!["first", "second", "third"]);
        assert!(rows.windows(2).all(|w| w[0].created_at <= w[1].created_at));
    }

    #[test]
    fn context_is_an_oldest_first_prefix() {
        let db = db();
        for i in 0..20 {
            insert_at(&db, "r1", "alice", &format!("m{}", i), &format!("2026-01-01 10:00:{:02}", i));
        }
        let rows = db.room_context("r1", 15).unwrap();
        assert_eq!(rows.len(), 15);
        assert_eq!(rows[0].message, "m0");
        assert_eq!(rows[14].message, "m14");
    }

    #[test]
    fn clear_room_leaves_other_rooms_untouched() {
        let db = db();
        db.insert_chat("r1", "alice", "hi", false).unwrap();
        db.insert_chat("r1", "bob", "yo", false).unwrap();
        db.insert_chat("r2", "carol", "hey", false).unwrap();

        let removed = db.clear_room("r1").unwrap();
        assert_eq!(removed, 2);
        assert!(db.room_history("r1").unwrap().is_empty());
        assert_eq!(db.room_history("r2").unwrap().len(), 1);
    }

    #[test]
    fn distinct_senders_ignores_ai_rows() {
        let db = db();
        db.insert_chat("r1", "alice", "hi", false).unwrap();
        db.insert_chat("r1", "alice", "again", false).unwrap();
        db.insert_chat("r1", "AI Consultant", "hello", true).unwrap();
        assert_eq!(db.distinct_human_senders("r1").unwrap(), 1);

        db.insert_chat("r1", "bob", "yo", false).unwrap();
        assert_eq!(db.distinct_human_senders("r1").unwrap(), 2);
    }

    #[test]
    fn quota_blocks_at_ceiling_without_mutating() {
        let db = db();
        db.create_user("u1", "alice", "hash", "room-a", None).unwrap();

        for expected in 1..=3u32 {
            assert_eq!(
                db.consume_message_quota("alice", false, 3).unwrap(),
                QuotaOutcome::Granted { used: expected }
            );
        }

        // At the ceiling: refused, and the counter stays put.
        assert_eq!(
            db.consume_message_quota("alice", false, 3).unwrap(),
            QuotaOutcome::LimitReached { used: 3 }
        );
        assert_eq!(
            db.get_user_by_username("alice").unwrap().unwrap().message_count,
            3
        );
    }

    #[test]
    fn allow_listed_users_increment_but_are_never_blocked() {
        let db = db();
        db.create_user("u1", "founder", "hash", "room-f", None).unwrap();

        for expected in 1..=5u32 {
            assert_eq!(
                db.consume_message_quota("founder", true, 3).unwrap(),
                QuotaOutcome::Granted { used: expected }
            );
        }
    }

    #[test]
    fn unregistered_senders_bypass_the_gate() {
        let db = db();
        assert_eq!(
            db.consume_message_quota("drive-by", false, 3).unwrap(),
            QuotaOutcome::Unregistered
        );
    }

    #[test]
    fn device_binding_is_first_seen() {
        let db = db();
        assert!(!db.device_in_use("dev-1").unwrap());
        db.create_user("u1", "alice", "hash", "room-a", Some("dev-1")).unwrap();
        assert!(db.device_in_use("dev-1").unwrap());
        assert!(!db.device_in_use("dev-2").unwrap());
    }
}
