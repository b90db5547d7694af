/// Database row types — these map directly to SQLite rows.
/// Distinct from the warroom-types API models to keep the DB layer independent.

pub struct ChatRow {
    pub id: i64,
    pub room_id: String,
    pub sender_name: String,
    pub message: String,
    pub is_ai: bool,
    pub created_at: String,
}

pub struct UserRow {
    pub id: String,
    pub username: String,
    pub password: String,
    pub room_id: String,
    pub device_id: Option<String>,
    pub message_count: u32,
    pub created_at: String,
}

pub struct LeadRow {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub message: String,
    pub created_at: String,
}

/// Outcome of the atomic quota increment for a chat send.
#[derive(Debug, PartialEq, Eq)]
pub enum QuotaOutcome {
    /// Counter incremented; `used` is the new value.
    Granted { used: u32 },
    /// User exists but is at the ceiling and not allow-listed. Nothing changed.
    LimitReached { used: u32 },
    /// No account with this sender name; the quota gate does not apply.
    Unregistered,
}
