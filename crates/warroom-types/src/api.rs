use serde::{Deserialize, Serialize};
use uuid::Uuid;

// -- JWT Claims --

/// JWT claims shared between the signup/login handlers and the auth
/// middleware. Canonical definition lives here in warroom-types.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub username: String,
    pub exp: usize,
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SignupRequest {
    pub username: String,
    pub password: String,
    /// Opaque device fingerprint. When present, it is bound to the account
    /// on first use and blocks further signups from the same device.
    pub device_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SignupResponse {
    pub user_id: Uuid,
    pub username: String,
    pub room_id: String,
    pub token: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user_id: Uuid,
    pub username: String,
    pub room_id: String,
    pub sessions_used: u32,
    pub token: String,
}

// -- Chat --

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub room_id: String,
    pub sender_name: String,
    #[serde(default)]
    pub message: String,
    /// Base64-encoded attachment bytes.
    pub file_data: Option<String>,
    pub mime_type: Option<String>,
}

/// Reply produced by the pipeline, or an acknowledgement that the message
/// was stored without triggering one.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum SendMessageResponse {
    Reply { ai_reply: String },
    Stored { status: String },
}

#[derive(Debug, Serialize)]
pub struct HistoryMessage {
    pub sender: String,
    pub text: String,
    pub is_ai: bool,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClearRoomRequest {
    pub room_id: String,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: String,
}

// -- Session gate --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StartSessionRequest {
    pub user_id: Uuid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SessionStatus {
    Allowed,
    Locked,
}

#[derive(Debug, Serialize)]
pub struct StartSessionResponse {
    pub status: SessionStatus,
    pub sessions_used: u32,
}

// -- Contact leads --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ContactRequest {
    pub name: String,
    pub email: String,
    pub message: String,
}

// -- Uploads --

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub file_id: String,
    pub size: u64,
}
