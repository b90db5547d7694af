use std::path::PathBuf;
use std::sync::Arc;

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use jsonwebtoken::{EncodingKey, Header, encode};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use warroom_db::Database;
use warroom_llm::{GeminiClient, ModelChain};
use warroom_types::api::{Claims, LoginRequest, LoginResponse, SignupRequest, SignupResponse};

use crate::error::ApiError;
use crate::session::QuotaPolicy;
use crate::trigger::TriggerPolicy;

pub type AppState<B = GeminiClient> = Arc<AppStateInner<B>>;

/// Generic over the generation backend so the chat pipeline can be exercised
/// with a scripted chain in tests; production wires in [`GeminiClient`].
pub struct AppStateInner<B = GeminiClient> {
    pub db: Database,
    pub llm: ModelChain<B>,
    pub jwt_secret: String,
    pub trigger: TriggerPolicy,
    pub quota: QuotaPolicy,
    pub upload_dir: PathBuf,
}

pub async fn signup<B: Send + Sync + 'static>(
    State(state): State<AppState<B>>,
    Json(req): Json<SignupRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.username.len() < 3 || req.username.len() > 32 {
        return Err(ApiError::validation("username must be 3-32 characters"));
    }
    if req.password.len() < 8 {
        return Err(ApiError::validation("password must be at least 8 characters"));
    }

    // Check if username is taken
    let username = req.username.clone();
    let db = state.clone();
    let existing = tokio::task::spawn_blocking(move || db.db.get_user_by_username(&username))
        .await
        .map_err(ApiError::storage)?
        .map_err(ApiError::storage)?;
    if existing.is_some() {
        return Err(ApiError::UsernameTaken);
    }

    // First-seen device binding: one account per device fingerprint.
    if let Some(device_id) = req.device_id.clone() {
        let db = state.clone();
        let taken = tokio::task::spawn_blocking(move || db.db.device_in_use(&device_id))
            .await
            .map_err(ApiError::storage)?
            .map_err(ApiError::storage)?;
        if taken {
            return Err(ApiError::DeviceAlreadyRegistered);
        }
    }

    // Hash password with Argon2id
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let password_hash = argon2
        .hash_password(req.password.as_bytes(), &salt)
        .map_err(|e| ApiError::storage(anyhow::anyhow!("password hashing failed: {}", e)))?
        .to_string();

    let user_id = Uuid::new_v4();
    let room_id = derive_room_id(&req.username);

    let db = state.clone();
    let (uid, username, room) = (user_id.to_string(), req.username.clone(), room_id.clone());
    let device_id = req.device_id.clone();
    tokio::task::spawn_blocking(move || {
        db.db
            .create_user(&uid, &username, &password_hash, &room, device_id.as_deref())
    })
    .await
    .map_err(ApiError::storage)?
    .map_err(ApiError::storage)?;

    let token = create_token(&state.jwt_secret, user_id, &req.username).map_err(ApiError::storage)?;

    Ok((
        StatusCode::CREATED,
        Json(SignupResponse {
            user_id,
            username: req.username,
            room_id,
            token,
        }),
    ))
}

pub async fn login<B: Send + Sync + 'static>(
    State(state): State<AppState<B>>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let username = req.username.clone();
    let db = state.clone();
    let user = tokio::task::spawn_blocking(move || db.db.get_user_by_username(&username))
        .await
        .map_err(ApiError::storage)?
        .map_err(ApiError::storage)?
        .ok_or(ApiError::BadCredentials)?;

    // Verify password
    let parsed_hash = PasswordHash::new(&user.password)
        .map_err(|e| ApiError::storage(anyhow::anyhow!("stored hash is corrupt: {}", e)))?;

    Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .map_err(|_| ApiError::BadCredentials)?;

    let user_id: Uuid = user.id.parse().map_err(ApiError::storage)?;

    let token = create_token(&state.jwt_secret, user_id, &user.username).map_err(ApiError::storage)?;

    Ok(Json(LoginResponse {
        user_id,
        username: user.username,
        room_id: user.room_id,
        sessions_used: user.message_count,
        token,
    }))
}

/// Personal room key, derived deterministically so the same account always
/// lands in the same room.
pub fn derive_room_id(username: &str) -> String {
    let digest = Sha256::digest(username.to_lowercase().as_bytes());
    format!("room-{}", &hex::encode(digest)[..12])
}

fn create_token(secret: &str, user_id: Uuid, username: &str) -> anyhow::Result<String> {
    let claims = Claims {
        sub: user_id,
        username: username.to_string(),
        exp: (chrono::Utc::now() + chrono::Duration::days(30)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn room_derivation_is_deterministic_and_case_insensitive() {
        assert_eq!(derive_room_id("Alice"), derive_room_id("alice"));
        assert_ne!(derive_room_id("alice"), derive_room_id("bob"));
        assert!(derive_room_id("alice").starts_with("room-"));
        assert_eq!(derive_room_id("alice").len(), "room-".len() + 12);
    }
}
