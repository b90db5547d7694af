use axum::{Json, extract::State, response::IntoResponse};

use warroom_db::models::UserRow;
use warroom_types::api::{SessionStatus, StartSessionRequest, StartSessionResponse};

use crate::auth::AppState;
use crate::error::ApiError;

/// Counter-threshold gate for the free tier. Allow-listed names are counted
/// like everyone else but never refused.
#[derive(Debug, Clone)]
pub struct QuotaPolicy {
    ceiling: u32,
    allow_list: Vec<String>,
}

impl QuotaPolicy {
    pub fn new(ceiling: u32, allow_list: Vec<String>) -> Self {
        Self { ceiling, allow_list }
    }

    pub fn ceiling(&self) -> u32 {
        self.ceiling
    }

    pub fn is_allow_listed(&self, username: &str) -> bool {
        self.allow_list.iter().any(|n| n == username)
    }

    pub fn status_for(&self, user: &UserRow) -> SessionStatus {
        if user.message_count >= self.ceiling && !self.is_allow_listed(&user.username) {
            SessionStatus::Locked
        } else {
            SessionStatus::Allowed
        }
    }
}

pub async fn start_session<B: Send + Sync + 'static>(
    State(state): State<AppState<B>>,
    Json(req): Json<StartSessionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let user_id = req.user_id.to_string();
    let user = tokio::task::spawn_blocking(move || db.db.get_user_by_id(&user_id))
        .await
        .map_err(ApiError::storage)?
        .map_err(ApiError::storage)?
        .ok_or(ApiError::UnknownUser)?;

    Ok(Json(StartSessionResponse {
        status: state.quota.status_for(&user),
        sessions_used: user.message_count,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(username: &str, count: u32) -> UserRow {
        UserRow {
            id: "u1".into(),
            username: username.into(),
            password: "hash".into(),
            room_id: "room-x".into(),
            device_id: None,
            message_count: count,
            created_at: "2026-01-01 10:00:00".into(),
        }
    }

    #[test]
    fn locks_at_the_ceiling() {
        let policy = QuotaPolicy::new(3, vec![]);
        assert_eq!(policy.status_for(&user("alice", 2)), SessionStatus::Allowed);
        assert_eq!(policy.status_for(&user("alice", 3)), SessionStatus::Locked);
        assert_eq!(policy.status_for(&user("alice", 10)), SessionStatus::Locked);
    }

    #[test]
    fn allow_listed_users_are_never_locked() {
        let policy = QuotaPolicy::new(3, vec!["founder".into()]);
        assert_eq!(policy.status_for(&user("founder", 99)), SessionStatus::Allowed);
        assert_eq!(policy.status_for(&user("guest", 99)), SessionStatus::Locked);
    }
}
