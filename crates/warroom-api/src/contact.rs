use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};

use warroom_types::api::{ContactRequest, StatusResponse};

use crate::auth::AppState;
use crate::error::ApiError;

pub async fn submit_lead<B: Send + Sync + 'static>(
    State(state): State<AppState<B>>,
    Json(req): Json<ContactRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.name.trim().is_empty() {
        return Err(ApiError::validation("name is required"));
    }
    if !req.email.contains('@') {
        return Err(ApiError::validation("email is invalid"));
    }
    if req.message.trim().is_empty() {
        return Err(ApiError::validation("message is required"));
    }

    let db = state.clone();
    tokio::task::spawn_blocking(move || db.db.insert_lead(&req.name, &req.email, &req.message))
        .await
        .map_err(ApiError::storage)?
        .map_err(ApiError::storage)?;

    Ok((
        StatusCode::CREATED,
        Json(StatusResponse {
            status: "ok".to_string(),
        }),
    ))
}
