use axum::{
    Extension, Json,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode, header},
    response::IntoResponse,
};
use tokio::io::AsyncWriteExt;
use tracing::error;
use uuid::Uuid;

use warroom_types::api::{Claims, UploadResponse};

use crate::auth::AppState;
use crate::error::ApiError;

/// 50 MB upload limit. The router raises axum's default body limit to this
/// value on the upload route; anything larger is refused before the handler.
pub const MAX_FILE_SIZE: usize = 50 * 1024 * 1024;

/// POST /api/upload — accepts a raw body (any content type), saves it under
/// the configured upload directory, inserts a DB row, returns { file_id, size }.
pub async fn upload_file<B: Send + Sync + 'static>(
    State(state): State<AppState<B>>,
    Extension(claims): Extension<Claims>,
    headers: HeaderMap,
    bytes: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    if bytes.is_empty() {
        return Err(ApiError::validation("empty upload body"));
    }

    if bytes.len() > MAX_FILE_SIZE {
        return Err(ApiError::PayloadTooLarge);
    }

    let mime_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("application/octet-stream")
        .to_string();

    let file_id = Uuid::new_v4().to_string();
    let size = bytes.len() as i64;

    tokio::fs::create_dir_all(&state.upload_dir)
        .await
        .map_err(|e| {
            error!("Failed to create upload directory: {}", e);
            ApiError::storage(e)
        })?;

    let file_path = state.upload_dir.join(&file_id);
    let mut file = tokio::fs::File::create(&file_path).await.map_err(|e| {
        error!("Failed to create file {}: {}", file_path.display(), e);
        ApiError::storage(e)
    })?;
    file.write_all(&bytes).await.map_err(|e| {
        error!("Failed to write file {}: {}", file_path.display(), e);
        ApiError::storage(e)
    })?;

    let db = state.clone();
    let fid = file_id.clone();
    let uid = claims.sub.to_string();
    tokio::task::spawn_blocking(move || db.db.insert_upload(&fid, &uid, &mime_type, size))
        .await
        .map_err(ApiError::storage)?
        .map_err(ApiError::storage)?;

    Ok((
        StatusCode::CREATED,
        Json(UploadResponse {
            file_id,
            size: size as u64,
        }),
    ))
}
