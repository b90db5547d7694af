//! The chat pipeline: persist the human message, decide whether to reply,
//! assemble context, run the model fallback chain, persist the reply.

use axum::{
    Json,
    extract::{Query, State},
    response::IntoResponse,
};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as B64;
use serde::Deserialize;
use tracing::warn;

use warroom_db::models::{ChatRow, QuotaOutcome};
use warroom_llm::{Attachment, GenerateBackend, GenerationRequest, PromptPart};
use warroom_types::api::{
    ClearRoomRequest, HistoryMessage, SendMessageRequest, SendMessageResponse, StatusResponse,
};

use crate::auth::AppState;
use crate::context::{self, CONTEXT_MESSAGE_LIMIT};
use crate::error::ApiError;
use crate::trigger::{self, AI_SENDER_NAME, Verdict};

/// Returned in place of model output when every configured model has failed.
/// Stable and provider-error-free: the conversation UI always gets a
/// displayable reply.
const UNAVAILABLE_REPLY: &str =
    "The AI Consultant is unavailable right now. Please try again in a moment.";

/// Body cap for /api/chat/send: the 50 MB attachment limit plus base64 and
/// JSON envelope overhead. The router installs this in place of axum's 2 MB
/// default.
pub const MAX_SEND_BODY_BYTES: usize = 72 * 1024 * 1024;

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub room_id: String,
}

pub async fn history<B: Send + Sync + 'static>(
    State(state): State<AppState<B>>,
    Query(query): Query<HistoryQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let room_id = query.room_id;
    let rows = tokio::task::spawn_blocking(move || db.db.room_history(&room_id))
        .await
        .map_err(ApiError::storage)?
        .map_err(ApiError::storage)?;

    let messages: Vec<HistoryMessage> = rows
        .into_iter()
        .map(|row| HistoryMessage {
            timestamp: parse_db_timestamp(&row),
            sender: row.sender_name,
            text: row.message,
            is_ai: row.is_ai,
        })
        .collect();

    Ok(Json(messages))
}

pub async fn send_message<B: GenerateBackend + Send + Sync + 'static>(
    State(state): State<AppState<B>>,
    Json(req): Json<SendMessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.room_id.is_empty() {
        return Err(ApiError::validation("room_id is required"));
    }
    if req.sender_name.is_empty() {
        return Err(ApiError::validation("sender_name is required"));
    }

    // Validate the attachment up front: a rejected request must not have
    // consumed quota or persisted anything.
    let part = decode_attachment(&req).await?;

    let is_sentinel = trigger::is_sentinel(&req.sender_name);

    // Quota gate first: a blocked send persists nothing and invokes no model.
    // Sentinels are internal events, not user sends, and bypass the gate.
    if !is_sentinel {
        let db = state.clone();
        let sender = req.sender_name.clone();
        let allow_listed = state.quota.is_allow_listed(&sender);
        let ceiling = state.quota.ceiling();
        let outcome = tokio::task::spawn_blocking(move || {
            db.db.consume_message_quota(&sender, allow_listed, ceiling)
        })
        .await
        .map_err(ApiError::storage)?
        .map_err(ApiError::storage)?;

        if let QuotaOutcome::LimitReached { .. } = outcome {
            return Err(ApiError::QuotaExceeded);
        }
    }

    // Persist the human message. Sentinel bodies are instructions, not chat.
    if !is_sentinel {
        let db = state.clone();
        let (room, sender, text) = (
            req.room_id.clone(),
            req.sender_name.clone(),
            req.message.clone(),
        );
        tokio::task::spawn_blocking(move || db.db.insert_chat(&room, &sender, &text, false))
            .await
            .map_err(ApiError::storage)?
            .map_err(ApiError::storage)?;
    }

    // Solo-occupancy needs the sender count; skip the query when the rule is
    // off. A failed count degrades to "rule does not apply", never an error.
    let distinct_senders = if !is_sentinel && state.trigger.solo_room_auto_reply() {
        let db = state.clone();
        let room = req.room_id.clone();
        match tokio::task::spawn_blocking(move || db.db.distinct_human_senders(&room)).await {
            Ok(Ok(n)) => Some(n),
            Ok(Err(error)) => {
                warn!(%error, "sender count failed; skipping solo-occupancy rule");
                None
            }
            Err(error) => {
                warn!(%error, "sender count task failed; skipping solo-occupancy rule");
                None
            }
        }
    } else {
        None
    };

    let prompt = match state
        .trigger
        .evaluate(&req.sender_name, &req.message, distinct_senders)
    {
        Verdict::Silent => {
            return Ok(Json(SendMessageResponse::Stored {
                status: "Stored".to_string(),
            }));
        }
        Verdict::Reply { prompt } => prompt,
        Verdict::Addressed => {
            // History-read failure degrades to an empty context block; it
            // never fails the request.
            let db = state.clone();
            let room = req.room_id.clone();
            let rows = tokio::task::spawn_blocking(move || {
                db.db.room_context(&room, CONTEXT_MESSAGE_LIMIT)
            })
            .await
            .map_err(anyhow::Error::from)
            .and_then(|r| r)
            .unwrap_or_else(|error| {
                warn!(%error, "context fetch failed; replying without history");
                Vec::new()
            });

            context::addressed_prompt(&context::assemble(&rows), &req.message)
        }
    };

    let ai_reply = match state.llm.generate(&GenerationRequest { prompt, part }).await {
        Ok(text) => text,
        Err(error) => {
            warn!(%error, room_id = %req.room_id, "model chain exhausted");
            UNAVAILABLE_REPLY.to_string()
        }
    };

    let db = state.clone();
    let (room, reply) = (req.room_id.clone(), ai_reply.clone());
    tokio::task::spawn_blocking(move || db.db.insert_chat(&room, AI_SENDER_NAME, &reply, true))
        .await
        .map_err(ApiError::storage)?
        .map_err(ApiError::storage)?;

    Ok(Json(SendMessageResponse::Reply { ai_reply }))
}

pub async fn clear_room<B: Send + Sync + 'static>(
    State(state): State<AppState<B>>,
    Json(req): Json<ClearRoomRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.room_id.is_empty() {
        return Err(ApiError::validation("room_id is required"));
    }

    let db = state.clone();
    let room_id = req.room_id;
    tokio::task::spawn_blocking(move || db.db.clear_room(&room_id))
        .await
        .map_err(ApiError::storage)?
        .map_err(ApiError::storage)?;

    Ok(Json(StatusResponse {
        status: "cleared".to_string(),
    }))
}

async fn decode_attachment(req: &SendMessageRequest) -> Result<Option<PromptPart>, ApiError> {
    match (&req.file_data, &req.mime_type) {
        (Some(data), Some(mime)) => {
            let bytes = B64
                .decode(data)
                .map_err(|_| ApiError::validation("file_data must be base64"))?;
            let part = Attachment {
                bytes,
                mime_type: mime.clone(),
            }
            .normalize()
            .await?;
            Ok(Some(part))
        }
        (Some(_), None) => Err(ApiError::validation("mime_type is required with file_data")),
        _ => Ok(None),
    }
}

/// SQLite stores timestamps as "YYYY-MM-DD HH:MM:SS" without timezone.
/// Parse as naive UTC and convert; RFC 3339 is accepted too.
fn parse_db_timestamp(row: &ChatRow) -> chrono::DateTime<chrono::Utc> {
    row.created_at
        .parse::<chrono::DateTime<chrono::Utc>>()
        .or_else(|_| {
            chrono::NaiveDateTime::parse_from_str(&row.created_at, "%Y-%m-%d %H:%M:%S")
                .map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            warn!("Corrupt created_at '{}' on chat row {}: {}", row.created_at, row.id, e);
            chrono::DateTime::default()
        })
}
