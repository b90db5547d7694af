//! Handler-boundary error type. Persistence and model failures are converted
//! to structured JSON here; nothing propagates far enough to crash the
//! process, and internal detail goes to the logs rather than the client.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;
use tracing::error;
use warroom_llm::AttachmentError;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Storage or other internal failure. The client sees a generic message.
    #[error("internal storage error")]
    Storage(#[source] anyhow::Error),

    #[error("{0}")]
    Validation(String),

    #[error("user not found")]
    UnknownUser,

    #[error("username already taken")]
    UsernameTaken,

    #[error("this device is already registered to an account")]
    DeviceAlreadyRegistered,

    #[error("invalid username or password")]
    BadCredentials,

    #[error("message limit reached")]
    QuotaExceeded,

    #[error("{0}")]
    UnsupportedAttachment(String),

    #[error("upload too large")]
    PayloadTooLarge,
}

impl ApiError {
    /// Wraps any internal failure, keeping the original for the logs.
    pub fn storage(err: impl Into<anyhow::Error>) -> Self {
        Self::Storage(err.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::UnknownUser => StatusCode::NOT_FOUND,
            Self::UsernameTaken => StatusCode::CONFLICT,
            Self::DeviceAlreadyRegistered => StatusCode::FORBIDDEN,
            Self::BadCredentials => StatusCode::UNAUTHORIZED,
            Self::QuotaExceeded => StatusCode::PAYMENT_REQUIRED,
            Self::UnsupportedAttachment(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Self::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
        }
    }
}

impl From<AttachmentError> for ApiError {
    fn from(err: AttachmentError) -> Self {
        match err {
            AttachmentError::Unsupported(msg) => Self::UnsupportedAttachment(msg),
            AttachmentError::Extraction(msg) => Self::Validation(msg),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let Self::Storage(source) = &self {
            error!("internal error: {:#}", source);
        }
        let body = Json(json!({ "error": self.to_string() }));
        (self.status(), body).into_response()
    }
}
