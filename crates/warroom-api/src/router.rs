//! Route table shared by the server binary and the handler tests.

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use warroom_llm::GenerateBackend;

use crate::auth::{self, AppState};
use crate::middleware::require_auth;
use crate::{chat, contact, files, session};

/// Builds the full application router. Body limits: axum's 2 MB default
/// stays for the small JSON endpoints, while /api/chat/send and /api/upload
/// get limits sized to the 50 MB attachment contract.
pub fn router<B: GenerateBackend + Send + Sync + 'static>(state: AppState<B>) -> Router {
    let public_routes = Router::new()
        .route("/api/auth/signup", post(auth::signup::<B>))
        .route("/api/auth/login", post(auth::login::<B>))
        .route("/api/chat/history", get(chat::history::<B>))
        .route(
            "/api/chat/send",
            post(chat::send_message::<B>).layer(DefaultBodyLimit::max(chat::MAX_SEND_BODY_BYTES)),
        )
        .route("/api/chat/clear", post(chat::clear_room::<B>))
        .route("/api/user/start_session", post(session::start_session::<B>))
        .route("/api/contact", post(contact::submit_lead::<B>))
        .with_state(state.clone());

    let protected_routes = Router::new()
        .route(
            "/api/upload",
            post(files::upload_file::<B>).layer(DefaultBodyLimit::max(files::MAX_FILE_SIZE)),
        )
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            require_auth::<B>,
        ))
        .with_state(state);

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
