use std::sync::Arc;

use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::server::handlers::{chat, health, index_admin, sessions};
use crate::state::AppState;

/// Builds the application router: the chat surface plus the three
/// idempotent sidebar commands (clear history, delete index now, delete
/// index on next start) and the status endpoints.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/api/status", get(health::get_status))
        .route("/api/chat", post(chat::chat))
        .route(
            "/api/sessions/:session_id/messages",
            get(sessions::get_session_messages),
        )
        .route(
            "/api/sessions/:session_id/clear",
            post(sessions::clear_session),
        )
        .route("/api/index", delete(index_admin::delete_index_now))
        .route(
            "/api/index/schedule-delete",
            post(index_admin::schedule_index_deletion),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
