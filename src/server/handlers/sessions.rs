use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::errors::KbError;
use crate::state::AppState;

pub async fn get_session_messages(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, KbError> {
    let messages = state.sessions.history(&session_id);
    Ok(Json(json!({ "session_id": session_id, "messages": messages })))
}

pub async fn clear_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, KbError> {
    state.sessions.clear_history(&session_id);
    Ok(Json(json!({ "session_id": session_id, "cleared": true })))
}
