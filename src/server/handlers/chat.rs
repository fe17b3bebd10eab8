use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::errors::KbError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub session_id: Option<String>,
    pub question: String,
}

/// One question, one answer. Generation failures surface as this turn's
/// error response; the asked question stays in the session history.
pub async fn chat(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ChatRequest>,
) -> Result<impl IntoResponse, KbError> {
    let (session_id, answer) = state.ask(payload.session_id, &payload.question).await?;
    Ok(Json(json!({ "session_id": session_id, "answer": answer })))
}
