use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::errors::KbError;
use crate::state::AppState;

pub async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

pub async fn get_status(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, KbError> {
    let phase = state.resources.phase().await;
    let entry_count = state.resources.entry_count().await;

    Ok(Json(json!({
        "corpus_dir": state.paths.corpus_dir.display().to_string(),
        "index_dir": state.paths.index_dir.display().to_string(),
        "index_phase": phase,
        "index_entries": entry_count,
        "deletion_pending": state.sessions.deletion_pending(),
        "generation_model": state.config.generation_model,
    })))
}
