use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::errors::KbError;
use crate::state::AppState;

/// Deletes the persisted index immediately and invalidates the cached
/// pipeline; the next query rebuilds from the corpus. Idempotent.
pub async fn delete_index_now(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, KbError> {
    state.resources.delete_index_now().await?;
    Ok(Json(json!({ "deleted": true })))
}

/// Arms index deletion for the start of the next process lifetime.
pub async fn schedule_index_deletion(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, KbError> {
    state.sessions.schedule_index_deletion()?;
    Ok(Json(json!({ "scheduled": true })))
}
