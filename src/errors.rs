use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum KbError {
    #[error("missing credential: set GOOGLE_API_KEY or add it to secrets.yaml")]
    MissingCredential,
    #[error("empty corpus: no markdown documents found in {0}")]
    EmptyCorpus(String),
    #[error("storage error: {0}")]
    Storage(String),
    #[error("corrupt index: {0}")]
    CorruptIndex(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("generation failed: {0}")]
    Generation(String),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl KbError {
    pub fn internal<E: std::fmt::Display>(err: E) -> Self {
        KbError::Internal(err.to_string())
    }

    pub fn storage<E: std::fmt::Display>(err: E) -> Self {
        KbError::Storage(err.to_string())
    }
}

impl IntoResponse for KbError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            KbError::MissingCredential => StatusCode::SERVICE_UNAVAILABLE,
            KbError::EmptyCorpus(_) => StatusCode::CONFLICT,
            KbError::NotFound(_) => StatusCode::NOT_FOUND,
            KbError::Generation(_) => StatusCode::BAD_GATEWAY,
            KbError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            KbError::Storage(_) | KbError::CorruptIndex(_) | KbError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}
