use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::KbError;

/// One indexed chunk: its embedding, text, and source metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexEntry {
    pub embedding: Vec<f32>,
    pub text: String,
    pub source: String,
    pub seq: usize,
}

/// A retrieved passage with its similarity score (higher = better).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub text: String,
    pub source: String,
    pub score: f32,
}

/// Read side of a built or loaded index.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Returns up to `k` hits ordered by descending similarity, ties broken
    /// by insertion order. `k == 0` is an `InvalidArgument` error.
    async fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>, KbError>;

    /// Number of entries in the index.
    async fn len(&self) -> Result<usize, KbError>;
}
