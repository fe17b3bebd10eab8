//! Top-k similarity retrieval over a vector store.

use std::sync::Arc;

use crate::embedding::HashEmbedder;
use crate::errors::KbError;
use crate::index::{SearchHit, VectorStore};

/// Matches the retriever default the index was originally served with.
pub const DEFAULT_TOP_K: usize = 4;

#[derive(Clone)]
pub struct Retriever {
    store: Arc<dyn VectorStore>,
    embedder: HashEmbedder,
    top_k: usize,
}

impl Retriever {
    pub fn new(store: Arc<dyn VectorStore>, embedder: HashEmbedder, top_k: usize) -> Self {
        Self {
            store,
            embedder,
            top_k,
        }
    }

    /// Embeds `question` and returns its top-k most similar passages.
    pub async fn retrieve(&self, question: &str) -> Result<Vec<SearchHit>, KbError> {
        let query = self.embedder.embed(question);
        self.store.search(&query, self.top_k).await
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }
}
