//! Process-wide resource cache for the answer pipeline.
//!
//! Construction of the embedder, index and pipeline is expensive and must
//! happen at most once per process. A build mutex gives single-flight
//! semantics: when several sessions ask for the pipeline before any index
//! exists, exactly one performs the build (or load) while the rest wait and
//! then share the same handle. Invalidation replaces the cached `Arc`
//! atomically; callers holding the old handle finish their in-flight
//! answers against it.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{Mutex, RwLock};

use crate::config::AppPaths;
use crate::corpus::{ingest_corpus, ChunkSplitter};
use crate::embedding::HashEmbedder;
use crate::errors::KbError;
use crate::index::{delete_index, IndexEntry, SqliteVectorIndex, VectorStore};
use crate::llm::GenerationProvider;
use crate::pipeline::AnswerPipeline;
use crate::retriever::Retriever;

/// Index lifecycle: `Absent -> Building -> Ready`, back to `Absent` on
/// deletion. `Building` is only ever entered under the build lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexPhase {
    Absent,
    Building,
    Ready,
}

struct CachedResources {
    pipeline: Arc<AnswerPipeline>,
    index: Arc<SqliteVectorIndex>,
}

pub struct ResourceCache {
    paths: Arc<AppPaths>,
    top_k: usize,
    provider: Arc<dyn GenerationProvider>,
    slot: RwLock<Option<Arc<CachedResources>>>,
    build_lock: Mutex<()>,
    phase: RwLock<IndexPhase>,
}

impl ResourceCache {
    pub fn new(paths: Arc<AppPaths>, top_k: usize, provider: Arc<dyn GenerationProvider>) -> Self {
        let initial_phase = if SqliteVectorIndex::exists(&paths.index_dir) {
            IndexPhase::Ready
        } else {
            IndexPhase::Absent
        };

        Self {
            paths,
            top_k,
            provider,
            slot: RwLock::new(None),
            build_lock: Mutex::new(()),
            phase: RwLock::new(initial_phase),
        }
    }

    /// Returns the shared answer pipeline, constructing it on first use.
    /// Concurrent first calls block on the build lock and reuse the result
    /// of whichever caller built it.
    pub async fn get_pipeline(&self) -> Result<Arc<AnswerPipeline>, KbError> {
        if let Some(cached) = self.slot.read().await.clone() {
            return Ok(cached.pipeline.clone());
        }

        let _guard = self.build_lock.lock().await;
        // Another caller may have finished construction while we waited.
        if let Some(cached) = self.slot.read().await.clone() {
            return Ok(cached.pipeline.clone());
        }

        let cached = Arc::new(self.construct().await?);
        let pipeline = cached.pipeline.clone();
        *self.slot.write().await = Some(cached);
        *self.phase.write().await = IndexPhase::Ready;
        Ok(pipeline)
    }

    /// Removes the persisted index and invalidates the cached pipeline so
    /// the next query rebuilds from the corpus. Idempotent.
    pub async fn delete_index_now(&self) -> Result<(), KbError> {
        let _guard = self.build_lock.lock().await;
        *self.slot.write().await = None;
        delete_index(&self.paths.index_dir)?;
        *self.phase.write().await = IndexPhase::Absent;
        tracing::info!("vector index deleted, next query will rebuild");
        Ok(())
    }

    pub async fn phase(&self) -> IndexPhase {
        *self.phase.read().await
    }

    /// Entry count of the currently cached index, if one is loaded.
    pub async fn entry_count(&self) -> Option<usize> {
        let cached = self.slot.read().await.clone()?;
        cached.index.len().await.ok()
    }

    async fn construct(&self) -> Result<CachedResources, KbError> {
        let embedder = HashEmbedder::default();

        let index = if SqliteVectorIndex::exists(&self.paths.index_dir) {
            tracing::info!("loading existing vector index from {}", self.paths.index_dir.display());
            SqliteVectorIndex::load(&self.paths.index_dir).await?
        } else {
            self.build_index(&embedder).await?
        };
        let index = Arc::new(index);

        let retriever = Retriever::new(
            index.clone() as Arc<dyn VectorStore>,
            embedder,
            self.top_k,
        );
        let pipeline = Arc::new(AnswerPipeline::new(retriever, self.provider.clone()));

        Ok(CachedResources { pipeline, index })
    }

    async fn build_index(&self, embedder: &HashEmbedder) -> Result<SqliteVectorIndex, KbError> {
        *self.phase.write().await = IndexPhase::Building;

        let result = self.build_index_inner(embedder).await;
        if result.is_err() {
            *self.phase.write().await = IndexPhase::Absent;
        }
        result
    }

    async fn build_index_inner(&self, embedder: &HashEmbedder) -> Result<SqliteVectorIndex, KbError> {
        tracing::info!("building vector index from corpus at {}", self.paths.corpus_dir.display());

        let documents = ingest_corpus(&self.paths.corpus_dir)?;
        let splitter = ChunkSplitter::default();
        let total = documents.len();

        let mut entries = Vec::new();
        for (done, document) in documents.iter().enumerate() {
            let chunks = splitter.split(&document.id, &document.text);
            tracing::info!(
                "embedding document {}/{} ({}, {} chunks)",
                done + 1,
                total,
                document.id,
                chunks.len()
            );
            for chunk in chunks {
                entries.push(IndexEntry {
                    embedding: embedder.embed(&chunk.text),
                    text: chunk.text,
                    source: chunk.document_id,
                    seq: chunk.seq,
                });
            }
        }

        SqliteVectorIndex::build(&self.paths.index_dir, entries).await
    }
}
