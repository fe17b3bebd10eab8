//! SQLite-backed vector index.
//!
//! The index is a directory containing a single `index.db`. Embeddings are
//! stored as little-endian f32 BLOBs next to the chunk text, and a `meta`
//! table records the format version, embedding dimension and entry count so
//! a persisted index can be loaded without external metadata. Search is
//! brute-force cosine over all rows, which is plenty for a corpus-sized
//! index.
//!
//! Durability invariant: `build` writes everything into a staging directory
//! and renames it into place, so the index either fully exists on disk or
//! does not exist at all.

use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};

use super::store::{IndexEntry, SearchHit, VectorStore};
use crate::errors::KbError;

const DB_FILE: &str = "index.db";
const FORMAT_VERSION: &str = "1";

#[derive(Debug)]
pub struct SqliteVectorIndex {
    pool: SqlitePool,
    location: PathBuf,
    dim: usize,
}

impl SqliteVectorIndex {
    /// Builds a fresh index at `location` from `entries`, persisting it
    /// durably. The write happens in a staging directory that is renamed
    /// into place once complete.
    pub async fn build(location: &Path, entries: Vec<IndexEntry>) -> Result<Self, KbError> {
        let dim = entries.first().map(|e| e.embedding.len()).unwrap_or(0);
        if entries.iter().any(|e| e.embedding.len() != dim) {
            return Err(KbError::InvalidArgument(
                "index entries have inconsistent embedding dimensions".to_string(),
            ));
        }

        let staging = staging_dir(location);
        let _ = fs::remove_dir_all(&staging);
        fs::create_dir_all(&staging).map_err(KbError::storage)?;

        let pool = open_pool(&staging.join(DB_FILE), true)
            .await
            .map_err(KbError::storage)?;
        init_schema(&pool).await.map_err(KbError::storage)?;

        let mut tx = pool.begin().await.map_err(KbError::storage)?;
        for entry in &entries {
            sqlx::query("INSERT INTO entries (content, source, seq, embedding) VALUES (?1, ?2, ?3, ?4)")
                .bind(&entry.text)
                .bind(&entry.source)
                .bind(entry.seq as i64)
                .bind(serialize_embedding(&entry.embedding))
                .execute(&mut *tx)
                .await
                .map_err(KbError::storage)?;
        }
        for (key, value) in [
            ("format_version", FORMAT_VERSION.to_string()),
            ("embedding_dim", dim.to_string()),
            ("entry_count", entries.len().to_string()),
        ] {
            sqlx::query("INSERT OR REPLACE INTO meta (key, value) VALUES (?1, ?2)")
                .bind(key)
                .bind(value)
                .execute(&mut *tx)
                .await
                .map_err(KbError::storage)?;
        }
        tx.commit().await.map_err(KbError::storage)?;

        // All file handles must be released before the rename.
        pool.close().await;

        let _ = fs::remove_dir_all(location);
        fs::rename(&staging, location).map_err(KbError::storage)?;

        tracing::info!("built vector index with {} entries at {}", entries.len(), location.display());
        Self::load(location).await
    }

    /// Loads a previously persisted index from `location`.
    pub async fn load(location: &Path) -> Result<Self, KbError> {
        let db_path = location.join(DB_FILE);
        if !location.exists() || !db_path.exists() {
            return Err(KbError::NotFound(format!(
                "no vector index at {}",
                location.display()
            )));
        }

        let pool = open_pool(&db_path, false)
            .await
            .map_err(|e| KbError::CorruptIndex(e.to_string()))?;

        let version = read_meta(&pool, "format_version").await?;
        if version != FORMAT_VERSION {
            return Err(KbError::CorruptIndex(format!(
                "unsupported index format version {version}"
            )));
        }
        let dim: usize = read_meta(&pool, "embedding_dim")
            .await?
            .parse()
            .map_err(|_| KbError::CorruptIndex("embedding_dim is not a number".to_string()))?;

        Ok(Self {
            pool,
            location: location.to_path_buf(),
            dim,
        })
    }

    /// Whether a persisted index is present at `location`.
    pub fn exists(location: &Path) -> bool {
        location.join(DB_FILE).exists()
    }

    pub fn location(&self) -> &Path {
        &self.location
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub async fn close(self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl VectorStore for SqliteVectorIndex {
    async fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>, KbError> {
        if k == 0 {
            return Err(KbError::InvalidArgument("k must be a positive integer".to_string()));
        }
        if query.len() != self.dim {
            return Err(KbError::InvalidArgument(format!(
                "query dimension {} does not match index dimension {}",
                query.len(),
                self.dim
            )));
        }

        let rows = sqlx::query("SELECT content, source, embedding FROM entries ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(KbError::storage)?;

        let mut hits: Vec<SearchHit> = rows
            .iter()
            .map(|row| {
                let blob: Vec<u8> = row.get("embedding");
                let embedding = deserialize_embedding(&blob);
                SearchHit {
                    text: row.get("content"),
                    source: row.get("source"),
                    score: cosine_similarity(query, &embedding),
                }
            })
            .collect();

        // Stable sort: equal scores keep insertion (rowid) order.
        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        hits.truncate(k);
        Ok(hits)
    }

    async fn len(&self) -> Result<usize, KbError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM entries")
            .fetch_one(&self.pool)
            .await
            .map_err(KbError::storage)?;
        Ok(count as usize)
    }
}

/// Removes the persisted index at `location`. Idempotent: deleting an
/// absent index is not an error. Any leftover staging directory from an
/// interrupted build is removed as well.
pub fn delete_index(location: &Path) -> Result<(), KbError> {
    for dir in [location.to_path_buf(), staging_dir(location)] {
        match fs::remove_dir_all(&dir) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(KbError::storage(e)),
        }
    }
    Ok(())
}

fn staging_dir(location: &Path) -> PathBuf {
    let mut name = location
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "index".to_string());
    name.push_str(".building");
    location.with_file_name(name)
}

async fn open_pool(db_path: &Path, create: bool) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(create)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal);

    SqlitePoolOptions::new()
        .min_connections(1)
        .max_connections(4)
        .connect_with(options)
        .await
}

async fn init_schema(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS entries (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            content TEXT NOT NULL,
            source TEXT NOT NULL DEFAULT '',
            seq INTEGER NOT NULL DEFAULT 0,
            embedding BLOB NOT NULL
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS meta (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )",
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn read_meta(pool: &SqlitePool, key: &str) -> Result<String, KbError> {
    sqlx::query_scalar::<_, String>("SELECT value FROM meta WHERE key = ?1")
        .bind(key)
        .fetch_optional(pool)
        .await
        .map_err(|e| KbError::CorruptIndex(e.to_string()))?
        .ok_or_else(|| KbError::CorruptIndex(format!("meta key '{key}' missing")))
}

fn serialize_embedding(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
}

fn deserialize_embedding(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    let denom = norm_a * norm_b;

    if denom <= f32::EPSILON {
        0.0
    } else {
        dot / denom
    }
}
