//! Corpus discovery and loading.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use crate::errors::KbError;

/// One source file from the corpus directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub source_path: PathBuf,
    pub text: String,
}

/// Scans `corpus_dir` for markdown files and loads each as UTF-8 text.
///
/// A missing directory is created empty; both that case and a directory
/// with zero matching files report `EmptyCorpus` so the caller can tell the
/// operator to populate it, rather than silently building an empty index.
pub fn ingest_corpus(corpus_dir: &Path) -> Result<Vec<Document>, KbError> {
    if !corpus_dir.exists() {
        fs::create_dir_all(corpus_dir).map_err(KbError::storage)?;
        tracing::warn!("corpus directory {} was missing, created it empty", corpus_dir.display());
        return Err(KbError::EmptyCorpus(corpus_dir.display().to_string()));
    }

    let mut paths: Vec<PathBuf> = WalkDir::new(corpus_dir)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "md"))
        .collect();
    // Stable ingestion order regardless of directory iteration order.
    paths.sort();

    if paths.is_empty() {
        return Err(KbError::EmptyCorpus(corpus_dir.display().to_string()));
    }

    let mut documents = Vec::with_capacity(paths.len());
    for path in paths {
        let text = fs::read_to_string(&path).map_err(KbError::storage)?;
        let id = path
            .strip_prefix(corpus_dir)
            .unwrap_or(&path)
            .to_string_lossy()
            .to_string();
        documents.push(Document {
            id,
            source_path: path,
            text,
        });
    }

    tracing::info!("loaded {} documents from {}", documents.len(), corpus_dir.display());
    Ok(documents)
}
