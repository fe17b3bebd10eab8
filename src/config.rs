//! Paths and startup configuration.
//!
//! All filesystem locations live under one data directory so a single env
//! var relocates the whole installation (useful in tests). The API
//! credential is resolved exactly once, at startup, with a fixed precedence:
//! environment variable first, then `secrets.yaml` in the data directory.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde_yaml::Value;

use crate::errors::KbError;

pub const CREDENTIAL_ENV_VAR: &str = "GOOGLE_API_KEY";

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub data_dir: PathBuf,
    pub corpus_dir: PathBuf,
    pub index_dir: PathBuf,
    pub log_dir: PathBuf,
    pub secrets_path: PathBuf,
    pub pending_delete_path: PathBuf,
}

impl AppPaths {
    pub fn new() -> Self {
        let data_dir = env::var("KB_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));
        Self::with_data_dir(data_dir)
    }

    pub fn with_data_dir(data_dir: PathBuf) -> Self {
        let corpus_dir = env::var("KB_CORPUS_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_dir.join("documents"));
        let index_dir = env::var("KB_INDEX_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_dir.join("vector_index"));
        let log_dir = data_dir.join("logs");
        let secrets_path = data_dir.join("secrets.yaml");
        let pending_delete_path = data_dir.join("index_delete.pending");

        let _ = fs::create_dir_all(&data_dir);
        let _ = fs::create_dir_all(&log_dir);

        AppPaths {
            data_dir,
            corpus_dir,
            index_dir,
            log_dir,
            secrets_path,
            pending_delete_path,
        }
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api_key: String,
    pub generation_model: String,
    pub top_k: usize,
}

impl AppConfig {
    /// Resolves the configuration, failing fast with `MissingCredential`
    /// when neither the environment nor the secrets file yields a key.
    pub fn resolve(paths: &AppPaths) -> Result<Self, KbError> {
        let api_key = resolve_credential(paths)?;
        let generation_model =
            env::var("KB_GENERATION_MODEL").unwrap_or_else(|_| "gemini-2.0-flash".to_string());

        Ok(AppConfig {
            api_key,
            generation_model,
            top_k: crate::retriever::DEFAULT_TOP_K,
        })
    }
}

fn resolve_credential(paths: &AppPaths) -> Result<String, KbError> {
    if let Ok(key) = env::var(CREDENTIAL_ENV_VAR) {
        let key = key.trim().to_string();
        if !key.is_empty() {
            return Ok(key);
        }
    }

    if let Some(key) = read_secrets_key(&paths.secrets_path, CREDENTIAL_ENV_VAR) {
        return Ok(key);
    }

    Err(KbError::MissingCredential)
}

fn read_secrets_key(secrets_path: &Path, key: &str) -> Option<String> {
    let raw = fs::read_to_string(secrets_path).ok()?;
    let doc: Value = serde_yaml::from_str(&raw).ok()?;
    let value = doc.get(key)?.as_str()?.trim().to_string();
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}
