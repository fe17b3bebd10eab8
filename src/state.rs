//! Shared application state and the question/answer orchestration.

use std::sync::Arc;

use crate::config::{AppConfig, AppPaths};
use crate::errors::KbError;
use crate::index::delete_index;
use crate::llm::{GeminiProvider, GenerationProvider};
use crate::resources::ResourceCache;
use crate::session::{take_pending_deletion, Role, SessionStore};

#[derive(Clone)]
pub struct AppState {
    pub paths: Arc<AppPaths>,
    pub config: AppConfig,
    pub resources: Arc<ResourceCache>,
    pub sessions: SessionStore,
}

impl AppState {
    /// Builds the state from the process environment, failing fast with
    /// `MissingCredential` when no API key can be resolved.
    pub fn initialize() -> Result<Arc<Self>, KbError> {
        let paths = Arc::new(AppPaths::new());
        let config = AppConfig::resolve(&paths)?;
        let provider: Arc<dyn GenerationProvider> = Arc::new(GeminiProvider::new(
            config.api_key.clone(),
            config.generation_model.clone(),
        ));
        Self::with_paths(paths, config, provider)
    }

    /// Wires the state over explicit paths and provider. The deferred
    /// index-deletion flag is consumed here, before any resource exists.
    pub fn with_paths(
        paths: Arc<AppPaths>,
        config: AppConfig,
        provider: Arc<dyn GenerationProvider>,
    ) -> Result<Arc<Self>, KbError> {
        if take_pending_deletion(&paths)? {
            tracing::info!("honoring deferred index deletion from previous session");
            delete_index(&paths.index_dir)?;
        }

        let resources = Arc::new(ResourceCache::new(paths.clone(), config.top_k, provider));
        let sessions = SessionStore::new(&paths);

        Ok(Arc::new(AppState {
            paths,
            config,
            resources,
            sessions,
        }))
    }

    /// One question/answer cycle. The user turn is recorded as soon as the
    /// question arrives; the assistant turn is recorded only when
    /// generation succeeds, so a failed turn leaves the question in history
    /// with no answer attached.
    pub async fn ask(
        &self,
        session_id: Option<String>,
        question: &str,
    ) -> Result<(String, String), KbError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(KbError::InvalidArgument("question must not be empty".to_string()));
        }

        let session_id = self.sessions.ensure_session(session_id);
        self.sessions.record_turn(&session_id, Role::User, question.to_string());

        let pipeline = self.resources.get_pipeline().await?;
        let answer = pipeline.answer(question).await?;

        self.sessions.record_turn(&session_id, Role::Assistant, answer.clone());
        Ok((session_id, answer))
    }
}
