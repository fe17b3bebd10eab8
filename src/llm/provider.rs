use async_trait::async_trait;

use crate::errors::KbError;

/// Opaque capability: a finished prompt in, generated text out.
///
/// `Ok(None)` means the provider responded but its payload carried no
/// answer text; the pipeline substitutes a fixed fallback in that case.
/// Transport or API failures surface as `KbError::Generation` and are never
/// retried here.
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// Provider name, for logs.
    fn name(&self) -> &str;

    async fn generate(&self, prompt: &str) -> Result<Option<String>, KbError>;
}
