//! Hosted generative-model access.

mod gemini;
mod provider;

pub use gemini::GeminiProvider;
pub use provider::GenerationProvider;
