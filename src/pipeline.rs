//! The retrieval chain: retrieve, assemble the prompt, generate.

use std::sync::Arc;

use crate::errors::KbError;
use crate::llm::GenerationProvider;
use crate::retriever::Retriever;

/// Fixed prompt contract. The substitution points are `{context}` and
/// `{input}`; changing the wording changes answer behavior, so it is
/// reproduced verbatim.
pub const PROMPT_TEMPLATE: &str = "You are an assistant for question-answering tasks.
Use the following pieces of retrieved context to answer the question.
If you don't know the answer, just say that you don't know.
Be concise and helpful.

Context:
{context}

Question:
{input}

Answer:
";

pub const FALLBACK_ANSWER: &str = "Sorry, I couldn't find an answer.";

pub struct AnswerPipeline {
    retriever: Retriever,
    provider: Arc<dyn GenerationProvider>,
}

impl AnswerPipeline {
    pub fn new(retriever: Retriever, provider: Arc<dyn GenerationProvider>) -> Self {
        Self {
            retriever,
            provider,
        }
    }

    /// Answers `question` against the indexed corpus. Retrieval order is
    /// preserved in the context block. Provider failures propagate; a
    /// provider response without answer text becomes the fixed fallback.
    pub async fn answer(&self, question: &str) -> Result<String, KbError> {
        let hits = self.retriever.retrieve(question).await?;
        tracing::debug!("retrieved {} passages for question", hits.len());

        let context = hits
            .iter()
            .map(|hit| hit.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");

        let prompt = fill_prompt(&context, question);
        let answer = self.provider.generate(&prompt).await?;

        Ok(answer.unwrap_or_else(|| FALLBACK_ANSWER.to_string()))
    }

    pub fn retriever(&self) -> &Retriever {
        &self.retriever
    }
}

fn fill_prompt(context: &str, question: &str) -> String {
    PROMPT_TEMPLATE
        .replace("{context}", context)
        .replace("{input}", question)
}
