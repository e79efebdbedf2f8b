//! LLM answer generation

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::providers::LlmProvider;
use crate::retry::CallPolicy;
use crate::types::{Answer, Citation, ScoredChunk};

use super::prompt::PromptBuilder;

/// Turns a question and its retrieved context into an `Answer`
pub struct AnswerGenerator {
    llm: Arc<dyn LlmProvider>,
    policy: CallPolicy,
}

impl AnswerGenerator {
    pub fn new(llm: Arc<dyn LlmProvider>, policy: CallPolicy) -> Self {
        Self { llm, policy }
    }

    pub fn model(&self) -> &str {
        self.llm.model()
    }

    /// Generate an answer grounded in `context`
    ///
    /// Fails with `EmptyResponse` when the model returns only whitespace.
    pub async fn generate(&self, question: &str, context: &[ScoredChunk]) -> Result<Answer> {
        let mut ordered = context.to_vec();
        ordered.sort_by(|a, b| b.score.total_cmp(&a.score));

        let prompt = PromptBuilder::build(question, &ordered);
        tracing::debug!(
            "Prompt: {} context chunks, {} chars",
            ordered.len(),
            prompt.system.len() + prompt.user.len()
        );

        let raw = self
            .policy
            .run("complete", || self.llm.complete(&prompt))
            .await?;

        let text = raw.trim();
        if text.is_empty() {
            return Err(Error::EmptyResponse {
                model: self.llm.model().to_string(),
            });
        }

        let citations = ordered
            .iter()
            .map(|s| Citation::from_chunk(&s.chunk, s.score))
            .collect();
        let sources = ordered.iter().map(|s| (*s.chunk).clone()).collect();

        Ok(Answer {
            text: text.to_string(),
            sources,
            citations,
            model: self.llm.model().to_string(),
        })
    }
}
