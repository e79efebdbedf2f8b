//! Prompt templates for answer generation

use std::fmt::Write;

use crate::types::ScoredChunk;

/// System and user messages sent to the language model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

const SYSTEM_PROMPT: &str = "You are an assistant answering questions about research papers. \
Use only the numbered context passages provided with the question. \
If the passages do not contain the answer, say that you don't know instead of making one up. \
Refer to passages by their number, for example [2], when you use them.";

/// Prompt builder for retrieval-augmented questions
pub struct PromptBuilder;

impl PromptBuilder {
    /// Build context from scored chunks, highest similarity first
    pub fn build_context(chunks: &[ScoredChunk]) -> String {
        let mut ordered: Vec<&ScoredChunk> = chunks.iter().collect();
        ordered.sort_by(|a, b| b.score.total_cmp(&a.score));

        let mut context = String::new();
        for (i, scored) in ordered.iter().enumerate() {
            let _ = write!(
                context,
                "[{}] {}\n\n{}\n\n---\n\n",
                i + 1,
                scored.chunk.format_citation(),
                scored.chunk.content
            );
        }
        context
    }

    /// Build the full prompt for a question
    pub fn build(question: &str, chunks: &[ScoredChunk]) -> Prompt {
        let user = format!(
            "CONTEXT:\n{context}QUESTION: {question}\n\nAnswer:",
            context = Self::build_context(chunks),
            question = question
        );

        Prompt {
            system: SYSTEM_PROMPT.to_string(),
            user,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Chunk, Document};
    use std::sync::Arc;

    fn scored(doc: &Document, content: &str, start: usize, score: f32) -> ScoredChunk {
        let chunk = Chunk::new(doc, content.to_string(), start, start + content.len(), 0);
        ScoredChunk {
            chunk: Arc::new(chunk),
            score,
        }
    }

    #[test]
    fn test_context_numbered_by_score() {
        let doc = Document::new("papers.txt", "");
        let chunks = vec![
            scored(&doc, "second passage", 100, 0.4),
            scored(&doc, "first passage", 0, 0.9),
        ];

        let context = PromptBuilder::build_context(&chunks);
        let first = context.find("[1] papers.txt, chars 0-13").unwrap();
        let second = context.find("[2] papers.txt, chars 100-114").unwrap();
        assert!(first < second);
        assert!(context.contains("first passage"));
    }

    #[test]
    fn test_prompt_ends_with_question() {
        let doc = Document::new("papers.txt", "");
        let prompt = PromptBuilder::build(
            "How long is the context window?",
            &[scored(&doc, "4096 tokens", 0, 0.8)],
        );

        assert!(prompt.system.contains("don't know"));
        assert!(prompt.user.starts_with("CONTEXT:\n[1]"));
        assert!(prompt
            .user
            .ends_with("QUESTION: How long is the context window?\n\nAnswer:"));
    }

    #[test]
    fn test_no_context() {
        let prompt = PromptBuilder::build("q?", &[]);
        assert_eq!(prompt.user, "CONTEXT:\nQUESTION: q?\n\nAnswer:");
    }
}
