//! Answer and citation types

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use super::document::Chunk;

/// A chunk returned by an index query with its cosine similarity
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub chunk: Arc<Chunk>,
    /// Cosine similarity (-1.0 to 1.0, higher is more similar)
    pub score: f32,
}

/// Citation of a source chunk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    /// Chunk ID
    pub chunk_id: Uuid,
    /// Document ID
    pub document_id: Uuid,
    /// Source file or URL
    pub source: String,
    /// Window position in the document
    pub char_start: usize,
    pub char_end: usize,
    /// Exact snippet from the source
    pub snippet: String,
    /// Similarity score
    pub similarity_score: f32,
}

impl Citation {
    /// Create a citation from a chunk and similarity score
    pub fn from_chunk(chunk: &Chunk, similarity_score: f32) -> Self {
        Self {
            chunk_id: chunk.id,
            document_id: chunk.document_id,
            source: chunk.source.clone(),
            char_start: chunk.char_start,
            char_end: chunk.char_end,
            snippet: chunk.content.clone(),
            similarity_score,
        }
    }

    /// Format citation for display in text
    pub fn format_inline(&self) -> String {
        format!(
            "[Source: {}, chars {}-{}]",
            self.source, self.char_start, self.char_end
        )
    }
}

/// Generated answer with the context it was conditioned on
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    /// Generated text
    pub text: String,
    /// Context chunks, highest similarity first
    pub sources: Vec<Chunk>,
    /// One citation per source, same order
    pub citations: Vec<Citation>,
    /// Model that produced the text
    pub model: String,
}

impl Answer {
    /// Render the answer followed by a numbered source list
    pub fn format_with_sources(&self) -> String {
        let mut out = self.text.clone();
        if !self.citations.is_empty() {
            out.push_str("\n\nSources:");
            for (i, citation) in self.citations.iter().enumerate() {
                out.push_str(&format!(
                    "\n  [{}] {} (score {:.3})",
                    i + 1,
                    citation.format_inline(),
                    citation.similarity_score
                ));
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Document;

    #[test]
    fn test_citation_from_chunk() {
        let doc = Document::new("papers.txt", "Llama 2 is a collection of models.");
        let chunk = Chunk::new(&doc, "Llama 2".to_string(), 0, 7, 0);
        let citation = Citation::from_chunk(&chunk, 0.87);

        assert_eq!(citation.chunk_id, chunk.id);
        assert_eq!(citation.document_id, doc.id);
        assert_eq!(citation.format_inline(), "[Source: papers.txt, chars 0-7]");
    }

    #[test]
    fn test_format_with_sources() {
        let doc = Document::new("papers.txt", "abc");
        let chunk = Chunk::new(&doc, "abc".to_string(), 0, 3, 0);
        let answer = Answer {
            text: "It is abc.".to_string(),
            citations: vec![Citation::from_chunk(&chunk, 0.5)],
            sources: vec![chunk],
            model: "gpt-4o-mini".to_string(),
        };

        let rendered = answer.format_with_sources();
        assert!(rendered.starts_with("It is abc."));
        assert!(rendered.contains("[1] [Source: papers.txt, chars 0-3] (score 0.500)"));
    }
}
