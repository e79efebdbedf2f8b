//! Document, chunk and embedding types with source tracking for citations

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// A loaded corpus document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Unique document ID
    pub id: Uuid,
    /// Where the text came from (file path or URL)
    pub source: String,
    /// Full text
    pub text: String,
    /// SHA-256 of the text, hex encoded
    pub content_hash: String,
    /// Load timestamp
    pub loaded_at: chrono::DateTime<chrono::Utc>,
}

impl Document {
    /// Create a new document
    pub fn new(source: impl Into<String>, text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            id: Uuid::new_v4(),
            source: source.into(),
            content_hash: content_hash(&text),
            text,
            loaded_at: chrono::Utc::now(),
        }
    }

    /// Whether the document holds no text
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Hex SHA-256 of a text
pub fn content_hash(text: &str) -> String {
    hex::encode(Sha256::digest(text.as_bytes()))
}

/// A window of text from a document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Unique chunk ID
    pub id: Uuid,
    /// Owning document
    pub document_id: Uuid,
    /// Document source, kept for citations
    pub source: String,
    /// Text content
    pub content: String,
    /// Window position in the document, in chunker units, end exclusive
    pub char_start: usize,
    pub char_end: usize,
    /// Chunk index within document
    pub chunk_index: u32,
}

impl Chunk {
    /// Create a new chunk belonging to `doc`
    pub fn new(
        doc: &Document,
        content: String,
        char_start: usize,
        char_end: usize,
        chunk_index: u32,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            document_id: doc.id,
            source: doc.source.clone(),
            content,
            char_start,
            char_end,
            chunk_index,
        }
    }

    /// Window length in chunker units
    pub fn len(&self) -> usize {
        self.char_end - self.char_start
    }

    pub fn is_empty(&self) -> bool {
        self.char_end == self.char_start
    }

    /// Human readable reference, e.g. `papers.txt, chars 0-1000`
    pub fn format_citation(&self) -> String {
        format!(
            "{}, chars {}-{}",
            self.source, self.char_start, self.char_end
        )
    }

    /// Metadata stored next to the vector in the index
    pub fn to_vector_metadata(&self) -> HashMap<String, serde_json::Value> {
        let mut meta = HashMap::new();
        meta.insert("chunk_id".to_string(), serde_json::json!(self.id.to_string()));
        meta.insert("document_id".to_string(), serde_json::json!(self.document_id.to_string()));
        meta.insert("source".to_string(), serde_json::json!(self.source));
        meta.insert("chunk_index".to_string(), serde_json::json!(self.chunk_index));
        meta.insert("char_start".to_string(), serde_json::json!(self.char_start));
        meta.insert("char_end".to_string(), serde_json::json!(self.char_end));
        meta
    }
}

/// Fixed-length vector representation of a text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Embedding(Vec<f32>);

impl Embedding {
    pub fn new(values: Vec<f32>) -> Self {
        Self(values)
    }

    pub fn dimensions(&self) -> usize {
        self.0.len()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn into_inner(self) -> Vec<f32> {
        self.0
    }
}

impl From<Vec<f32>> for Embedding {
    fn from(values: Vec<f32>) -> Self {
        Self(values)
    }
}

/// A vector with the chunk it represents, owned by the index
#[derive(Debug, Clone)]
pub struct IndexEntry {
    pub embedding: Embedding,
    pub chunk: Arc<Chunk>,
    pub metadata: HashMap<String, serde_json::Value>,
}

impl IndexEntry {
    /// Pair a chunk with its embedding, deriving metadata from the chunk
    pub fn new(chunk: Chunk, embedding: Embedding) -> Self {
        let metadata = chunk.to_vector_metadata();
        Self {
            embedding,
            chunk: Arc::new(chunk),
            metadata,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_hash() {
        let a = Document::new("a.txt", "llama");
        let b = Document::new("b.txt", "llama");
        assert_eq!(a.content_hash, b.content_hash);
        assert_ne!(a.id, b.id);
        assert_eq!(a.content_hash.len(), 64);
    }

    #[test]
    fn test_chunk_back_reference() {
        let doc = Document::new("papers.txt", "The quick brown fox");
        let chunk = Chunk::new(&doc, "quick".to_string(), 4, 9, 0);
        assert_eq!(chunk.document_id, doc.id);
        assert_eq!(chunk.len(), 5);
        assert_eq!(chunk.format_citation(), "papers.txt, chars 4-9");
    }

    #[test]
    fn test_index_entry_metadata() {
        let doc = Document::new("papers.txt", "text");
        let chunk = Chunk::new(&doc, "text".to_string(), 0, 4, 3);
        let entry = IndexEntry::new(chunk.clone(), Embedding::new(vec![1.0, 0.0]));
        assert_eq!(entry.metadata["chunk_index"], serde_json::json!(3));
        assert_eq!(entry.metadata["source"], serde_json::json!("papers.txt"));
        assert_eq!(*entry.chunk, chunk);
    }
}
