//! Core types for the RAG pipeline

pub mod document;
pub mod query;
pub mod response;

pub use document::{content_hash, Chunk, Document, Embedding, IndexEntry};
pub use query::{normalize_question, Query};
pub use response::{Answer, Citation, ScoredChunk};
