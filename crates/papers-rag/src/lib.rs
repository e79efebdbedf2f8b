//! papers-rag: retrieval-augmented question answering over a text corpus
//!
//! The corpus is loaded once, split into overlapping chunks, embedded and
//! indexed. Each question is embedded with the same provider, the closest
//! chunks are retrieved and a language model answers from them, returning
//! the chunks it was given as sources.

pub mod config;
pub mod error;
pub mod generation;
pub mod ingestion;
pub mod pipeline;
pub mod providers;
pub mod retrieval;
pub mod retry;
pub mod types;

pub use config::RagConfig;
pub use error::{Error, Result};
pub use pipeline::{IndexStats, PipelineState, RagContext, RagPipeline};
pub use types::{Answer, Chunk, Citation, Document, Embedding, ScoredChunk};
