//! Corpus loading and chunking

mod chunker;
mod loader;

pub use chunker::{ChunkUnit, TextChunker};
pub use loader::{loader_for, DocumentLoader, FileLoader, HttpLoader};
