//! Fixed-size window chunking with overlap and position tracking

use serde::{Deserialize, Serialize};
use unicode_segmentation::UnicodeSegmentation;

use crate::config::ChunkingConfig;
use crate::error::{Error, Result};
use crate::types::{Chunk, Document};

/// What one unit of `chunk_size` counts
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChunkUnit {
    /// Unicode scalar values
    #[default]
    Char,
    /// Extended grapheme clusters
    Grapheme,
}

/// Text chunker with configurable size and overlap
#[derive(Debug, Clone)]
pub struct TextChunker {
    /// Window size in units
    chunk_size: usize,
    /// Units shared by consecutive windows
    overlap: usize,
    unit: ChunkUnit,
}

impl TextChunker {
    /// Create a new chunker; `overlap` must be smaller than `chunk_size`
    pub fn new(chunk_size: usize, overlap: usize, unit: ChunkUnit) -> Result<Self> {
        if chunk_size == 0 {
            return Err(Error::config("chunk size must be positive"));
        }
        if overlap >= chunk_size {
            return Err(Error::config(format!(
                "chunk overlap ({}) must be smaller than chunk size ({})",
                overlap, chunk_size
            )));
        }
        Ok(Self {
            chunk_size,
            overlap,
            unit,
        })
    }

    pub fn from_config(config: &ChunkingConfig) -> Result<Self> {
        Self::new(config.chunk_size, config.chunk_overlap, config.unit)
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Distance between the starts of consecutive windows
    pub fn step(&self) -> usize {
        self.chunk_size - self.overlap
    }

    /// Split a document into overlapping windows
    pub fn split(&self, doc: &Document) -> Vec<Chunk> {
        let bounds = self.unit_bounds(&doc.text);
        let units = bounds.len() - 1;
        let mut chunks = Vec::with_capacity(self.expected_count(units));

        if units == 0 {
            return chunks;
        }

        let mut start = 0usize;
        let mut chunk_index = 0u32;

        loop {
            let end = (start + self.chunk_size).min(units);
            let content = doc.text[bounds[start]..bounds[end]].to_string();
            chunks.push(Chunk::new(doc, content, start, end, chunk_index));

            if end == units {
                break;
            }
            start += self.step();
            chunk_index += 1;
        }

        chunks
    }

    /// Split every document; chunk indices restart per document
    pub fn split_all(&self, docs: &[Document]) -> Vec<Chunk> {
        docs.iter().flat_map(|doc| self.split(doc)).collect()
    }

    /// Number of windows `split` produces for a text of `units` units
    pub fn expected_count(&self, units: usize) -> usize {
        match units {
            0 => 0,
            n if n <= self.chunk_size => 1,
            n => (n - self.overlap).div_ceil(self.step()),
        }
    }

    /// Byte offset of every unit start, followed by the text length
    fn unit_bounds(&self, text: &str) -> Vec<usize> {
        let mut bounds: Vec<usize> = match self.unit {
            ChunkUnit::Char => text.char_indices().map(|(i, _)| i).collect(),
            ChunkUnit::Grapheme => text.grapheme_indices(true).map(|(i, _)| i).collect(),
        };
        bounds.push(text.len());
        bounds
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const FOX: &str = "The quick brown fox jumps over the lazy dog.";

    fn chars(s: &str) -> Vec<char> {
        s.chars().collect()
    }

    #[test]
    fn test_fox_scenario() {
        let chunker = TextChunker::new(20, 5, ChunkUnit::Char).unwrap();
        let doc = Document::new("fox.txt", FOX);
        let chunks = chunker.split(&doc);

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].content, "The quick brown fox ");
        assert_eq!(chunks[1].char_start, 15);
        assert_eq!(chunks[2].char_end, FOX.len());
        assert!(chunks[2].content.ends_with("the lazy dog."));

        for pair in chunks.windows(2) {
            let left = chars(&pair[0].content);
            let right = chars(&pair[1].content);
            assert_eq!(left[left.len() - 5..], right[..5]);
        }
    }

    #[test]
    fn test_short_text_yields_one_chunk() {
        let chunker = TextChunker::new(100, 10, ChunkUnit::Char).unwrap();
        let doc = Document::new("short.txt", "Llama");
        let chunks = chunker.split(&doc);

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content, "Llama");
        assert_eq!(chunks[0].document_id, doc.id);
    }

    #[test]
    fn test_empty_text_yields_nothing() {
        let chunker = TextChunker::new(10, 2, ChunkUnit::Char).unwrap();
        assert!(chunker.split(&Document::new("empty.txt", "")).is_empty());
    }

    #[test]
    fn test_overlap_not_smaller_than_size() {
        assert!(matches!(
            TextChunker::new(10, 10, ChunkUnit::Char),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            TextChunker::new(10, 11, ChunkUnit::Char),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            TextChunker::new(0, 0, ChunkUnit::Char),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_multibyte_windows() {
        let chunker = TextChunker::new(3, 1, ChunkUnit::Char).unwrap();
        let doc = Document::new("jp.txt", "ラマの論文です");
        let chunks = chunker.split(&doc);

        let contents: Vec<&str> = chunks.iter().map(|c| c.content.as_str()).collect();
        assert_eq!(contents, vec!["ラマの", "の論文", "文です"]);
    }

    #[test]
    fn test_grapheme_units_keep_clusters() {
        // "e" + combining acute accent is one grapheme, two chars
        let text = "cafe\u{301} cafe\u{301}";
        let chunker = TextChunker::new(4, 0, ChunkUnit::Grapheme).unwrap();
        let chunks = chunker.split(&Document::new("cafe.txt", text));

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].content, "cafe\u{301}");
        assert_eq!(chunks[0].char_end, 4);
    }

    #[test]
    fn test_split_all_restarts_indices() {
        let chunker = TextChunker::new(5, 1, ChunkUnit::Char).unwrap();
        let docs = vec![
            Document::new("a.txt", "aaaaaaaaaa"),
            Document::new("b.txt", "bbbbbbbbbb"),
        ];
        let chunks = chunker.split_all(&docs);

        assert_eq!(chunks.len(), 6);
        assert_eq!(chunks[3].chunk_index, 0);
        assert_eq!(chunks[3].document_id, docs[1].id);
    }

    proptest! {
        #[test]
        fn prop_chunk_count_and_overlap(
            text in "\\PC{0,300}",
            size in 1usize..40,
            overlap_seed in 0usize..40,
        ) {
            let overlap = overlap_seed % size;
            let chunker = TextChunker::new(size, overlap, ChunkUnit::Char).unwrap();
            let doc = Document::new("prop.txt", text.clone());
            let chunks = chunker.split(&doc);
            let len = text.chars().count();

            prop_assert_eq!(chunks.len(), chunker.expected_count(len));
            if len > overlap && len > size {
                prop_assert_eq!(chunks.len(), (len - overlap).div_ceil(size - overlap));
            }

            for pair in chunks.windows(2) {
                let left = chars(&pair[0].content);
                let right = chars(&pair[1].content);
                prop_assert_eq!(left.len(), size);
                prop_assert_eq!(pair[1].char_start, pair[0].char_end - overlap);
                prop_assert_eq!(&left[size - overlap..], &right[..overlap]);
            }

            if let Some(last) = chunks.last() {
                prop_assert_eq!(last.char_end, len);
                prop_assert!(last.len() <= size);
            }
        }
    }
}
