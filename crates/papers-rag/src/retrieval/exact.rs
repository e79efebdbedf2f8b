//! Exact linear-scan index

use crate::error::Result;
use crate::types::{Embedding, IndexEntry, ScoredChunk};

use super::index::{check_entries, check_query, top_k, VectorIndex};
use super::similarity::{cosine_with_norm, norm};

/// Brute-force cosine search with pre-computed norms
pub struct ExactIndex {
    dimensions: usize,
    entries: Vec<IndexEntry>,
    norms: Vec<f32>,
}

impl ExactIndex {
    pub fn new(dimensions: usize, entries: Vec<IndexEntry>) -> Result<Self> {
        check_entries(dimensions, &entries)?;
        let norms = entries
            .iter()
            .map(|e| norm(e.embedding.as_slice()))
            .collect();

        Ok(Self {
            dimensions,
            entries,
            norms,
        })
    }

    /// Score every entry against the query
    pub(crate) fn score_all(&self, query: &[f32]) -> Vec<(usize, f32)> {
        self.score_positions(query, 0..self.entries.len())
    }

    /// Score the entries at `positions` against the query
    pub(crate) fn score_positions(
        &self,
        query: &[f32],
        positions: impl IntoIterator<Item = usize>,
    ) -> Vec<(usize, f32)> {
        let query_norm = norm(query);
        positions
            .into_iter()
            .map(|i| {
                let score = cosine_with_norm(
                    query,
                    query_norm,
                    self.entries[i].embedding.as_slice(),
                    self.norms[i],
                );
                (i, score)
            })
            .collect()
    }

    pub(crate) fn embedding(&self, position: usize) -> &[f32] {
        self.entries[position].embedding.as_slice()
    }

    pub(crate) fn norm_at(&self, position: usize) -> f32 {
        self.norms[position]
    }

    pub(crate) fn to_scored(&self, best: Vec<(usize, f32)>) -> Vec<ScoredChunk> {
        best.into_iter()
            .map(|(i, score)| ScoredChunk {
                chunk: self.entries[i].chunk.clone(),
                score,
            })
            .collect()
    }
}

impl VectorIndex for ExactIndex {
    fn query(&self, embedding: &Embedding, k: usize) -> Result<Vec<ScoredChunk>> {
        check_query(self, embedding)?;
        if k == 0 {
            return Ok(Vec::new());
        }

        let best = top_k(self.score_all(embedding.as_slice()), k);
        Ok(self.to_scored(best))
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn name(&self) -> &str {
        "exact"
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::Error;
    use crate::types::{Chunk, Document};
    use proptest::prelude::*;

    /// One entry per vector, chunk content "c{i}"
    pub(crate) fn entries(vectors: &[Vec<f32>]) -> Vec<IndexEntry> {
        let doc = Document::new("papers.txt", "");
        vectors
            .iter()
            .enumerate()
            .map(|(i, v)| {
                let chunk = Chunk::new(&doc, format!("c{}", i), i, i + 1, i as u32);
                IndexEntry::new(chunk, Embedding::new(v.clone()))
            })
            .collect()
    }

    fn contents(results: &[ScoredChunk]) -> Vec<String> {
        results.iter().map(|r| r.chunk.content.clone()).collect()
    }

    #[test]
    fn test_nearest_first() {
        let index = ExactIndex::new(
            2,
            entries(&[vec![0.0, 1.0], vec![1.0, 0.0], vec![1.0, 1.0]]),
        )
        .unwrap();

        let results = index.query(&Embedding::new(vec![1.0, 0.1]), 2).unwrap();
        assert_eq!(contents(&results), vec!["c1", "c2"]);
        assert!(results[0].score >= results[1].score);
    }

    #[test]
    fn test_ties_keep_insertion_order() {
        let index = ExactIndex::new(2, entries(&[vec![1.0, 0.0], vec![2.0, 0.0], vec![3.0, 0.0]])).unwrap();
        let results = index.query(&Embedding::new(vec![1.0, 0.0]), 3).unwrap();
        assert_eq!(contents(&results), vec!["c0", "c1", "c2"]);
    }

    #[test]
    fn test_fewer_entries_than_k() {
        let index = ExactIndex::new(2, entries(&[vec![1.0, 0.0]])).unwrap();
        let results = index.query(&Embedding::new(vec![1.0, 0.0]), 4).unwrap();
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn test_k_zero_is_empty() {
        let index = ExactIndex::new(2, entries(&[vec![1.0, 0.0]])).unwrap();
        assert!(index.query(&Embedding::new(vec![1.0, 0.0]), 0).unwrap().is_empty());
    }

    #[test]
    fn test_empty_index() {
        let index = ExactIndex::new(2, Vec::new()).unwrap();
        assert!(index.is_empty());
        let err = index.query(&Embedding::new(vec![1.0, 0.0]), 4).unwrap_err();
        assert!(matches!(err, Error::EmptyIndex));
    }

    #[test]
    fn test_dimension_mismatch() {
        let index = ExactIndex::new(2, entries(&[vec![1.0, 0.0]])).unwrap();
        let err = index.query(&Embedding::new(vec![1.0, 0.0, 0.0]), 1).unwrap_err();
        assert!(matches!(
            err,
            Error::DimensionMismatch {
                expected: 2,
                actual: 3
            }
        ));

        assert!(ExactIndex::new(3, entries(&[vec![1.0, 0.0]])).is_err());
    }

    #[test]
    fn test_zero_norm_entry_scores_zero() {
        let index = ExactIndex::new(2, entries(&[vec![0.0, 0.0], vec![-1.0, 0.0]])).unwrap();
        let results = index.query(&Embedding::new(vec![1.0, 0.0]), 2).unwrap();
        assert_eq!(contents(&results), vec!["c0", "c1"]);
        assert_eq!(results[0].score, 0.0);
    }

    proptest! {
        #[test]
        fn prop_query_returns_best_k(
            vectors in prop::collection::vec(prop::collection::vec(-1.0f32..1.0, 4), 1..40),
            query in prop::collection::vec(-1.0f32..1.0, 4),
            k in 0usize..12,
        ) {
            let index = ExactIndex::new(4, entries(&vectors)).unwrap();
            let results = index.query(&Embedding::new(query.clone()), k).unwrap();

            prop_assert_eq!(results.len(), k.min(vectors.len()));
            for pair in results.windows(2) {
                prop_assert!(pair[0].score >= pair[1].score);
                if pair[0].score == pair[1].score {
                    prop_assert!(pair[0].chunk.chunk_index < pair[1].chunk.chunk_index);
                }
            }

            let returned: Vec<u32> = results.iter().map(|r| r.chunk.chunk_index).collect();
            if let Some(worst) = results.last() {
                for (i, score) in index.score_all(&query) {
                    if !returned.contains(&(i as u32)) {
                        prop_assert!(score <= worst.score);
                    }
                }
            }
        }
    }
}
