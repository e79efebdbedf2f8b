//! Vector index abstraction
//!
//! An index is built once from all entries and is read-only afterwards, so
//! it can be shared behind an `Arc` by concurrent queries.

use std::cmp::Ordering;
use std::sync::Arc;

use crate::config::{IndexKind, IvfConfig};
use crate::error::{Error, Result};
use crate::types::{Embedding, IndexEntry, ScoredChunk};

use super::exact::ExactIndex;
use super::ivf::IvfIndex;

/// Nearest-neighbour search over chunk embeddings by cosine similarity
pub trait VectorIndex: Send + Sync {
    /// Return at most `k` chunks, highest similarity first
    ///
    /// Equal scores keep insertion order. Fails with `EmptyIndex` when the
    /// index has no entries and `DimensionMismatch` when the query has the
    /// wrong length.
    fn query(&self, embedding: &Embedding, k: usize) -> Result<Vec<ScoredChunk>>;

    /// Number of entries
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Embedding dimensions accepted by this index
    fn dimensions(&self) -> usize;

    /// Index implementation name
    fn name(&self) -> &str;
}

/// Build an index of the given kind from all entries
pub fn build_index(
    kind: IndexKind,
    dimensions: usize,
    entries: Vec<IndexEntry>,
    ivf: &IvfConfig,
) -> Result<Arc<dyn VectorIndex>> {
    let index: Arc<dyn VectorIndex> = match kind {
        IndexKind::Exact => Arc::new(ExactIndex::new(dimensions, entries)?),
        IndexKind::Ivf => Arc::new(IvfIndex::new(dimensions, entries, ivf)?),
    };

    tracing::info!(
        "Built {} index with {} entries ({} dimensions)",
        index.name(),
        index.len(),
        dimensions
    );

    Ok(index)
}

/// Reject entries whose embedding length differs from the index dimensions
pub(crate) fn check_entries(dimensions: usize, entries: &[IndexEntry]) -> Result<()> {
    match entries
        .iter()
        .find(|e| e.embedding.dimensions() != dimensions)
    {
        Some(bad) => Err(Error::DimensionMismatch {
            expected: dimensions,
            actual: bad.embedding.dimensions(),
        }),
        None => Ok(()),
    }
}

/// Shared query preconditions
pub(crate) fn check_query(index: &dyn VectorIndex, embedding: &Embedding) -> Result<()> {
    if index.is_empty() {
        return Err(Error::EmptyIndex);
    }
    if embedding.dimensions() != index.dimensions() {
        return Err(Error::DimensionMismatch {
            expected: index.dimensions(),
            actual: embedding.dimensions(),
        });
    }
    Ok(())
}

/// Keep the `k` best `(position, score)` pairs, descending by score then
/// ascending by position
pub(crate) fn top_k(mut scored: Vec<(usize, f32)>, k: usize) -> Vec<(usize, f32)> {
    let by_rank = |a: &(usize, f32), b: &(usize, f32)| -> Ordering {
        b.1.total_cmp(&a.1).then(a.0.cmp(&b.0))
    };

    if scored.len() > k {
        scored.select_nth_unstable_by(k, by_rank);
        scored.truncate(k);
    }
    scored.sort_by(by_rank);
    scored
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_top_k_orders_and_breaks_ties_by_position() {
        let scored = vec![(0, 0.5), (1, 0.9), (2, 0.5), (3, 0.1), (4, 0.9)];
        let best = top_k(scored, 3);
        assert_eq!(best, vec![(1, 0.9), (4, 0.9), (0, 0.5)]);
    }

    #[test]
    fn test_top_k_larger_than_input() {
        let best = top_k(vec![(0, 0.1), (1, 0.2)], 10);
        assert_eq!(best, vec![(1, 0.2), (0, 0.1)]);
    }

    #[test]
    fn test_top_k_zero() {
        assert!(top_k(vec![(0, 0.1)], 0).is_empty());
    }
}
