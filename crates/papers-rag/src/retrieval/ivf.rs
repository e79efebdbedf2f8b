//! Inverted-file approximate index
//!
//! Entries are partitioned into `nlist` clusters by spherical k-means over
//! unit-normalised embeddings. A query scores only the entries of the
//! `nprobe` clusters whose centroids are closest to it. Probing every list
//! gives the exact result.

use crate::config::IvfConfig;
use crate::error::Result;
use crate::types::{Embedding, IndexEntry, ScoredChunk};

use super::exact::ExactIndex;
use super::index::{check_query, top_k, VectorIndex};
use super::similarity::{dot, norm};

pub struct IvfIndex {
    base: ExactIndex,
    centroids: Vec<Vec<f32>>,
    lists: Vec<Vec<usize>>,
    nprobe: usize,
}

impl IvfIndex {
    pub fn new(dimensions: usize, entries: Vec<IndexEntry>, config: &IvfConfig) -> Result<Self> {
        let base = ExactIndex::new(dimensions, entries)?;
        let n = base.len();
        let nprobe = config.nprobe.max(1);

        if n == 0 {
            return Ok(Self {
                base,
                centroids: Vec::new(),
                lists: Vec::new(),
                nprobe,
            });
        }

        let nlist = config.nlist.clamp(1, n);
        let units: Vec<Vec<f32>> = (0..n)
            .map(|i| unit(base.embedding(i), base.norm_at(i)))
            .collect();

        // Evenly spaced seeds keep the build deterministic
        let mut centroids: Vec<Vec<f32>> = (0..nlist).map(|c| units[c * n / nlist].clone()).collect();
        let mut assignment = assign(&units, &centroids);

        for round in 0..config.iterations {
            centroids = recompute(&units, &assignment, &centroids);
            let next = assign(&units, &centroids);
            if next == assignment {
                tracing::debug!("IVF clustering converged after {} rounds", round + 1);
                break;
            }
            assignment = next;
        }

        let mut lists = vec![Vec::new(); nlist];
        for (position, &cluster) in assignment.iter().enumerate() {
            lists[cluster].push(position);
        }

        tracing::debug!(
            "IVF index: {} entries in {} lists, nprobe {}",
            n,
            nlist,
            nprobe
        );

        Ok(Self {
            base,
            centroids,
            lists,
            nprobe,
        })
    }

    pub fn nlist(&self) -> usize {
        self.lists.len()
    }

    pub fn nprobe(&self) -> usize {
        self.nprobe
    }

    /// Sizes of the inverted lists
    pub fn list_sizes(&self) -> Vec<usize> {
        self.lists.iter().map(Vec::len).collect()
    }
}

impl VectorIndex for IvfIndex {
    fn query(&self, embedding: &Embedding, k: usize) -> Result<Vec<ScoredChunk>> {
        check_query(self, embedding)?;
        if k == 0 {
            return Ok(Vec::new());
        }

        let query = embedding.as_slice();
        let query_unit = unit(query, norm(query));
        let centroid_scores = self
            .centroids
            .iter()
            .enumerate()
            .map(|(c, centroid)| (c, dot(&query_unit, centroid)))
            .collect();
        let probed = top_k(centroid_scores, self.nprobe.min(self.nlist()));

        let candidates = probed
            .iter()
            .flat_map(|&(c, _)| self.lists[c].iter().copied());
        let best = top_k(self.base.score_positions(query, candidates), k);

        Ok(self.base.to_scored(best))
    }

    fn len(&self) -> usize {
        self.base.len()
    }

    fn dimensions(&self) -> usize {
        self.base.dimensions()
    }

    fn name(&self) -> &str {
        "ivf"
    }
}

fn unit(v: &[f32], n: f32) -> Vec<f32> {
    if n == 0.0 {
        return v.to_vec();
    }
    v.iter().map(|x| x / n).collect()
}

/// Nearest centroid per vector; ties go to the lower cluster
fn assign(units: &[Vec<f32>], centroids: &[Vec<f32>]) -> Vec<usize> {
    units
        .iter()
        .map(|u| {
            let mut best = 0;
            let mut best_score = f32::NEG_INFINITY;
            for (c, centroid) in centroids.iter().enumerate() {
                let score = dot(u, centroid);
                if score > best_score {
                    best = c;
                    best_score = score;
                }
            }
            best
        })
        .collect()
}

/// Normalised mean of each cluster; empty clusters keep their centroid
fn recompute(units: &[Vec<f32>], assignment: &[usize], previous: &[Vec<f32>]) -> Vec<Vec<f32>> {
    let dims = previous.first().map_or(0, Vec::len);
    let mut sums = vec![vec![0.0f32; dims]; previous.len()];
    let mut counts = vec![0usize; previous.len()];

    for (u, &c) in units.iter().zip(assignment) {
        counts[c] += 1;
        for (s, x) in sums[c].iter_mut().zip(u) {
            *s += x;
        }
    }

    sums.into_iter()
        .zip(counts)
        .zip(previous)
        .map(|((sum, count), prev)| {
            let n = norm(&sum);
            if count == 0 || n == 0.0 {
                prev.clone()
            } else {
                unit(&sum, n)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::retrieval::exact::tests::entries;
    use proptest::prelude::*;

    fn config(nlist: usize, nprobe: usize) -> IvfConfig {
        IvfConfig {
            nlist,
            nprobe,
            iterations: 8,
        }
    }

    fn two_clusters() -> Vec<Vec<f32>> {
        vec![
            vec![1.0, 0.05, 0.0],
            vec![0.0, 0.1, 1.0],
            vec![0.95, 0.0, 0.1],
            vec![0.1, 0.0, 0.9],
            vec![0.9, 0.1, 0.0],
            vec![0.05, 0.05, 1.0],
        ]
    }

    #[test]
    fn test_single_probe_stays_in_cluster() {
        let index = IvfIndex::new(3, entries(&two_clusters()), &config(2, 1)).unwrap();
        assert_eq!(index.nlist(), 2);
        assert_eq!(index.list_sizes().iter().sum::<usize>(), 6);

        let results = index.query(&Embedding::new(vec![1.0, 0.0, 0.0]), 6).unwrap();
        let positions: Vec<u32> = results.iter().map(|r| r.chunk.chunk_index).collect();
        assert_eq!(results.len(), 3);
        assert!(positions.iter().all(|p| [0, 2, 4].contains(p)));
    }

    #[test]
    fn test_nlist_clamped_to_entries() {
        let index = IvfIndex::new(3, entries(&two_clusters()[..2]), &config(16, 4)).unwrap();
        assert_eq!(index.nlist(), 2);
    }

    #[test]
    fn test_empty_and_mismatch() {
        let empty = IvfIndex::new(3, Vec::new(), &config(4, 2)).unwrap();
        assert!(matches!(
            empty.query(&Embedding::new(vec![1.0, 0.0, 0.0]), 2),
            Err(Error::EmptyIndex)
        ));

        let index = IvfIndex::new(3, entries(&two_clusters()), &config(2, 1)).unwrap();
        assert!(matches!(
            index.query(&Embedding::new(vec![1.0, 0.0]), 2),
            Err(Error::DimensionMismatch { .. })
        ));
        assert!(index.query(&Embedding::new(vec![1.0, 0.0, 0.0]), 0).unwrap().is_empty());
    }

    proptest! {
        #[test]
        fn prop_full_probe_matches_exact(
            vectors in prop::collection::vec(prop::collection::vec(-1.0f32..1.0, 3), 1..30),
            query in prop::collection::vec(-1.0f32..1.0, 3),
            nlist in 1usize..8,
            k in 1usize..10,
        ) {
            let exact = ExactIndex::new(3, entries(&vectors)).unwrap();
            let ivf = IvfIndex::new(3, entries(&vectors), &config(nlist, nlist)).unwrap();
            let q = Embedding::new(query);

            let a: Vec<(u32, f32)> = exact.query(&q, k).unwrap().iter().map(|r| (r.chunk.chunk_index, r.score)).collect();
            let b: Vec<(u32, f32)> = ivf.query(&q, k).unwrap().iter().map(|r| (r.chunk.chunk_index, r.score)).collect();
            prop_assert_eq!(a, b);
        }
    }
}
