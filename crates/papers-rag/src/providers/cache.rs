//! Memoising embedding provider
//!
//! Keys are `model:sha256(text)`, so a cached vector is only reused for the
//! same model. At most `capacity` vectors are kept; inserting past that
//! evicts the oldest entry.

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::error::Result;
use crate::types::{content_hash, Embedding};

use super::embedding::EmbeddingProvider;

/// Cache hit statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

struct Slot {
    embedding: Embedding,
    /// Insertion order, smallest is oldest
    stamp: u64,
}

pub struct CachedEmbedder {
    inner: Arc<dyn EmbeddingProvider>,
    entries: DashMap<String, Slot>,
    capacity: usize,
    clock: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl CachedEmbedder {
    /// Wrap `inner`, keeping at most `capacity` vectors (at least one)
    pub fn new(inner: Arc<dyn EmbeddingProvider>, capacity: usize) -> Self {
        Self {
            inner,
            entries: DashMap::new(),
            capacity: capacity.max(1),
            clock: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.entries.len(),
        }
    }

    fn key(&self, text: &str) -> String {
        format!("{}:{}", self.inner.model(), content_hash(text))
    }

    fn lookup(&self, key: &str) -> Option<Embedding> {
        let hit = self.entries.get(key).map(|e| e.value().embedding.clone());
        match hit {
            Some(_) => self.hits.fetch_add(1, Ordering::Relaxed),
            None => self.misses.fetch_add(1, Ordering::Relaxed),
        };
        hit
    }

    fn store(&self, key: String, embedding: Embedding) {
        if !self.entries.contains_key(&key) {
            while self.entries.len() >= self.capacity {
                // Collect the key first so no shard guard is held during removal
                let oldest = self
                    .entries
                    .iter()
                    .min_by_key(|e| e.value().stamp)
                    .map(|e| e.key().clone());
                match oldest {
                    Some(oldest) => {
                        self.entries.remove(&oldest);
                        tracing::trace!("Evicted cached embedding {}", oldest);
                    }
                    None => break,
                }
            }
        }

        let stamp = self.clock.fetch_add(1, Ordering::Relaxed);
        self.entries.insert(key, Slot { embedding, stamp });
    }
}

#[async_trait]
impl EmbeddingProvider for CachedEmbedder {
    async fn embed(&self, text: &str) -> Result<Embedding> {
        let key = self.key(text);
        if let Some(hit) = self.lookup(&key) {
            return Ok(hit);
        }

        let embedding = self.inner.embed(text).await?;
        self.store(key, embedding.clone());
        Ok(embedding)
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Embedding>> {
        let keys: Vec<String> = texts.iter().map(|t| self.key(t)).collect();
        let mut results: Vec<Option<Embedding>> = keys.iter().map(|k| self.lookup(k)).collect();

        let missing: Vec<usize> = results
            .iter()
            .enumerate()
            .filter_map(|(i, r)| r.is_none().then_some(i))
            .collect();

        if !missing.is_empty() {
            let batch: Vec<String> = missing.iter().map(|&i| texts[i].clone()).collect();
            let fresh = self.inner.embed_batch(&batch).await?;
            for (&i, embedding) in missing.iter().zip(fresh) {
                self.store(keys[i].clone(), embedding.clone());
                results[i] = Some(embedding);
            }
        }

        Ok(results.into_iter().flatten().collect())
    }

    fn dimensions(&self) -> usize {
        self.inner.dimensions()
    }

    async fn health_check(&self) -> Result<bool> {
        self.inner.health_check().await
    }

    fn name(&self) -> &str {
        self.inner.name()
    }

    fn model(&self) -> &str {
        self.inner.model()
    }
}
