//! Question embedding and similarity search

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::providers::EmbeddingProvider;
use crate::retry::CallPolicy;
use crate::types::{Chunk, Query, ScoredChunk};

use super::index::VectorIndex;

/// Embeds questions and looks up the closest chunks
pub struct Retriever {
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn VectorIndex>,
    policy: CallPolicy,
    min_score: Option<f32>,
}

impl Retriever {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn VectorIndex>,
        policy: CallPolicy,
    ) -> Self {
        Self {
            embedder,
            index,
            policy,
            min_score: None,
        }
    }

    /// Drop results scoring below `min_score`
    pub fn with_min_score(mut self, min_score: Option<f32>) -> Self {
        self.min_score = min_score;
        self
    }

    pub fn index(&self) -> &Arc<dyn VectorIndex> {
        &self.index
    }

    /// Embed a question with the same provider used for the corpus
    pub async fn embed_question(&self, question: &str) -> Result<Query> {
        let embedding = self
            .policy
            .run("embed question", || self.embedder.embed(question))
            .await?;
        Ok(Query::new(question, embedding))
    }

    /// Top-`k` chunks with their similarity scores, best first
    pub async fn retrieve_scored(&self, question: &str, k: usize) -> Result<Vec<ScoredChunk>> {
        if self.index.is_empty() {
            return Err(Error::EmptyIndex);
        }

        let query = self.embed_question(question).await?;
        let mut results = self.index.query(&query.embedding, k)?;

        if let Some(min_score) = self.min_score {
            results.retain(|r| r.score >= min_score);
        }

        tracing::debug!(
            "Retrieved {} chunks (k={}, best score {:?})",
            results.len(),
            k,
            results.first().map(|r| r.score)
        );

        Ok(results)
    }

    /// Top-`k` chunks, best first
    pub async fn retrieve(&self, question: &str, k: usize) -> Result<Vec<Chunk>> {
        let scored = self.retrieve_scored(question, k).await?;
        Ok(scored.into_iter().map(|r| (*r.chunk).clone()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::HashingEmbedder;
    use crate::retrieval::ExactIndex;
    use crate::types::{Document, Embedding, IndexEntry};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    const DIMS: usize = 128;

    async fn corpus_index(embedder: &HashingEmbedder, texts: &[&str]) -> Arc<dyn VectorIndex> {
        let doc = Document::new("papers.txt", texts.concat());
        let mut entries = Vec::new();
        for (i, text) in texts.iter().enumerate() {
            let chunk = Chunk::new(&doc, text.to_string(), i, i + 1, i as u32);
            entries.push(IndexEntry::new(chunk, embedder.embed(text).await.unwrap()));
        }
        Arc::new(ExactIndex::new(DIMS, entries).unwrap())
    }

    fn policy() -> CallPolicy {
        CallPolicy::new(
            Duration::from_secs(1),
            2,
            Duration::from_millis(1),
            Duration::from_millis(2),
        )
    }

    #[tokio::test]
    async fn test_retrieves_relevant_chunk_first() {
        let embedder = HashingEmbedder::new(DIMS).unwrap();
        let index = corpus_index(
            &embedder,
            &[
                "reward modeling for helpfulness and safety",
                "the context length of llama 2 is 4096 tokens",
                "grouped query attention improves inference scalability",
            ],
        )
        .await;

        let retriever = Retriever::new(Arc::new(embedder), index, policy());
        let chunks = retriever
            .retrieve("what is the context length of llama 2", 2)
            .await
            .unwrap();

        assert_eq!(chunks.len(), 2);
        assert!(chunks[0].content.contains("context length"));
    }

    #[tokio::test]
    async fn test_min_score_filters() {
        let embedder = HashingEmbedder::new(DIMS).unwrap();
        let index = corpus_index(&embedder, &["alpha beta", "gamma delta"]).await;

        let retriever =
            Retriever::new(Arc::new(embedder), index, policy()).with_min_score(Some(0.6));
        let scored = retriever.retrieve_scored("alpha beta", 2).await.unwrap();

        assert_eq!(scored.len(), 1);
        assert!(scored[0].score > 0.99);
    }

    #[tokio::test]
    async fn test_empty_index_skips_embedding() {
        let calls = Arc::new(AtomicU32::new(0));
        let embedder = Arc::new(FlakyEmbedder {
            failures: 0,
            calls: calls.clone(),
        });
        let index: Arc<dyn VectorIndex> = Arc::new(ExactIndex::new(2, Vec::new()).unwrap());

        let retriever = Retriever::new(embedder, index, policy());
        let err = retriever.retrieve("anything", 4).await.unwrap_err();

        assert!(matches!(err, Error::EmptyIndex));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    /// Fails with a transient error `failures` times, then succeeds
    struct FlakyEmbedder {
        failures: u32,
        calls: Arc<AtomicU32>,
    }

    #[async_trait]
    impl EmbeddingProvider for FlakyEmbedder {
        async fn embed(&self, _text: &str) -> Result<Embedding> {
            if self.calls.fetch_add(1, Ordering::SeqCst) < self.failures {
                return Err(Error::retryable("flaky", "503 Service Unavailable"));
            }
            Ok(Embedding::new(vec![1.0, 0.0]))
        }

        fn dimensions(&self) -> usize {
            2
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(true)
        }

        fn name(&self) -> &str {
            "flaky"
        }

        fn model(&self) -> &str {
            "flaky-v1"
        }
    }

    fn one_entry_index() -> Arc<dyn VectorIndex> {
        let doc = Document::new("papers.txt", "x");
        let chunk = Chunk::new(&doc, "x".to_string(), 0, 1, 0);
        Arc::new(ExactIndex::new(2, vec![IndexEntry::new(chunk, Embedding::new(vec![1.0, 0.0]))]).unwrap())
    }

    #[tokio::test]
    async fn test_transient_failure_is_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let embedder = Arc::new(FlakyEmbedder {
            failures: 1,
            calls: calls.clone(),
        });

        let retriever = Retriever::new(embedder, one_entry_index(), policy());
        let chunks = retriever.retrieve("x", 4).await.unwrap();

        assert_eq!(chunks.len(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_persistent_failure_becomes_provider_error() {
        let calls = Arc::new(AtomicU32::new(0));
        let embedder = Arc::new(FlakyEmbedder {
            failures: u32::MAX,
            calls: calls.clone(),
        });

        let retriever = Retriever::new(embedder, one_entry_index(), policy());
        let err = retriever.retrieve("x", 4).await.unwrap_err();

        assert!(matches!(err, Error::Provider { .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
