//! Pipeline orchestration: build the index once, then answer questions
//!
//! The pipeline moves through `Uninitialized -> Indexed -> Ready`.
//! `build_index` loads, chunks and embeds the corpus; `warm_up` checks the
//! completion service. Questions are only accepted once Ready.

mod context;

pub use context::RagContext;

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt, TryStreamExt};
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::config::RagConfig;
use crate::error::{Error, Result};
use crate::generation::AnswerGenerator;
use crate::retrieval::{build_index, Retriever, VectorIndex};
use crate::types::{normalize_question, Answer, Chunk, Embedding, IndexEntry};

/// Lifecycle state of a pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineState {
    /// Nothing loaded yet
    Uninitialized,
    /// Index built, completion service not yet checked
    Indexed,
    /// Accepting questions
    Ready,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Uninitialized => "uninitialized",
            Self::Indexed => "indexed",
            Self::Ready => "ready",
        };
        f.write_str(name)
    }
}

/// Summary of the last index build
#[derive(Debug, Clone, Serialize)]
pub struct IndexStats {
    pub documents: usize,
    pub chunks: usize,
    pub entries: usize,
    pub dimensions: usize,
    pub index: String,
    pub elapsed_ms: u64,
    pub built_at: DateTime<Utc>,
}

/// Retrieval-augmented question answering over a fixed corpus
pub struct RagPipeline {
    context: RagContext,
    state: PipelineState,
    retriever: Option<Retriever>,
    generator: AnswerGenerator,
    stats: Option<IndexStats>,
    questions: AtomicU64,
}

impl RagPipeline {
    pub fn new(context: RagContext) -> Self {
        let generator = AnswerGenerator::new(context.llm().clone(), context.policy().clone());
        Self {
            context,
            state: PipelineState::Uninitialized,
            retriever: None,
            generator,
            stats: None,
            questions: AtomicU64::new(0),
        }
    }

    /// Build the context from configuration, index the corpus and warm up
    pub async fn initialize(config: RagConfig) -> Result<Self> {
        let context = RagContext::from_config(config)?;
        let mut pipeline = Self::new(context);
        pipeline.build_index().await?;
        pipeline.warm_up().await?;
        Ok(pipeline)
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Statistics of the last successful build
    pub fn stats(&self) -> Option<&IndexStats> {
        self.stats.as_ref()
    }

    pub fn context(&self) -> &RagContext {
        &self.context
    }

    pub fn index(&self) -> Option<&Arc<dyn VectorIndex>> {
        self.retriever.as_ref().map(Retriever::index)
    }

    /// Load, chunk and embed the corpus, then build the vector index
    ///
    /// On failure the previous state and index are kept. Rebuilding a Ready
    /// pipeline returns it to Indexed.
    pub async fn build_index(&mut self) -> Result<IndexStats> {
        let started = Instant::now();
        let config = self.context.config();

        let documents = self.context.loader().load().await?;
        tracing::info!(
            "Loaded {} document(s) via {} loader",
            documents.len(),
            self.context.loader().name()
        );

        let chunks = self.context.chunker().split_all(&documents);
        tracing::info!(
            "Split corpus into {} chunks (size {}, overlap {})",
            chunks.len(),
            self.context.chunker().chunk_size(),
            self.context.chunker().overlap()
        );

        let embeddings = self.embed_chunks(&chunks).await?;
        let dimensions = self.context.embedder().dimensions();
        let entries: Vec<IndexEntry> = chunks
            .into_iter()
            .zip(embeddings)
            .map(|(chunk, embedding)| IndexEntry::new(chunk, embedding))
            .collect();
        let chunk_count = entries.len();

        let index = build_index(
            config.retrieval.index,
            dimensions,
            entries,
            &config.retrieval.ivf,
        )?;

        let stats = IndexStats {
            documents: documents.len(),
            chunks: chunk_count,
            entries: index.len(),
            dimensions,
            index: index.name().to_string(),
            elapsed_ms: started.elapsed().as_millis() as u64,
            built_at: Utc::now(),
        };

        if index.is_empty() {
            tracing::warn!("Corpus produced no chunks; questions will fail until it is rebuilt");
        }

        self.retriever = Some(
            Retriever::new(
                self.context.embedder().clone(),
                index,
                self.context.policy().clone(),
            )
            .with_min_score(config.retrieval.min_score),
        );
        self.stats = Some(stats.clone());
        self.state = PipelineState::Indexed;

        tracing::info!(
            "Index ready: {} entries in {}ms",
            stats.entries,
            stats.elapsed_ms
        );

        Ok(stats)
    }

    /// Embed chunk contents in batches with bounded concurrency, keeping order
    async fn embed_chunks(&self, chunks: &[Chunk]) -> Result<Vec<Embedding>> {
        let config = self.context.config();
        let batch_size = config.embeddings.batch_size.max(1);
        let parallel = config.requests.parallel_embeddings.max(1);
        let embedder = self.context.embedder();
        let policy = self.context.policy();

        let batches: Vec<Vec<String>> = chunks
            .chunks(batch_size)
            .map(|batch| batch.iter().map(|c| c.content.clone()).collect())
            .collect();
        let total = batches.len();

        let embedded: Vec<Vec<Embedding>> = stream::iter(batches.iter().enumerate())
            .map(|(i, batch)| async move {
                tracing::debug!("Embedding batch {}/{} ({} chunks)", i + 1, total, batch.len());
                let vectors = policy
                    .run("embed batch", || embedder.embed_batch(batch))
                    .await?;
                if vectors.len() != batch.len() {
                    return Err(Error::provider(
                        embedder.name(),
                        format!("expected {} embeddings, got {}", batch.len(), vectors.len()),
                    ));
                }
                Ok::<_, Error>(vectors)
            })
            .buffered(parallel)
            .try_collect()
            .await?;

        Ok(embedded.into_iter().flatten().collect())
    }

    /// Check the completion service and start accepting questions
    ///
    /// An unhealthy service only logs a warning. A health check that does not
    /// answer within the request timeout fails with `Timeout` and leaves the
    /// state unchanged.
    pub async fn warm_up(&mut self) -> Result<()> {
        if self.state == PipelineState::Uninitialized {
            return Err(Error::NotReady(self.state));
        }

        let llm = self.context.llm();
        let healthy = self
            .context
            .policy()
            .run_once("health check", llm.health_check())
            .await?;
        if !healthy {
            tracing::warn!(
                "{} health check failed for model {}; answers may fail",
                llm.name(),
                llm.model()
            );
        }

        self.state = PipelineState::Ready;
        tracing::info!("Pipeline ready (model {})", llm.model());
        Ok(())
    }

    /// Answer a question with the configured top-K
    pub async fn ask(&self, question: &str) -> Result<Answer> {
        self.ask_with(question, self.context.config().retrieval.top_k)
            .await
    }

    /// Answer a question using the `top_k` most similar chunks
    pub async fn ask_with(&self, question: &str, top_k: usize) -> Result<Answer> {
        let result = self.answer(question, top_k).await;
        match &result {
            Ok(answer) => {
                self.questions.fetch_add(1, Ordering::Relaxed);
                tracing::info!("Answered with {} sources", answer.sources.len());
            }
            Err(e) => tracing::error!("Question failed: {}", e),
        }
        result
    }

    async fn answer(&self, question: &str, top_k: usize) -> Result<Answer> {
        let retriever = match (&self.retriever, self.state) {
            (Some(retriever), PipelineState::Ready) => retriever,
            _ => return Err(Error::NotReady(self.state)),
        };
        let question = normalize_question(question)?;

        let context = retriever.retrieve_scored(question, top_k).await?;
        self.generator.generate(question, &context).await
    }

    /// Tear the pipeline down, releasing the index and providers
    pub fn shutdown(self) {
        tracing::info!(
            "Pipeline shut down after {} answered question(s)",
            self.questions.load(Ordering::Relaxed)
        );
    }
}
