//! Explicit pipeline context built at startup

use std::sync::Arc;

use crate::config::{ApiKey, RagConfig};
use crate::error::Result;
use crate::ingestion::{loader_for, DocumentLoader, TextChunker};
use crate::providers::{build_providers, EmbeddingProvider, LlmProvider};
use crate::retry::CallPolicy;

/// Everything the pipeline needs, resolved once from configuration
pub struct RagContext {
    config: RagConfig,
    api_key: Option<ApiKey>,
    embedder: Arc<dyn EmbeddingProvider>,
    llm: Arc<dyn LlmProvider>,
    loader: Arc<dyn DocumentLoader>,
    chunker: TextChunker,
    policy: CallPolicy,
}

impl RagContext {
    /// Validate configuration, read the credential and build providers
    ///
    /// Fails with `Config` before any request is made when the setup is
    /// invalid or the credential is missing.
    pub fn from_config(config: RagConfig) -> Result<Self> {
        config.validate()?;
        let api_key = config.resolve_api_key()?;
        let providers = build_providers(&config, api_key.as_ref())?;
        let loader = loader_for(&config.corpus, config.requests.timeout())?;

        tracing::info!("Corpus source: {} ({} loader)", config.corpus.source, loader.name());

        let mut context = Self::from_parts(config, providers.embedder, providers.llm, loader)?;
        context.api_key = api_key;
        Ok(context)
    }

    /// Assemble a context from already constructed components
    pub fn from_parts(
        config: RagConfig,
        embedder: Arc<dyn EmbeddingProvider>,
        llm: Arc<dyn LlmProvider>,
        loader: Arc<dyn DocumentLoader>,
    ) -> Result<Self> {
        config.validate()?;
        let chunker = TextChunker::from_config(&config.chunking)?;
        let policy = CallPolicy::from_config(&config.requests);

        Ok(Self {
            config,
            api_key: None,
            embedder,
            llm,
            loader,
            chunker,
            policy,
        })
    }

    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    pub fn api_key(&self) -> Option<&ApiKey> {
        self.api_key.as_ref()
    }

    pub fn embedder(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.embedder
    }

    pub fn llm(&self) -> &Arc<dyn LlmProvider> {
        &self.llm
    }

    pub fn loader(&self) -> &Arc<dyn DocumentLoader> {
        &self.loader
    }

    pub fn chunker(&self) -> &TextChunker {
        &self.chunker
    }

    pub fn policy(&self) -> &CallPolicy {
        &self.policy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EmbeddingBackend, LlmBackend};
    use crate::error::Error;

    #[test]
    fn test_invalid_chunking_is_config_error() {
        let mut config = RagConfig::default();
        config.embeddings.backend = EmbeddingBackend::Hashing;
        config.llm.backend = LlmBackend::Ollama;
        config.chunking.chunk_overlap = config.chunking.chunk_size;

        assert!(matches!(RagContext::from_config(config), Err(Error::Config(_))));
    }

    #[test]
    fn test_offline_context() {
        let mut config = RagConfig::default();
        config.embeddings.backend = EmbeddingBackend::Hashing;
        config.embeddings.dimensions = 64;
        config.llm.backend = LlmBackend::Ollama;
        config.credentials.api_key_env = "PAPERS_RAG_UNSET_TEST_KEY".to_string();

        let context = RagContext::from_config(config).unwrap();
        assert!(context.api_key().is_none());
        assert_eq!(context.embedder().dimensions(), 64);
        assert_eq!(context.loader().name(), "file");
        assert_eq!(context.chunker().chunk_size(), 1000);
    }
}
