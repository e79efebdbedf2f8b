//! Provider abstractions for embeddings and LLM completion
//!
//! Trait-based abstractions that allow switching between OpenAI-compatible
//! services, a local Ollama server and an offline embedder through
//! configuration.

pub mod cache;
pub mod embedding;
pub mod hashing;
mod http;
pub mod llm;
pub mod ollama;
pub mod openai;

pub use cache::{CacheStats, CachedEmbedder};
pub use embedding::EmbeddingProvider;
pub use hashing::HashingEmbedder;
pub use llm::LlmProvider;
pub use ollama::{OllamaClient, OllamaEmbedder, OllamaLlm};
pub use openai::{OpenAiEmbedder, OpenAiLlm};

use std::sync::Arc;

use crate::config::{ApiKey, EmbeddingBackend, LlmBackend, RagConfig};
use crate::error::{Error, Result};

/// Embedding and completion providers selected by configuration
pub struct ProviderSet {
    pub embedder: Arc<dyn EmbeddingProvider>,
    pub llm: Arc<dyn LlmProvider>,
}

/// Build the configured providers
///
/// When both backends are Ollama on the same server they share one client.
pub fn build_providers(config: &RagConfig, api_key: Option<&ApiKey>) -> Result<ProviderSet> {
    let require_key = || {
        api_key.cloned().ok_or_else(|| {
            Error::config(format!(
                "API credential missing: set the {} environment variable",
                config.credentials.api_key_env
            ))
        })
    };

    let timeout = config.requests.timeout();

    let shared_ollama = match (config.embeddings.backend, config.llm.backend) {
        (EmbeddingBackend::Ollama, LlmBackend::Ollama)
            if config.embeddings.base_url() == config.llm.base_url() =>
        {
            Some(Arc::new(OllamaClient::new(config.llm.base_url(), timeout)?))
        }
        _ => None,
    };

    let embedder: Arc<dyn EmbeddingProvider> = match config.embeddings.backend {
        EmbeddingBackend::OpenAi => {
            Arc::new(OpenAiEmbedder::new(&config.embeddings, require_key()?, timeout)?)
        }
        EmbeddingBackend::Ollama => match &shared_ollama {
            Some(client) => Arc::new(OllamaEmbedder::from_client(
                Arc::clone(client),
                config.embeddings.dimensions,
                config.embeddings.model.clone(),
            )),
            None => Arc::new(OllamaEmbedder::new(&config.embeddings, timeout)?),
        },
        EmbeddingBackend::Hashing => Arc::new(HashingEmbedder::new(config.embeddings.dimensions)?),
    };

    let embedder: Arc<dyn EmbeddingProvider> = if config.embeddings.cache {
        Arc::new(CachedEmbedder::new(embedder, config.embeddings.cache_capacity))
    } else {
        embedder
    };

    let llm: Arc<dyn LlmProvider> = match config.llm.backend {
        LlmBackend::OpenAi => Arc::new(OpenAiLlm::new(&config.llm, require_key()?, timeout)?),
        LlmBackend::Ollama => match shared_ollama {
            Some(client) => Arc::new(OllamaLlm::from_client(client, &config.llm)),
            None => Arc::new(OllamaLlm::new(&config.llm, timeout)?),
        },
    };

    tracing::info!(
        "Providers ready: embeddings={} ({}), llm={} ({})",
        embedder.name(),
        embedder.model(),
        llm.name(),
        llm.model()
    );

    Ok(ProviderSet { embedder, llm })
}
