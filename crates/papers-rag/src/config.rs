//! Configuration for the RAG pipeline

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::ingestion::ChunkUnit;

/// Main pipeline configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RagConfig {
    /// Corpus location
    pub corpus: CorpusConfig,
    /// Chunking configuration
    pub chunking: ChunkingConfig,
    /// Embedding configuration
    pub embeddings: EmbeddingConfig,
    /// Language model configuration
    pub llm: LlmConfig,
    /// Retrieval and index configuration
    pub retrieval: RetrievalConfig,
    /// Timeouts, retries and build parallelism for external calls
    pub requests: RequestConfig,
    /// Where the API credential comes from
    pub credentials: CredentialsConfig,
}

impl RagConfig {
    /// Load configuration from a TOML file; missing fields take their defaults
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!("Cannot read config file {}: {}", path.display(), e))
        })?;
        Self::from_toml(&raw)
    }

    /// Parse configuration from a TOML string
    pub fn from_toml(raw: &str) -> Result<Self> {
        toml::from_str(raw).map_err(|e| Error::config(format!("Invalid config: {}", e)))
    }

    /// Serialize configuration to TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::config(e.to_string()))
    }

    /// Check every field that must hold before the pipeline can serve
    pub fn validate(&self) -> Result<()> {
        if self.corpus.source.trim().is_empty() {
            return Err(Error::config("corpus.source must not be empty"));
        }
        if self.chunking.chunk_size == 0 {
            return Err(Error::config("chunking.chunk_size must be positive"));
        }
        if self.chunking.chunk_overlap >= self.chunking.chunk_size {
            return Err(Error::config(format!(
                "chunking.chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunking.chunk_overlap, self.chunking.chunk_size
            )));
        }
        if self.embeddings.dimensions == 0 {
            return Err(Error::config("embeddings.dimensions must be positive"));
        }
        if self.embeddings.batch_size == 0 {
            return Err(Error::config("embeddings.batch_size must be positive"));
        }
        if self.embeddings.cache && self.embeddings.cache_capacity == 0 {
            return Err(Error::config("embeddings.cache_capacity must be positive"));
        }
        if self.embeddings.model.trim().is_empty() {
            return Err(Error::config("embeddings.model must not be empty"));
        }
        if self.llm.model.trim().is_empty() {
            return Err(Error::config("llm.model must not be empty"));
        }
        if self.retrieval.top_k == 0 {
            return Err(Error::config("retrieval.top_k must be positive"));
        }
        if let Some(min) = self.retrieval.min_score {
            if !(-1.0..=1.0).contains(&min) {
                return Err(Error::config("retrieval.min_score must lie in [-1, 1]"));
            }
        }
        if self.retrieval.index == IndexKind::Ivf
            && (self.retrieval.ivf.nlist == 0 || self.retrieval.ivf.nprobe == 0)
        {
            return Err(Error::config("retrieval.ivf.nlist and nprobe must be positive"));
        }
        if self.requests.timeout_secs == 0 {
            return Err(Error::config("requests.timeout_secs must be positive"));
        }
        if self.requests.parallel_embeddings == 0 {
            return Err(Error::config("requests.parallel_embeddings must be positive"));
        }
        Ok(())
    }

    /// Whether any configured backend needs the API credential
    pub fn requires_api_key(&self) -> bool {
        self.embeddings.backend == EmbeddingBackend::OpenAi || self.llm.backend == LlmBackend::OpenAi
    }

    /// Read the API credential from the process environment
    pub fn resolve_api_key(&self) -> Result<Option<ApiKey>> {
        self.resolve_api_key_with(|name| std::env::var(name).ok())
    }

    /// Read the API credential through an arbitrary lookup
    pub fn resolve_api_key_with<F>(&self, lookup: F) -> Result<Option<ApiKey>>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = &self.credentials.api_key_env;
        match lookup(var).filter(|v| !v.trim().is_empty()) {
            Some(value) => Ok(Some(ApiKey::new(value.trim()))),
            None if self.requires_api_key() => Err(Error::config(format!(
                "API credential missing: set the {} environment variable",
                var
            ))),
            None => Ok(None),
        }
    }
}

/// Corpus location
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorpusConfig {
    /// File path, directory, or http(s) URL
    pub source: String,
    /// File extensions picked up when `source` is a directory
    pub extensions: Vec<String>,
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            source: "papers.txt".to_string(),
            extensions: vec!["txt".to_string(), "md".to_string()],
        }
    }
}

/// Text chunking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Window size in units
    pub chunk_size: usize,
    /// Units shared by consecutive windows
    pub chunk_overlap: usize,
    /// What a unit is
    pub unit: ChunkUnit,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
            unit: ChunkUnit::Char,
        }
    }
}

/// Embedding service selection
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    /// OpenAI-compatible `/embeddings` endpoint
    #[default]
    OpenAi,
    /// Local Ollama server
    Ollama,
    /// Offline feature hashing, no service involved
    Hashing,
}

impl EmbeddingBackend {
    fn default_base_url(self) -> &'static str {
        match self {
            Self::OpenAi => OPENAI_BASE_URL,
            Self::Ollama => OLLAMA_BASE_URL,
            Self::Hashing => "",
        }
    }
}

/// Embedding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub backend: EmbeddingBackend,
    /// Service base URL; the backend's default when unset
    pub base_url: Option<String>,
    /// Model name
    pub model: String,
    /// Output dimension of the model
    pub dimensions: usize,
    /// Texts per embedding request during index build
    pub batch_size: usize,
    /// Memoise embeddings by content hash
    pub cache: bool,
    /// Most vectors kept by the cache; the oldest are evicted first
    pub cache_capacity: usize,
}

impl EmbeddingConfig {
    /// Base URL with the backend default applied
    pub fn base_url(&self) -> String {
        self.base_url
            .clone()
            .unwrap_or_else(|| self.backend.default_base_url().to_string())
            .trim_end_matches('/')
            .to_string()
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            backend: EmbeddingBackend::OpenAi,
            base_url: None,
            model: "text-embedding-3-small".to_string(),
            dimensions: 1536,
            batch_size: 64,
            cache: true,
            cache_capacity: 10_000,
        }
    }
}

/// Completion service selection
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LlmBackend {
    /// OpenAI-compatible `/chat/completions` endpoint
    #[default]
    OpenAi,
    /// Local Ollama server
    Ollama,
}

/// Language model configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub backend: LlmBackend,
    /// Service base URL; the backend's default when unset
    pub base_url: Option<String>,
    /// Generation model name
    pub model: String,
    /// Temperature for generation
    pub temperature: f32,
    /// Upper bound on generated tokens
    pub max_tokens: u32,
}

impl LlmConfig {
    /// Base URL with the backend default applied
    pub fn base_url(&self) -> String {
        let default = match self.backend {
            LlmBackend::OpenAi => OPENAI_BASE_URL,
            LlmBackend::Ollama => OLLAMA_BASE_URL,
        };
        self.base_url
            .as_deref()
            .unwrap_or(default)
            .trim_end_matches('/')
            .to_string()
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            backend: LlmBackend::OpenAi,
            base_url: None,
            model: "gpt-4o-mini".to_string(),
            temperature: 0.3, // Lower for more factual answers
            max_tokens: 512,
        }
    }
}

/// Vector index selection
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum IndexKind {
    /// Exact linear scan
    #[default]
    Exact,
    /// Inverted-file approximate search
    Ivf,
}

/// Inverted-file index parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IvfConfig {
    /// Number of centroids (capped at the entry count)
    pub nlist: usize,
    /// Lists scanned per query
    pub nprobe: usize,
    /// k-means refinement rounds
    pub iterations: usize,
}

impl Default for IvfConfig {
    fn default() -> Self {
        Self {
            nlist: 16,
            nprobe: 4,
            iterations: 8,
        }
    }
}

/// Retrieval configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Chunks handed to the answer generator
    pub top_k: usize,
    /// Drop retrieved chunks scoring below this cosine similarity
    pub min_score: Option<f32>,
    pub index: IndexKind,
    pub ivf: IvfConfig,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 4,
            min_score: None,
            index: IndexKind::Exact,
            ivf: IvfConfig::default(),
        }
    }
}

/// External call policy
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestConfig {
    /// Per-attempt timeout in seconds
    pub timeout_secs: u64,
    /// Retries after the first attempt for transient failures
    pub max_retries: u32,
    /// First backoff delay in milliseconds, doubled per retry
    pub base_delay_ms: u64,
    /// Backoff ceiling in milliseconds
    pub max_delay_ms: u64,
    /// Concurrent embedding requests while building the index
    pub parallel_embeddings: usize,
}

impl RequestConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 60,
            max_retries: 3,
            base_delay_ms: 500,
            max_delay_ms: 8_000,
            parallel_embeddings: 4,
        }
    }
}

/// Credential source
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialsConfig {
    /// Environment variable holding the API key
    pub api_key_env: String,
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            api_key_env: "OPENAI_API_KEY".to_string(),
        }
    }
}

/// API credential; never printed
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The raw secret, for request headers only
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const OLLAMA_BASE_URL: &str = "http://localhost:11434";
