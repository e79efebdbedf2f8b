//! Error types for the RAG pipeline

use std::time::Duration;

use thiserror::Error;

use crate::pipeline::PipelineState;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, Error>;

/// Pipeline errors
#[derive(Debug, Error)]
pub enum Error {
    /// Missing or invalid setup, fatal before serving
    #[error("Configuration error: {0}")]
    Config(String),

    /// Corpus unreadable or missing
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Permanent failure of an external service (auth, invalid input, quota)
    #[error("{provider} request failed: {message}")]
    Provider { provider: String, message: String },

    /// Transient failure of an external service, worth retrying
    #[error("{provider} temporarily unavailable: {message}")]
    Retryable { provider: String, message: String },

    /// A single external call exceeded its time budget
    #[error("{operation} timed out after {after:?}")]
    Timeout { operation: String, after: Duration },

    /// Index queried while holding no entries
    #[error("Vector index is empty")]
    EmptyIndex,

    /// Pipeline used outside the Ready state
    #[error("Pipeline is not ready (state: {0})")]
    NotReady(PipelineState),

    /// Language model produced no usable content
    #[error("Model '{model}' returned an empty response")]
    EmptyResponse { model: String },

    /// Embedding length does not match the index dimension
    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Empty or whitespace-only question
    #[error("Question must not be empty")]
    InvalidQuestion,

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request error
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),
}

impl Error {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a permanent provider error
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Create a transient provider error
    pub fn retryable(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Retryable {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Create a timeout error
    pub fn timeout(operation: impl Into<String>, after: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            after,
        }
    }

    /// Whether a caller should retry the failed call
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Retryable { .. } | Self::Timeout { .. })
    }

    /// Whether the error belongs to startup (configuration or corpus loading)
    pub fn is_startup(&self) -> bool {
        matches!(self, Self::Config(_) | Self::Io(_))
    }

    /// Turn an exhausted transient failure into a permanent one
    pub(crate) fn into_permanent(self) -> Self {
        match self {
            Self::Retryable { provider, message } => Self::Provider { provider, message },
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(Error::retryable("openai", "503").is_retryable());
        assert!(Error::timeout("embed", Duration::from_secs(1)).is_retryable());
        assert!(!Error::provider("openai", "401").is_retryable());
        assert!(!Error::EmptyIndex.is_retryable());
    }

    #[test]
    fn test_into_permanent() {
        let err = Error::retryable("ollama", "connection refused").into_permanent();
        assert!(matches!(err, Error::Provider { ref provider, .. } if provider == "ollama"));

        let err = Error::timeout("complete", Duration::from_millis(10)).into_permanent();
        assert!(matches!(err, Error::Timeout { .. }));
    }

    #[test]
    fn test_startup_errors() {
        assert!(Error::config("missing key").is_startup());
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "papers.txt");
        assert!(Error::from(io).is_startup());
        assert!(!Error::InvalidQuestion.is_startup());
    }
}
