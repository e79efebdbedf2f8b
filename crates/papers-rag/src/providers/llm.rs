//! LLM provider trait for generating answers

use async_trait::async_trait;

use crate::error::Result;
use crate::generation::Prompt;

/// Trait for LLM completion
///
/// Implementations:
/// - `OpenAiLlm`: OpenAI-compatible `/chat/completions` API
/// - `OllamaLlm`: Local Ollama server (llama3, phi3, etc.)
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Complete a prompt; the raw text is returned untrimmed
    async fn complete(&self, prompt: &Prompt) -> Result<String>;

    /// Check if the provider is healthy and available
    async fn health_check(&self) -> Result<bool>;

    /// Get provider name for logging
    fn name(&self) -> &str;

    /// Get the model being used
    fn model(&self) -> &str;
}
