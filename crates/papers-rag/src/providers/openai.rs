//! OpenAI-compatible providers for embeddings and chat completion

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::{ApiKey, EmbeddingConfig, LlmConfig};
use crate::error::{Error, Result};
use crate::generation::Prompt;
use crate::types::Embedding;

use super::embedding::{check_dimensions, EmbeddingProvider};
use super::http::{build_client, check_status, classify_send_error, read_json};
use super::llm::LlmProvider;

const PROVIDER: &str = "openai";

#[derive(Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// OpenAI embedding provider
pub struct OpenAiEmbedder {
    client: Client,
    base_url: String,
    api_key: ApiKey,
    model: String,
    dimensions: usize,
}

impl OpenAiEmbedder {
    /// Create a new OpenAI embedder; `timeout` bounds each HTTP request
    pub fn new(config: &EmbeddingConfig, api_key: ApiKey, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: build_client(timeout)?,
            base_url: config.base_url(),
            api_key,
            model: config.model.clone(),
            dimensions: config.dimensions,
        })
    }

    async fn request(&self, inputs: &[String]) -> Result<Vec<Embedding>> {
        let url = format!("{}/embeddings", self.base_url);
        let request = EmbeddingsRequest {
            model: &self.model,
            input: inputs,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(self.api_key.expose())
            .json(&request)
            .send()
            .await
            .map_err(|e| classify_send_error(PROVIDER, e))?;
        let response = check_status(PROVIDER, response).await?;

        let parsed: EmbeddingsResponse =
            read_json(PROVIDER, response, "embedding response").await?;

        if parsed.data.len() != inputs.len() {
            return Err(Error::provider(
                PROVIDER,
                format!(
                    "Expected {} embeddings, received {}",
                    inputs.len(),
                    parsed.data.len()
                ),
            ));
        }

        // The API does not promise to answer in input order
        let mut slots: Vec<Option<Embedding>> = vec![None; inputs.len()];
        for item in parsed.data {
            let slot = slots.get_mut(item.index).ok_or_else(|| {
                Error::provider(
                    PROVIDER,
                    format!(
                        "Embedding index {} out of range for {} inputs",
                        item.index,
                        inputs.len()
                    ),
                )
            })?;
            if slot.is_some() {
                return Err(Error::provider(
                    PROVIDER,
                    format!("Embedding index {} returned twice", item.index),
                ));
            }
            *slot = Some(check_dimensions(self.dimensions, item.embedding)?);
        }

        // Count matched and every index is unique, so every slot is filled
        Ok(slots.into_iter().flatten().collect())
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbedder {
    async fn embed(&self, text: &str) -> Result<Embedding> {
        let mut embeddings = self.request(&[text.to_string()]).await?;
        embeddings
            .pop()
            .ok_or_else(|| Error::provider(PROVIDER, "Empty embedding response"))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Embedding>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        self.request(texts).await
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn health_check(&self) -> Result<bool> {
        health_check(&self.client, &self.base_url, &self.api_key).await
    }

    fn name(&self) -> &str {
        PROVIDER
    }

    fn model(&self) -> &str {
        &self.model
    }
}

/// OpenAI chat completion provider
pub struct OpenAiLlm {
    client: Client,
    base_url: String,
    api_key: ApiKey,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl OpenAiLlm {
    /// Create a new OpenAI LLM provider
    pub fn new(config: &LlmConfig, api_key: ApiKey, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: build_client(timeout)?,
            base_url: config.base_url(),
            api_key,
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }
}

#[async_trait]
impl LlmProvider for OpenAiLlm {
    async fn complete(&self, prompt: &Prompt) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url);
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &prompt.system,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt.user,
                },
            ],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        tracing::debug!("Requesting completion from {}", self.model);

        let response = self
            .client
            .post(&url)
            .bearer_auth(self.api_key.expose())
            .json(&request)
            .send()
            .await
            .map_err(|e| classify_send_error(PROVIDER, e))?;
        let response = check_status(PROVIDER, response).await?;

        let parsed: ChatResponse = read_json(PROVIDER, response, "completion response").await?;

        Ok(parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default())
    }

    async fn health_check(&self) -> Result<bool> {
        health_check(&self.client, &self.base_url, &self.api_key).await
    }

    fn name(&self) -> &str {
        PROVIDER
    }

    fn model(&self) -> &str {
        &self.model
    }
}

async fn health_check(client: &Client, base_url: &str, api_key: &ApiKey) -> Result<bool> {
    let url = format!("{}/models", base_url);
    match client.get(&url).bearer_auth(api_key.expose()).send().await {
        Ok(response) => Ok(response.status().is_success()),
        Err(_) => Ok(false),
    }
}
