//! Native Ollama provider.
//!
//! Talks to Ollama's own API rather than its OpenAI shim:
//! - `/api/generate` for raw prompt completion (no chat template wrapping
//!   beyond the model's own)
//! - `/api/embed` for batch embeddings
//! - `/api/tags` for model listing and health checks

use std::time::Duration;

use async_trait::async_trait;
use ragchat_core::error::ProviderError;
use ragchat_core::provider::*;
use serde::Deserialize;
use tracing::debug;

use crate::http;

const DEFAULT_BASE_URL: &str = "http://localhost:11434";

/// Ollama native API provider.
pub struct OllamaProvider {
    base_url: String,
    client: reqwest::Client,
}

impl OllamaProvider {
    /// Create a provider for the given server, or `localhost:11434`.
    pub fn new(base_url: Option<&str>) -> Self {
        let base_url = base_url
            .unwrap_or(DEFAULT_BASE_URL)
            .trim_end_matches('/')
            .trim_end_matches("/v1")
            .to_string();

        Self {
            base_url,
            // Local models can take a while to load on first use
            client: http::client(Duration::from_secs(300)),
        }
    }

    fn generate_body(request: &ProviderRequest) -> serde_json::Value {
        let mut options = serde_json::json!({
            "temperature": request.temperature,
        });
        if let Some(max_tokens) = request.max_tokens {
            options["num_predict"] = serde_json::json!(max_tokens);
        }
        if !request.stop.is_empty() {
            options["stop"] = serde_json::json!(request.stop);
        }

        serde_json::json!({
            "model": request.model,
            "prompt": request.prompt,
            "stream": false,
            "options": options,
        })
    }
}

impl Default for OllamaProvider {
    fn default() -> Self {
        Self::new(None)
    }
}

#[async_trait]
impl Provider for OllamaProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn complete(
        &self,
        request: ProviderRequest,
    ) -> std::result::Result<ProviderResponse, ProviderError> {
        let url = format!("{}/api/generate", self.base_url);

        debug!(model = %request.model, prompt_len = request.prompt.len(), "Sending Ollama generate request");

        let response = self
            .client
            .post(&url)
            .json(&Self::generate_body(&request))
            .send()
            .await
            .map_err(http::transport_error)?;

        let response = http::check_status("ollama", response).await?;

        let api: GenerateResponse = response.json().await.map_err(|e| ProviderError::ApiError {
            status_code: 200,
            message: format!("Failed to parse generate response: {e}"),
        })?;

        let usage = match (api.prompt_eval_count, api.eval_count) {
            (Some(prompt), Some(completion)) => Some(Usage {
                prompt_tokens: prompt,
                completion_tokens: completion,
                total_tokens: prompt + completion,
            }),
            _ => None,
        };

        Ok(ProviderResponse {
            content: api.response,
            usage,
            model: api.model,
            metadata: serde_json::Map::new(),
        })
    }

    async fn embed(
        &self,
        request: EmbeddingRequest,
    ) -> std::result::Result<EmbeddingResponse, ProviderError> {
        let url = format!("{}/api/embed", self.base_url);

        debug!(model = %request.model, count = request.inputs.len(), "Sending Ollama embed request");

        let response = self
            .client
            .post(&url)
            .json(&serde_json::json!({
                "model": request.model,
                "input": request.inputs,
            }))
            .send()
            .await
            .map_err(http::transport_error)?;

        let response = http::check_status("ollama", response).await?;

        let api: EmbedResponse = response.json().await.map_err(|e| ProviderError::ApiError {
            status_code: 200,
            message: format!("Failed to parse embed response: {e}"),
        })?;

        Ok(EmbeddingResponse {
            embeddings: api.embeddings,
            model: api.model,
            usage: api.prompt_eval_count.map(|n| Usage {
                prompt_tokens: n,
                completion_tokens: 0,
                total_tokens: n,
            }),
        })
    }

    async fn list_models(&self) -> std::result::Result<Vec<String>, ProviderError> {
        let url = format!("{}/api/tags", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(http::transport_error)?;

        if !response.status().is_success() {
            return Ok(Vec::new());
        }

        let tags: TagsResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }

    async fn health_check(&self) -> std::result::Result<bool, ProviderError> {
        let url = format!("{}/api/tags", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(http::transport_error)?;

        Ok(response.status().is_success())
    }
}

// --- Ollama API types (internal) ---

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    model: String,
    #[serde(default)]
    response: String,
    #[serde(default)]
    prompt_eval_count: Option<u32>,
    #[serde(default)]
    eval_count: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    model: String,
    embeddings: Vec<Vec<f32>>,
    #[serde(default)]
    prompt_eval_count: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<TagModel>,
}

#[derive(Debug, Deserialize)]
struct TagModel {
    name: String,
}
