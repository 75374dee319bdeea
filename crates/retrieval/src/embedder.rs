//! Text embedding through an LLM provider.

use std::sync::Arc;

use ragchat_core::error::{ProviderError, RetrievalError};
use ragchat_core::provider::{EmbeddingRequest, Provider};
use tracing::debug;

/// Turns text into vectors using a provider's embedding endpoint.
#[derive(Clone)]
pub struct Embedder {
    provider: Arc<dyn Provider>,
    model: String,
}

impl Embedder {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Embed a single piece of text.
    pub async fn embed_one(&self, text: &str) -> Result<Vec<f32>, RetrievalError> {
        let response = self
            .provider
            .embed(EmbeddingRequest {
                model: self.model.clone(),
                inputs: vec![text.to_string()],
            })
            .await
            .map_err(embedding_error)?;

        debug!(
            provider = self.provider.name(),
            model = %self.model,
            "Embedded text"
        );

        response.embeddings.into_iter().next().ok_or_else(|| {
            RetrievalError::SearchFailed("embedding provider returned no vectors".into())
        })
    }
}

/// Unreachable or slow embedders make the index unavailable; anything
/// else is a failed search.
fn embedding_error(err: ProviderError) -> RetrievalError {
    match err {
        ProviderError::Network(_) | ProviderError::Timeout(_) | ProviderError::NotConfigured(_) => {
            RetrievalError::IndexUnavailable(format!("embedding failed: {err}"))
        }
        other => RetrievalError::SearchFailed(format!("embedding failed: {other}")),
    }
}
