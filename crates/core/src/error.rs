//! Error types for the ragchat domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each collaborator boundary has its own error enum; the top-level
//! [`Error`] is what `chat` and ingestion surface to callers.

use std::time::Duration;

use thiserror::Error;

/// The top-level error type for all ragchat operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Startup ---
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    // --- Similarity index / document store ---
    #[error("Retrieval error: {0}")]
    Retrieval(#[from] RetrievalError),

    // --- Language model ---
    #[error("Generation error: {0}")]
    Generation(#[from] ProviderError),

    // --- Caller input ---
    #[error("Validation error: {0}")]
    Validation(String),

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// True for failures at an external collaborator boundary.
    ///
    /// The interactive shell keeps running after these.
    pub fn is_collaborator_failure(&self) -> bool {
        matches!(self, Self::Retrieval(_) | Self::Generation(_))
    }
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Boundary errors ---

#[derive(Debug, Clone, Error)]
pub enum RetrievalError {
    #[error("Similarity index unavailable: {0}")]
    IndexUnavailable(String),

    #[error("Similarity search failed: {0}")]
    SearchFailed(String),

    #[error("Document store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Document fetch failed: {0}")]
    FetchFailed(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("{operation} timed out after {timeout:?}")]
    Timeout { operation: String, timeout: Duration },

    #[error("Invalid record: {0}")]
    InvalidRecord(String),
}

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_error_displays_correctly() {
        let err = Error::Generation(ProviderError::ApiError {
            status_code: 500,
            message: "model crashed".into(),
        });
        assert!(err.to_string().contains("500"));
        assert!(err.to_string().contains("model crashed"));
        assert!(err.to_string().starts_with("Generation error"));
    }

    #[test]
    fn retrieval_timeout_displays_operation() {
        let err = Error::from(RetrievalError::Timeout {
            operation: "similarity search".into(),
            timeout: Duration::from_secs(30),
        });
        assert_eq!(
            err.to_string(),
            "Retrieval error: similarity search timed out after 30s"
        );
    }

    #[test]
    fn sub_second_timeout_is_not_rounded_to_zero() {
        let err = RetrievalError::Timeout {
            operation: "document fetch".into(),
            timeout: Duration::from_millis(250),
        };
        assert_eq!(err.to_string(), "document fetch timed out after 250ms");
    }

    #[test]
    fn collaborator_failures_are_classified() {
        assert!(Error::from(RetrievalError::SearchFailed("down".into())).is_collaborator_failure());
        assert!(Error::from(ProviderError::Network("reset".into())).is_collaborator_failure());
        assert!(!Error::Validation("empty query".into()).is_collaborator_failure());
        assert!(!Error::config("missing uri").is_collaborator_failure());
    }
}
