//! HTTP plumbing shared by the provider clients.

use std::time::Duration;

use ragchat_core::error::ProviderError;
use tracing::warn;

/// Build the HTTP client used by a provider.
pub(crate) fn client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_else(|e| {
            warn!(error = %e, "Falling back to default HTTP client");
            reqwest::Client::new()
        })
}

/// Map a transport failure, keeping timeouts distinguishable.
pub(crate) fn transport_error(err: reqwest::Error) -> ProviderError {
    if err.is_timeout() {
        ProviderError::Timeout(err.to_string())
    } else {
        ProviderError::Network(err.to_string())
    }
}

/// Turn a non-success status into the matching [`ProviderError`].
pub(crate) async fn check_status(
    provider: &str,
    response: reqwest::Response,
) -> Result<reqwest::Response, ProviderError> {
    let status = response.status().as_u16();

    match status {
        200..=299 => Ok(response),
        429 => Err(ProviderError::RateLimited {
            retry_after_secs: 5,
        }),
        401 | 403 => Err(ProviderError::AuthenticationFailed(
            "Invalid API key or insufficient permissions".into(),
        )),
        _ => {
            let error_body = response.text().await.unwrap_or_default();
            warn!(provider, status, body = %error_body, "Provider returned error");
            if status == 404 && error_body.contains("model") {
                return Err(ProviderError::ModelNotFound(error_body));
            }
            Err(ProviderError::ApiError {
                status_code: status,
                message: error_body,
            })
        }
    }
}
