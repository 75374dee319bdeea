//! Provider router — selects the correct LLM provider based on config.
//!
//! Handles provider creation and routing of completion and embedding
//! requests to the right backend.

use std::collections::HashMap;
use std::sync::Arc;

use ragchat_config::AppConfig;
use ragchat_core::provider::Provider;
use tracing::warn;

use crate::ollama::OllamaProvider;
use crate::openai_compat::OpenAiCompatProvider;

/// Routes LLM requests to the correct provider.
pub struct ProviderRouter {
    providers: HashMap<String, Arc<dyn Provider>>,
    default_provider: String,
    embedding_provider: String,
}

impl ProviderRouter {
    /// Create a new router with a default provider.
    pub fn new(default_provider: impl Into<String>) -> Self {
        let default_provider = default_provider.into();
        Self {
            providers: HashMap::new(),
            embedding_provider: default_provider.clone(),
            default_provider,
        }
    }

    /// Route embedding requests to a different provider.
    pub fn with_embedding_provider(mut self, name: impl Into<String>) -> Self {
        self.embedding_provider = name.into();
        self
    }

    /// Register a provider.
    pub fn register(&mut self, name: impl Into<String>, provider: Arc<dyn Provider>) {
        self.providers.insert(name.into(), provider);
    }

    /// Get the provider used for completions.
    pub fn default(&self) -> Option<Arc<dyn Provider>> {
        self.providers.get(&self.default_provider).cloned()
    }

    /// Get the provider used for embeddings.
    pub fn embedder(&self) -> Option<Arc<dyn Provider>> {
        self.providers.get(&self.embedding_provider).cloned()
    }

    /// Get a specific provider by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Provider>> {
        self.providers.get(name).cloned()
    }

    /// List all registered provider names, sorted.
    pub fn list(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.providers.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }
}

/// Build providers from configuration.
///
/// Every entry of `[providers]` is registered, then the completion and
/// embedding providers are created from well-known defaults if they were
/// not configured explicitly. A name with neither an `api_url` nor a
/// well-known endpoint is left unregistered.
pub fn build_from_config(config: &AppConfig) -> ProviderRouter {
    let mut router = ProviderRouter::new(&config.default_provider)
        .with_embedding_provider(&config.embedding.provider);

    for (name, provider_config) in &config.providers {
        let api_key = provider_config
            .api_key
            .clone()
            .or_else(|| config.api_key.clone())
            .unwrap_or_default();

        match create_provider(name, provider_config.api_url.as_deref(), &api_key) {
            Some(provider) => router.register(name.clone(), provider),
            None => warn!(provider = %name, "No api_url and no known endpoint; provider skipped"),
        }
    }

    for name in [&config.default_provider, &config.embedding.provider] {
        if router.get(name).is_none() {
            let api_key = config.api_key.clone().unwrap_or_default();
            if let Some(provider) = create_provider(name, None, &api_key) {
                router.register(name.clone(), provider);
            }
        }
    }

    router
}

fn create_provider(name: &str, api_url: Option<&str>, api_key: &str) -> Option<Arc<dyn Provider>> {
    if name == "ollama" {
        return Some(Arc::new(OllamaProvider::new(api_url)));
    }

    let base_url = match api_url {
        Some(url) => url.to_string(),
        None => default_base_url(name)?.to_string(),
    };
    Some(Arc::new(OpenAiCompatProvider::new(name, base_url, api_key)))
}

/// Get the default base URL for well-known providers.
fn default_base_url(provider_name: &str) -> Option<&'static str> {
    let url = match provider_name {
        "openrouter" => "https://openrouter.ai/api/v1",
        "openai" => "https://api.openai.com/v1",
        "ollama" => "http://localhost:11434/v1",
        "groq" => "https://api.groq.com/openai/v1",
        "together" => "https://api.together.xyz/v1",
        "vllm" => "http://localhost:8000/v1",
        "llamacpp" | "llama.cpp" => "http://localhost:8080/v1",
        _ => return None,
    };
    Some(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ragchat_config::ProviderConfig;

    #[test]
    fn router_register_and_lookup() {
        let mut router = ProviderRouter::new("openai");
        router.register("openai", Arc::new(OpenAiCompatProvider::openai("sk-test")));

        assert!(router.get("openai").is_some());
        assert!(router.get("nonexistent").is_none());
        assert!(router.default().is_some());
        assert!(router.embedder().is_some());
    }

    #[test]
    fn default_base_urls() {
        assert!(default_base_url("openrouter").unwrap().contains("openrouter.ai"));
        assert!(default_base_url("openai").unwrap().contains("api.openai.com"));
        assert!(default_base_url("vllm").unwrap().contains("localhost:8000"));
        assert!(default_base_url("olama").is_none());
    }

    #[test]
    fn every_builtin_provider_has_an_endpoint() {
        for name in ragchat_config::BUILTIN_PROVIDERS {
            assert!(create_provider(name, None, "").is_some(), "{name}");
        }
    }

    #[test]
    fn unknown_provider_is_not_routed() {
        let mut config = AppConfig::default();
        config.default_provider = "olama".into();
        assert!(config.validate().is_err());

        let router = build_from_config(&config);
        assert!(router.default().is_none());
        assert!(router.embedder().is_some());
    }

    #[test]
    fn build_from_default_config_uses_native_ollama() {
        let config = AppConfig::default();
        let router = build_from_config(&config);
        assert_eq!(router.default().unwrap().name(), "ollama");
        assert_eq!(router.embedder().unwrap().name(), "ollama");
        assert_eq!(router.list(), vec!["ollama"]);
    }

    #[test]
    fn separate_embedding_provider_is_registered() {
        let mut config = AppConfig::default();
        config.default_provider = "openai".into();
        config.embedding.provider = "ollama".into();
        config.api_key = Some("sk-test".into());

        let router = build_from_config(&config);
        assert_eq!(router.default().unwrap().name(), "openai");
        assert_eq!(router.embedder().unwrap().name(), "ollama");
        assert_eq!(router.list(), vec!["ollama", "openai"]);
    }

    #[test]
    fn configured_provider_keeps_custom_url() {
        let mut config = AppConfig::default();
        config.default_provider = "lab".into();
        config.providers.insert(
            "lab".into(),
            ProviderConfig {
                api_key: None,
                api_url: Some("http://10.0.0.5:8000/v1".into()),
                default_model: None,
            },
        );

        let router = build_from_config(&config);
        assert_eq!(router.default().unwrap().name(), "lab");
    }
}
