//! Language-model provider implementations for ragchat.
//!
//! All providers implement the `ragchat_core::Provider` trait.
//! The router selects the correct provider based on configuration.

mod http;
pub mod ollama;
pub mod openai_compat;
pub mod router;

pub use ollama::OllamaProvider;
pub use openai_compat::OpenAiCompatProvider;
pub use router::{ProviderRouter, build_from_config};
