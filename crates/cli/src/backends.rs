//! Build the configured collaborators.

use std::sync::Arc;

use ragchat_config::AppConfig;
use ragchat_core::error::{Error, Result};
use ragchat_core::index::SimilarityIndex;
use ragchat_core::provider::Provider;
use ragchat_core::store::DocumentStore;
use ragchat_retrieval::{Embedder, InMemoryDocumentStore, InMemoryIndex, SqliteDocumentStore};
use tracing::{info, warn};

/// Similarity index, document store and language model for one run.
pub struct Backends {
    pub index: Arc<dyn SimilarityIndex>,
    pub store: Arc<dyn DocumentStore>,
    pub provider: Arc<dyn Provider>,
}

impl Backends {
    pub async fn connect(config: &AppConfig) -> Result<Self> {
        let router = ragchat_providers::build_from_config(config);
        let provider = router
            .default()
            .ok_or_else(|| Error::config(format!("provider '{}' is not available", config.default_provider)))?;
        let embedder = router
            .embedder()
            .ok_or_else(|| Error::config(format!("provider '{}' is not available", config.embedding.provider)))?;

        let embedder = Embedder::new(embedder, &config.embedding.model);
        let index = connect_index(config, embedder).await?;
        let store = connect_store(config).await?;

        info!(
            provider = provider.name(),
            model = %config.default_model,
            index = index.name(),
            store = store.name(),
            "Backends ready"
        );

        Ok(Self {
            index,
            store,
            provider,
        })
    }
}

async fn connect_index(config: &AppConfig, embedder: Embedder) -> Result<Arc<dyn SimilarityIndex>> {
    let vector = &config.vector_store;
    match vector.backend.as_str() {
        "memory" => {
            warn!("Using an in-memory similarity index; it starts empty and is not persisted");
            Ok(Arc::new(InMemoryIndex::new(embedder)))
        }
        #[cfg(feature = "postgres")]
        "postgres" => {
            let index = ragchat_retrieval::PgVectorIndex::connect(
                &vector.connection_string,
                &vector.collection,
                embedder,
                config.embedding.dimensions,
            )
            .await?;
            Ok(Arc::new(index))
        }
        other => Err(Error::config(format!(
            "vector_store.backend '{other}' is not supported by this build"
        ))),
    }
}

async fn connect_store(config: &AppConfig) -> Result<Arc<dyn DocumentStore>> {
    let documents = &config.document_store;
    match documents.backend.as_str() {
        "memory" => {
            warn!("Using an in-memory document store; it starts empty and is not persisted");
            Ok(Arc::new(InMemoryDocumentStore::new()))
        }
        "sqlite" => {
            let url = documents.resolved_url();
            ensure_parent_dir(&url);
            let store = SqliteDocumentStore::connect(&url, &documents.collection).await?;
            Ok(Arc::new(store))
        }
        #[cfg(feature = "postgres")]
        "postgres" => {
            let store =
                ragchat_retrieval::PgDocumentStore::connect(&documents.url, &documents.collection).await?;
            Ok(Arc::new(store))
        }
        other => Err(Error::config(format!(
            "document_store.backend '{other}' is not supported by this build"
        ))),
    }
}

/// SQLite creates the file but not its directory.
fn ensure_parent_dir(url: &str) {
    let Some(path) = url.strip_prefix("sqlite://") else {
        return;
    };
    let path = path.split('?').next().unwrap_or(path);
    let Some(parent) = std::path::Path::new(path).parent() else {
        return;
    };
    if parent.as_os_str().is_empty() {
        return;
    }
    if let Err(e) = std::fs::create_dir_all(parent) {
        warn!(dir = %parent.display(), error = %e, "Could not create document store directory");
    }
}
