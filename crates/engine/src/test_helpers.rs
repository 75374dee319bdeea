//! Scripted collaborators for session tests.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use ragchat_core::document::{DocumentId, DocumentRecord, InsertOutcome, SimilarityMatch};
use ragchat_core::error::{ProviderError, RetrievalError};
use ragchat_core::index::{IndexEntry, SimilarityIndex};
use ragchat_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};
use ragchat_core::store::DocumentStore;

/// Returns scripted responses in order and records every prompt.
///
/// Panics if more calls are made than responses provided.
pub struct ScriptedProvider {
    responses: Vec<String>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedProvider {
    pub fn new<S: Into<String>>(responses: impl IntoIterator<Item = S>) -> Self {
        Self {
            responses: responses.into_iter().map(Into::into).collect(),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let mut prompts = self.prompts.lock().unwrap();
        let call = prompts.len();
        let Some(content) = self.responses.get(call).cloned() else {
            panic!(
                "ScriptedProvider: no more responses (call #{call}, have {})",
                self.responses.len()
            );
        };
        prompts.push(request.prompt);

        Ok(ProviderResponse {
            content,
            usage: Some(Usage {
                prompt_tokens: 10,
                completion_tokens: 5,
                total_tokens: 15,
            }),
            model: request.model,
            metadata: serde_json::Map::new(),
        })
    }
}

/// Always fails with a network error.
pub struct FailingProvider;

#[async_trait]
impl Provider for FailingProvider {
    fn name(&self) -> &str {
        "failing"
    }

    async fn complete(&self, _request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        Err(ProviderError::Network("connection refused".into()))
    }
}

/// Sleeps before answering.
pub struct SlowProvider(pub Duration);

#[async_trait]
impl Provider for SlowProvider {
    fn name(&self) -> &str {
        "slow"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        tokio::time::sleep(self.0).await;
        Ok(ProviderResponse {
            content: "late".into(),
            usage: None,
            model: request.model,
            metadata: serde_json::Map::new(),
        })
    }
}

/// Returns the first `k` of a fixed match list.
pub struct StaticIndex {
    matches: Vec<SimilarityMatch>,
    calls: Mutex<Vec<usize>>,
}

impl StaticIndex {
    pub fn new(matches: Vec<SimilarityMatch>) -> Self {
        Self {
            matches,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn searches(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn last_k(&self) -> Option<usize> {
        self.calls.lock().unwrap().last().copied()
    }
}

#[async_trait]
impl SimilarityIndex for StaticIndex {
    fn name(&self) -> &str {
        "static"
    }

    async fn search(&self, _query: &str, k: usize) -> Result<Vec<SimilarityMatch>, RetrievalError> {
        self.calls.lock().unwrap().push(k);
        Ok(self.matches.iter().take(k).cloned().collect())
    }

    async fn add(&self, _entry: IndexEntry) -> Result<InsertOutcome, RetrievalError> {
        Ok(InsertOutcome::AlreadyExists)
    }

    async fn contains(&self, id: &DocumentId) -> Result<bool, RetrievalError> {
        Ok(self.matches.iter().any(|m| &m.id == id))
    }

    async fn count(&self) -> Result<usize, RetrievalError> {
        Ok(self.matches.len())
    }
}

/// Index whose backend is down.
pub struct FailingIndex;

#[async_trait]
impl SimilarityIndex for FailingIndex {
    fn name(&self) -> &str {
        "failing"
    }

    async fn search(&self, _query: &str, _k: usize) -> Result<Vec<SimilarityMatch>, RetrievalError> {
        Err(RetrievalError::IndexUnavailable("connection refused".into()))
    }

    async fn add(&self, _entry: IndexEntry) -> Result<InsertOutcome, RetrievalError> {
        Err(RetrievalError::IndexUnavailable("connection refused".into()))
    }

    async fn contains(&self, _id: &DocumentId) -> Result<bool, RetrievalError> {
        Err(RetrievalError::IndexUnavailable("connection refused".into()))
    }

    async fn count(&self) -> Result<usize, RetrievalError> {
        Err(RetrievalError::IndexUnavailable("connection refused".into()))
    }
}

/// Fixed set of records.
pub struct StaticStore {
    records: Vec<DocumentRecord>,
}

impl StaticStore {
    pub fn new(values: Vec<serde_json::Value>) -> Self {
        Self {
            records: values
                .into_iter()
                .filter_map(DocumentRecord::from_value)
                .collect(),
        }
    }
}

#[async_trait]
impl DocumentStore for StaticStore {
    fn name(&self) -> &str {
        "static"
    }

    async fn fetch(&self, ids: &[DocumentId]) -> Result<Vec<DocumentRecord>, RetrievalError> {
        Ok(self
            .records
            .iter()
            .filter(|r| r.id().is_some_and(|id| ids.contains(&id)))
            .cloned()
            .collect())
    }

    async fn insert(&self, _record: DocumentRecord) -> Result<InsertOutcome, RetrievalError> {
        Ok(InsertOutcome::AlreadyExists)
    }

    async fn count(&self) -> Result<usize, RetrievalError> {
        Ok(self.records.len())
    }
}

/// Store whose backend is down.
pub struct FailingStore;

#[async_trait]
impl DocumentStore for FailingStore {
    fn name(&self) -> &str {
        "failing"
    }

    async fn fetch(&self, _ids: &[DocumentId]) -> Result<Vec<DocumentRecord>, RetrievalError> {
        Err(RetrievalError::StoreUnavailable("connection refused".into()))
    }

    async fn insert(&self, _record: DocumentRecord) -> Result<InsertOutcome, RetrievalError> {
        Err(RetrievalError::StoreUnavailable("connection refused".into()))
    }

    async fn count(&self) -> Result<usize, RetrievalError> {
        Err(RetrievalError::StoreUnavailable("connection refused".into()))
    }
}
