//! Chat session controller: drives one retrieval-augmented exchange.
//!
//! # Flow
//!
//! 1. Reject a blank query before touching any collaborator
//! 2. **Retrieving**: similarity search, then document fetch for the hits
//! 3. **Composing**: fuse, render the history window, assemble the prompt
//! 4. **Generating**: call the language model
//! 5. Append the turn and return to **Idle**
//!
//! Any failure returns the session to Idle without touching history.
//! `chat` takes `&mut self`, so calls on one session are serialized by the
//! borrow checker; share a session across tasks behind a
//! `tokio::sync::Mutex`.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use ragchat_config::AppConfig;
use ragchat_core::conversation::{ContextCounts, ConversationSummary, ConversationTurn, SessionId};
use ragchat_core::document::{DocumentRecord, FusedContextItem, SimilarityMatch};
use ragchat_core::error::{Error, ProviderError, Result, RetrievalError};
use ragchat_core::index::SimilarityIndex;
use ragchat_core::provider::{Provider, ProviderRequest};
use ragchat_core::store::DocumentStore;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::fusion;
use crate::history::ConversationHistory;
use crate::prompt;

/// Where an exchange currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    Retrieving,
    Composing,
    Generating,
}

/// Tunables for a session.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    /// Turns rendered into each prompt.
    pub history_window: usize,
    /// Default `k` for [`ChatSession::chat_with_defaults`].
    pub num_results: usize,
    pub retrieval_timeout: Option<Duration>,
    pub generation_timeout: Option<Duration>,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            model: "llama3.1".into(),
            temperature: 0.2,
            max_tokens: None,
            history_window: 5,
            num_results: 5,
            retrieval_timeout: None,
            generation_timeout: None,
        }
    }
}

impl SessionSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        let timeout = |secs: u64| (secs > 0).then(|| Duration::from_secs(secs));
        Self {
            model: config.default_model.clone(),
            temperature: config.default_temperature,
            max_tokens: Some(config.default_max_tokens),
            history_window: config.chat.history_window,
            num_results: config.chat.num_results,
            retrieval_timeout: timeout(config.chat.retrieval_timeout_secs),
            generation_timeout: timeout(config.chat.generation_timeout_secs),
        }
    }
}

/// Retrieved material behind a response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatContext {
    pub vector_results: Vec<SimilarityMatch>,
    /// The fused context: one item per matched document, best first.
    pub document_results: Vec<FusedContextItem>,
}

/// Result of one successful exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResult {
    pub query: String,
    pub response: String,
    pub context: ChatContext,
}

/// Output of retrieval + fusion, without generation.
#[derive(Debug, Clone)]
pub struct Retrieved {
    pub matches: Vec<SimilarityMatch>,
    pub records: Vec<DocumentRecord>,
    pub fused: Vec<FusedContextItem>,
}

/// One conversation against a similarity index, document store and model.
pub struct ChatSession {
    id: SessionId,
    index: Arc<dyn SimilarityIndex>,
    store: Arc<dyn DocumentStore>,
    provider: Arc<dyn Provider>,
    settings: SessionSettings,
    history: ConversationHistory,
    state: SessionState,
}

impl ChatSession {
    pub fn new(
        index: Arc<dyn SimilarityIndex>,
        store: Arc<dyn DocumentStore>,
        provider: Arc<dyn Provider>,
        settings: SessionSettings,
    ) -> Self {
        Self {
            id: SessionId::new(),
            index,
            store,
            provider,
            settings,
            history: ConversationHistory::new(),
            state: SessionState::Idle,
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    pub fn history(&self) -> &ConversationHistory {
        &self.history
    }

    /// Run one exchange with `num_results` similarity hits.
    pub async fn chat(&mut self, query: &str, num_results: usize) -> Result<ChatResult> {
        if query.trim().is_empty() {
            return Err(Error::Validation("query must not be empty".into()));
        }

        let outcome = self.exchange(query, num_results).await;
        self.transition(SessionState::Idle);

        if let Err(e) = &outcome {
            warn!(session = %self.id, error = %e, "Chat exchange failed");
        }
        outcome
    }

    /// [`chat`](Self::chat) with the configured result count.
    pub async fn chat_with_defaults(&mut self, query: &str) -> Result<ChatResult> {
        let k = self.settings.num_results;
        self.chat(query, k).await
    }

    /// Similarity search, document fetch and fusion only.
    pub async fn retrieve(&self, query: &str, num_results: usize) -> Result<Retrieved> {
        retrieve(
            self.index.as_ref(),
            self.store.as_ref(),
            query,
            num_results,
            self.settings.retrieval_timeout,
        )
        .await
    }

    pub fn reset(&mut self) {
        self.history.reset();
        info!(session = %self.id, "Conversation history cleared");
    }

    pub fn summary(&self) -> ConversationSummary {
        self.history.summary()
    }

    async fn exchange(&mut self, query: &str, num_results: usize) -> Result<ChatResult> {
        self.transition(SessionState::Retrieving);
        let (matches, records) = search_and_fetch(
            self.index.as_ref(),
            self.store.as_ref(),
            query,
            num_results,
            self.settings.retrieval_timeout,
        )
        .await?;

        self.transition(SessionState::Composing);
        let fused = fusion::fuse_with_order(&matches, records, self.index.score_order());
        let history_text = self.history.render(self.settings.history_window);
        let prompt = prompt::assemble(&fused, &history_text, query);

        self.transition(SessionState::Generating);
        let response = self.generate(prompt).await?;

        let counts = ContextCounts {
            vector_count: matches.len(),
            document_count: fused.len(),
        };
        self.history
            .append(ConversationTurn::new(query, response.clone(), counts));

        info!(
            session = %self.id,
            vector_count = counts.vector_count,
            document_count = counts.document_count,
            turns = self.history.len(),
            "Chat exchange complete"
        );

        Ok(ChatResult {
            query: query.to_string(),
            response,
            context: ChatContext {
                vector_results: matches,
                document_results: fused,
            },
        })
    }

    async fn generate(&self, prompt: String) -> Result<String> {
        let mut request = ProviderRequest::new(&self.settings.model, prompt);
        request.temperature = self.settings.temperature;
        request.max_tokens = self.settings.max_tokens;

        debug!(model = %self.settings.model, prompt_len = request.prompt.len(), "Invoking language model");

        let response = within(
            self.settings.generation_timeout,
            self.provider.complete(request),
            |limit| ProviderError::Timeout(format!("generation timed out after {limit:?}")),
        )
        .await?;

        Ok(response.content)
    }

    fn transition(&mut self, next: SessionState) {
        if self.state != next {
            debug!(session = %self.id, from = ?self.state, to = ?next, "Session state");
            self.state = next;
        }
    }
}

/// Search, fetch and fuse against a pair of collaborators.
pub async fn retrieve(
    index: &dyn SimilarityIndex,
    store: &dyn DocumentStore,
    query: &str,
    num_results: usize,
    timeout: Option<Duration>,
) -> Result<Retrieved> {
    let (matches, records) = search_and_fetch(index, store, query, num_results, timeout).await?;
    let fused = fusion::fuse_with_order(&matches, records.clone(), index.score_order());

    debug!(
        index = index.name(),
        store = store.name(),
        matches = matches.len(),
        records = records.len(),
        fused = fused.len(),
        "Retrieval fused"
    );

    Ok(Retrieved {
        matches,
        records,
        fused,
    })
}

/// Similarity search, then a fetch of the matched documents.
async fn search_and_fetch(
    index: &dyn SimilarityIndex,
    store: &dyn DocumentStore,
    query: &str,
    num_results: usize,
    timeout: Option<Duration>,
) -> Result<(Vec<SimilarityMatch>, Vec<DocumentRecord>)> {
    let matches = within(timeout, index.search(query, num_results), |limit| {
        RetrievalError::Timeout {
            operation: "similarity search".into(),
            timeout: limit,
        }
    })
    .await?;

    let ids = fusion::match_ids(&matches);
    let records = if ids.is_empty() {
        Vec::new()
    } else {
        within(timeout, store.fetch(&ids), |limit| RetrievalError::Timeout {
            operation: "document fetch".into(),
            timeout: limit,
        })
        .await?
    };

    debug!(
        index = index.name(),
        store = store.name(),
        matches = matches.len(),
        records = records.len(),
        "Retrieval complete"
    );

    Ok((matches, records))
}

/// Await `fut`, bounded by `limit` when one is set.
async fn within<T, E, F>(
    limit: Option<Duration>,
    fut: F,
    on_timeout: impl FnOnce(Duration) -> E,
) -> std::result::Result<T, E>
where
    F: Future<Output = std::result::Result<T, E>>,
{
    match limit {
        Some(limit) => tokio::time::timeout(limit, fut)
            .await
            .unwrap_or_else(|_| Err(on_timeout(limit))),
        None => fut.await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::*;
    use ragchat_core::document::DocumentId;
    use serde_json::json;

    fn docs() -> Vec<serde_json::Value> {
        vec![
            json!({"document_id": "a", "summary": "Alpha form", "key_words": ["alpha"]}),
            json!({"document_id": "b", "summary": "Beta form", "key_words": ["beta"]}),
        ]
    }

    fn session_with(provider: Arc<dyn Provider>) -> ChatSession {
        ChatSession::new(
            Arc::new(StaticIndex::new(vec![
                SimilarityMatch::new("b", "beta snippet", 0.4),
                SimilarityMatch::new("a", "alpha snippet", 0.1),
            ])),
            Arc::new(StaticStore::new(docs())),
            provider,
            SessionSettings::default(),
        )
    }

    #[tokio::test]
    async fn successful_chat_appends_turn() {
        let provider = Arc::new(ScriptedProvider::new(vec!["Hello!"]));
        let mut session = session_with(provider.clone());

        let result = session.chat("What forms exist?", 5).await.unwrap();

        assert_eq!(result.query, "What forms exist?");
        assert_eq!(result.response, "Hello!");
        assert_eq!(result.context.vector_results.len(), 2);
        assert_eq!(result.context.document_results.len(), 2);
        assert_eq!(session.state(), SessionState::Idle);

        let summary = session.summary();
        assert_eq!(summary.total_turns, 1);
        assert_eq!(summary.full_log[0].context_counts.vector_count, 2);
        assert_eq!(summary.full_log[0].context_counts.document_count, 2);
    }

    #[tokio::test]
    async fn prompt_contains_fused_context_best_first() {
        let provider = Arc::new(ScriptedProvider::new(vec!["ok"]));
        let mut session = session_with(provider.clone());
        session.chat("forms?", 5).await.unwrap();

        let prompt = provider.prompts().remove(0);
        let alpha = prompt.find("alpha snippet").unwrap();
        let beta = prompt.find("beta snippet").unwrap();
        assert!(alpha < beta);
        assert!(prompt.contains("Current Question: forms?"));
    }

    #[tokio::test]
    async fn history_flows_into_later_prompts() {
        let provider = Arc::new(ScriptedProvider::new(vec!["first answer", "second answer"]));
        let mut session = session_with(provider.clone());

        session.chat("first question", 5).await.unwrap();
        session.chat("second question", 5).await.unwrap();

        let prompts = provider.prompts();
        assert!(prompts[0].contains("Conversation History:\n\n"));
        assert!(prompts[1].contains("Human: first question\nAssistant: first answer"));
        assert!(!prompts[1].contains("Human: second question"));
    }

    #[tokio::test]
    async fn history_window_limits_rendered_turns() {
        let answers: Vec<String> = (1..=4).map(|i| format!("r{i}")).collect();
        let provider = Arc::new(ScriptedProvider::new(answers));
        let mut session = session_with(provider.clone());
        session.settings.history_window = 2;

        for i in 1..=4 {
            session.chat(&format!("q{i}"), 3).await.unwrap();
        }

        let last = provider.prompts().pop().unwrap();
        assert!(!last.contains("Human: q1"));
        assert!(last.contains("Human: q2\nAssistant: r2\nHuman: q3\nAssistant: r3"));
        assert_eq!(session.summary().total_turns, 4);
    }

    #[tokio::test]
    async fn blank_query_is_validation_error_without_calls() {
        let provider = Arc::new(ScriptedProvider::new(Vec::<String>::new()));
        let index = Arc::new(StaticIndex::new(vec![]));
        let mut session = ChatSession::new(
            index.clone(),
            Arc::new(StaticStore::new(vec![])),
            provider.clone(),
            SessionSettings::default(),
        );

        let err = session.chat("   \t", 5).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert_eq!(index.searches(), 0);
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn generation_failure_leaves_history_untouched() {
        let mut session = session_with(Arc::new(ScriptedProvider::new(vec!["one"])));
        session.chat("q1", 5).await.unwrap();

        session.provider = Arc::new(FailingProvider);
        let err = session.chat("q2", 5).await.unwrap_err();

        assert!(matches!(err, Error::Generation(_)));
        assert_eq!(session.summary().total_turns, 1);
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[tokio::test]
    async fn retrieval_failure_is_typed_and_skips_generation() {
        let provider = Arc::new(ScriptedProvider::new(vec!["never"]));
        let mut session = ChatSession::new(
            Arc::new(FailingIndex),
            Arc::new(StaticStore::new(docs())),
            provider.clone(),
            SessionSettings::default(),
        );

        let err = session.chat("q", 5).await.unwrap_err();
        assert!(matches!(err, Error::Retrieval(RetrievalError::IndexUnavailable(_))));
        assert_eq!(provider.call_count(), 0);
        assert_eq!(session.summary().total_turns, 0);
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[tokio::test]
    async fn store_failure_is_retrieval_error() {
        let mut session = ChatSession::new(
            Arc::new(StaticIndex::new(vec![SimilarityMatch::new("a", "", 0.1)])),
            Arc::new(FailingStore),
            Arc::new(ScriptedProvider::new(vec!["never"])),
            SessionSettings::default(),
        );

        let err = session.chat("q", 5).await.unwrap_err();
        assert!(matches!(err, Error::Retrieval(RetrievalError::StoreUnavailable(_))));
        assert_eq!(session.summary().total_turns, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_model_times_out_without_appending() {
        let mut session = session_with(Arc::new(SlowProvider(Duration::from_secs(60))));
        session.settings.generation_timeout = Some(Duration::from_secs(5));

        let err = session.chat("q", 5).await.unwrap_err();
        assert!(matches!(err, Error::Generation(ProviderError::Timeout(_))));
        assert_eq!(session.summary().total_turns, 0);
    }

    #[tokio::test]
    async fn missing_documents_are_dropped_not_errors() {
        let provider = Arc::new(ScriptedProvider::new(vec!["ok"]));
        let mut session = ChatSession::new(
            Arc::new(StaticIndex::new(vec![
                SimilarityMatch::new("a", "", 0.1),
                SimilarityMatch::new("ghost", "", 0.2),
            ])),
            Arc::new(StaticStore::new(docs())),
            provider,
            SessionSettings::default(),
        );

        let result = session.chat("q", 5).await.unwrap();
        assert_eq!(result.context.vector_results.len(), 2);
        assert_eq!(result.context.document_results.len(), 1);
        assert_eq!(session.summary().full_log[0].context_counts.document_count, 1);
    }

    #[tokio::test]
    async fn document_results_are_the_fused_context() {
        let b = json!({"document_id": "b", "summary": "Beta form"});
        let a = json!({"document_id": "a", "summary": "Alpha form"});
        let mut session = ChatSession::new(
            Arc::new(StaticIndex::new(vec![
                SimilarityMatch::new("b", "beta snippet", 0.4),
                SimilarityMatch::new("a", "alpha snippet", 0.1),
            ])),
            // Store order, with a duplicate record for "a".
            Arc::new(StaticStore::new(vec![b, a.clone(), a])),
            Arc::new(ScriptedProvider::new(vec!["ok"])),
            SessionSettings::default(),
        );

        let result = session.chat("forms?", 5).await.unwrap();

        let ids: Vec<DocumentId> = result
            .context
            .document_results
            .iter()
            .filter_map(|item| item.id())
            .collect();
        assert_eq!(ids, vec![DocumentId::new("a"), DocumentId::new("b")]);
        assert_eq!(result.context.document_results[0].snippet, "alpha snippet");
        assert_eq!(result.context.document_results[0].score, 0.1);

        let turn = &session.summary().full_log[0];
        assert_eq!(turn.context_counts.document_count, result.context.document_results.len());
    }

    #[tokio::test(start_paused = true)]
    async fn sub_second_timeout_is_reported_precisely() {
        let mut session = session_with(Arc::new(SlowProvider(Duration::from_secs(60))));
        session.settings.generation_timeout = Some(Duration::from_millis(500));

        let err = session.chat("q", 5).await.unwrap_err();
        assert!(err.to_string().contains("500ms"), "{err}");
    }

    #[tokio::test]
    async fn num_results_is_passed_to_index() {
        let index = Arc::new(StaticIndex::new(vec![
            SimilarityMatch::new("a", "", 0.1),
            SimilarityMatch::new("b", "", 0.2),
        ]));
        let mut session = ChatSession::new(
            index.clone(),
            Arc::new(StaticStore::new(docs())),
            Arc::new(ScriptedProvider::new(vec!["ok"])),
            SessionSettings::default(),
        );

        let result = session.chat("q", 1).await.unwrap();
        assert_eq!(result.context.vector_results.len(), 1);
        assert_eq!(index.last_k(), Some(1));
    }

    #[tokio::test]
    async fn reset_clears_history_between_exchanges() {
        let provider = Arc::new(ScriptedProvider::new(vec!["one", "two"]));
        let mut session = session_with(provider.clone());

        session.chat("remember me", 5).await.unwrap();
        session.reset();
        assert_eq!(session.summary().total_turns, 0);

        session.chat("fresh start", 5).await.unwrap();
        assert!(!provider.prompts()[1].contains("remember me"));
    }

    #[tokio::test]
    async fn retrieve_only_does_not_touch_history() {
        let session = session_with(Arc::new(ScriptedProvider::new(Vec::<String>::new())));
        let retrieved = session.retrieve("forms", 5).await.unwrap();
        let ids: Vec<DocumentId> = retrieved.fused.iter().filter_map(|f| f.id()).collect();
        assert_eq!(ids, vec![DocumentId::new("a"), DocumentId::new("b")]);
        assert_eq!(session.summary().total_turns, 0);
    }

    #[test]
    fn settings_from_config() {
        let mut config = AppConfig::default();
        config.chat.history_window = 3;
        config.chat.generation_timeout_secs = 0;

        let settings = SessionSettings::from_config(&config);
        assert_eq!(settings.model, "llama3.1");
        assert_eq!(settings.history_window, 3);
        assert_eq!(settings.num_results, 5);
        assert_eq!(settings.retrieval_timeout, Some(Duration::from_secs(30)));
        assert!(settings.generation_timeout.is_none());
    }

    #[test]
    fn chat_result_serializes_with_context_keys() {
        let result = ChatResult {
            query: "q".into(),
            response: "r".into(),
            context: ChatContext {
                vector_results: vec![SimilarityMatch::new("a", "s", 0.1)],
                document_results: vec![],
            },
        };
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["context"]["vector_results"][0]["id"], "a");
        assert!(value["context"]["document_results"].as_array().unwrap().is_empty());
    }
}
