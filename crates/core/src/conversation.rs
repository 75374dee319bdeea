//! Conversation domain types.
//!
//! A [`ConversationTurn`] is the atomic unit of session history: one
//! query/response pair plus the retrieval counts that produced it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a chat session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How much retrieved context fed a turn.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextCounts {
    /// Similarity matches returned by the index.
    pub vector_count: usize,
    /// Document records that survived fusion.
    pub document_count: usize,
}

/// One completed exchange. Immutable after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub timestamp: DateTime<Utc>,
    pub query: String,
    pub response: String,
    pub context_counts: ContextCounts,
}

impl ConversationTurn {
    /// Create a turn stamped with the current time.
    pub fn new(
        query: impl Into<String>,
        response: impl Into<String>,
        context_counts: ContextCounts,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            query: query.into(),
            response: response.into(),
            context_counts,
        }
    }
}

/// Snapshot of a session's full stored history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationSummary {
    pub total_turns: usize,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub full_log: Vec<ConversationTurn>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_ids_are_unique() {
        assert_ne!(SessionId::new(), SessionId::new());
    }

    #[test]
    fn turn_serialization() {
        let turn = ConversationTurn::new(
            "How do I block domains?",
            "Use the domain blocklist setting.",
            ContextCounts {
                vector_count: 5,
                document_count: 4,
            },
        );
        let json = serde_json::to_string(&turn).unwrap();
        assert!(json.contains("block domains"));
        assert!(json.contains("\"vector_count\":5"));
        assert!(json.contains("\"document_count\":4"));
    }
}
