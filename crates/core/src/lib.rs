//! # ragchat core
//!
//! Domain types, collaborator traits, and error definitions for ragchat,
//! a retrieval-augmented conversational question answering engine.
//! This crate performs **no I/O**; it defines the domain model that the
//! retrieval, provider, and engine crates implement against.
//!
//! ## Design Philosophy
//!
//! Every external collaborator (similarity index, document store, language
//! model) is defined as a trait here. Implementations live in their
//! respective crates. This enables:
//! - Swapping backends via configuration
//! - Testing the engine with scripted collaborators
//! - Clean dependency graph (all crates depend inward on core)

pub mod conversation;
pub mod document;
pub mod error;
pub mod index;
pub mod provider;
pub mod store;

// Re-export key types at crate root for ergonomics
pub use conversation::{ContextCounts, ConversationSummary, ConversationTurn, SessionId};
pub use document::{
    DocumentId, DocumentRecord, FusedContextItem, IDENTIFIER_FIELD, InsertOutcome,
    KEYWORDS_FIELD, SUMMARY_FIELD, SimilarityMatch,
};
pub use error::{Error, ProviderError, Result, RetrievalError};
pub use index::{IndexEntry, ScoreOrder, SimilarityIndex};
pub use provider::{
    EmbeddingRequest, EmbeddingResponse, Provider, ProviderRequest, ProviderResponse, Usage,
};
pub use store::DocumentStore;
