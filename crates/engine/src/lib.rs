//! The ragchat engine: retrieval fusion, conversation history, prompt
//! assembly and the chat session that ties them together.
//!
//! A turn runs **Retrieve → Compose → Generate**:
//!
//! 1. **Retrieve** similarity matches and the documents they point at
//! 2. **Fuse** them into one ranked, deduplicated context list
//! 3. **Compose** the prompt from context, history window and question
//! 4. **Generate** with the configured language model
//! 5. **Append** the turn to the session's history

pub mod fusion;
pub mod history;
pub mod prompt;
pub mod session;

#[cfg(test)]
mod test_helpers;

pub use fusion::{fuse, fuse_with_order};
pub use history::ConversationHistory;
pub use prompt::assemble;
pub use session::{ChatContext, ChatResult, ChatSession, Retrieved, SessionSettings, SessionState};
