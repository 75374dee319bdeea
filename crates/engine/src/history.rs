//! Conversation history: the full turn log of one session.
//!
//! Storage is unbounded; only rendering is windowed.

use ragchat_core::conversation::{ConversationSummary, ConversationTurn};

/// Ordered log of completed turns. Only [`append`](Self::append) and
/// [`reset`](Self::reset) mutate it.
#[derive(Debug, Clone, Default)]
pub struct ConversationHistory {
    turns: Vec<ConversationTurn>,
}

impl ConversationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, turn: ConversationTurn) {
        self.turns.push(turn);
    }

    /// Transcript of the last `max_turns` turns, oldest first.
    ///
    /// Each turn renders as a `Human:` line followed by an `Assistant:` line.
    pub fn render(&self, max_turns: usize) -> String {
        let start = self.turns.len().saturating_sub(max_turns);
        self.turns[start..]
            .iter()
            .flat_map(|turn| {
                [
                    format!("Human: {}", turn.query),
                    format!("Assistant: {}", turn.response),
                ]
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn reset(&mut self) {
        self.turns.clear();
    }

    pub fn summary(&self) -> ConversationSummary {
        ConversationSummary {
            total_turns: self.turns.len(),
            start_time: self.turns.first().map(|t| t.timestamp),
            end_time: self.turns.last().map(|t| t.timestamp),
            full_log: self.turns.clone(),
        }
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }
}
