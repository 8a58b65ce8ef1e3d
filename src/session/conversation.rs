//! Append-only conversation log

use chrono::NaiveDateTime;
use serde::Serialize;

/// Who produced a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    User,
    Assistant,
}

/// One message in the conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConversationTurn {
    pub text: String,
    pub speaker: Speaker,
    /// Local wall-clock time the message was appended
    pub timestamp: NaiveDateTime,
}

/// Ordered message history
///
/// Turns are only ever appended; the whole log can be cleared at once.
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    turns: Vec<ConversationTurn>,
}

impl Conversation {
    /// Create an empty log
    #[must_use]
    pub const fn new() -> Self {
        Self { turns: Vec::new() }
    }

    /// Append a turn and return a copy of it
    pub fn push(
        &mut self,
        speaker: Speaker,
        text: impl Into<String>,
        timestamp: NaiveDateTime,
    ) -> ConversationTurn {
        let turn = ConversationTurn {
            text: text.into(),
            speaker,
            timestamp,
        };
        self.turns.push(turn.clone());
        turn
    }

    /// All turns in order
    #[must_use]
    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Drop every turn
    pub fn clear(&mut self) {
        self.turns.clear();
    }
}
