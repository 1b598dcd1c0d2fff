//! Append-only conversation history.
//!
//! Turns are only ever pushed at the end. Callers get shared slices; there
//! is no API to edit, remove or reorder a turn.

use niva_core::types::{ConversationTurn, TurnIdGenerator};

use crate::response::AssistantReply;

#[derive(Debug, Default)]
pub struct ConversationHistory {
    turns: Vec<ConversationTurn>,
    ids: TurnIdGenerator,
}

impl ConversationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append_user(&mut self, text: impl Into<String>) -> &ConversationTurn {
        let turn = ConversationTurn::user(self.ids.next_id(), text);
        self.push(turn)
    }

    pub fn append_assistant(&mut self, reply: AssistantReply) -> &ConversationTurn {
        let turn = reply.into_turn(self.ids.next_id());
        self.push(turn)
    }

    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    pub fn last(&self) -> Option<&ConversationTurn> {
        self.turns.last()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    fn push(&mut self, turn: ConversationTurn) -> &ConversationTurn {
        tracing::trace!(id = %turn.id, role = %turn.role, "Turn appended");
        self.turns.push(turn);
        &self.turns[self.turns.len() - 1]
    }
}
