//! Append-only conversation owned by one review-loop run.

use crate::llm_client::{ChatMessage, ChatRole};

#[derive(Debug, Clone, Default)]
pub struct Conversation {
    turns: Vec<ChatMessage>,
}

impl Conversation {
    pub fn new(initial: Vec<ChatMessage>) -> Self {
        Self { turns: initial }
    }

    pub fn push(&mut self, message: ChatMessage) {
        self.turns.push(message);
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.push(ChatMessage::user(content));
    }

    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.push(ChatMessage::assistant(content));
    }

    pub fn turns(&self) -> &[ChatMessage] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn last(&self) -> Option<&ChatMessage> {
        self.turns.last()
    }

    /// Turns spoken by `role`, oldest first
    pub fn by_role(&self, role: ChatRole) -> impl Iterator<Item = &ChatMessage> {
        self.turns.iter().filter(move |m| m.role == role)
    }
}
