//! Append-only chat log.
//!
//! Local messages are appended the moment the user sends them, before the
//! transport confirms anything (optimistic echo — the local device is
//! authoritative for its own messages). Remote messages are appended in
//! transport delivery order. Nothing is deduplicated, reordered, or
//! removed: ordering is inherited from the channel's in-order contract.

use crate::utils::time::format_timestamp_now;

/// Which side of the session a message came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Local,
    Remote,
}

/// One chat message, never mutated after append.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub origin: Origin,
    pub text: String,
    /// Wall-clock `HH:MM` (UTC), captured at append time.
    pub timestamp: String,
}

/// Ordered message history for one session.
#[derive(Debug, Default)]
pub struct ChatLog {
    messages: Vec<ChatMessage>,
}

impl ChatLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a locally-sent message and return a copy for display.
    pub fn append_local(&mut self, text: impl Into<String>) -> ChatMessage {
        self.append(Origin::Local, text.into())
    }

    /// Append a message received from the peer and return a copy.
    pub fn append_remote(&mut self, text: impl Into<String>) -> ChatMessage {
        self.append(Origin::Remote, text.into())
    }

    fn append(&mut self, origin: Origin, text: String) -> ChatMessage {
        let msg = ChatMessage {
            origin,
            text,
            timestamp: format_timestamp_now(),
        };
        self.messages.push(msg.clone());
        msg
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }
}
