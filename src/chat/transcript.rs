//! Chat transcript data model.
//!
//! A [`Transcript`] is the append-only, chronologically ordered message
//! history of one chat session as the client sees it. The reply currently
//! being streamed is deliberately *not* part of it: the consumer keeps
//! that draft separately and commits it as a complete [`Message`] only when
//! its stream ends normally, so the transcript never contains a partial
//! assistant message.

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Role of a message author.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// The person asking.
    User,
    /// The model answering.
    Assistant,
}

/// One committed chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Author role.
    pub role: MessageRole,
    /// Full message text.
    pub content: String,
    /// RFC 3339 creation time.
    pub timestamp: String,
}

impl Message {
    /// Create a user message stamped with the current time.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self::stamped(MessageRole::User, content)
    }

    /// Create an assistant message stamped with the current time.
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::stamped(MessageRole::Assistant, content)
    }

    fn stamped(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

/// Append-only ordered message sequence for one chat session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    /// Create an empty transcript.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message, preserving insertion order.
    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Remove and return the most recent message.
    ///
    /// Used for exactly one thing: undoing the optimistically appended user
    /// message after a failed send.
    pub fn rollback_last(&mut self) -> Option<Message> {
        self.messages.pop()
    }

    /// Replace the whole history, e.g. when switching sessions.
    pub fn replace_all(&mut self, messages: Vec<Message>) {
        self.messages = messages;
    }

    /// All messages in insertion order.
    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Number of committed messages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether the transcript holds no messages.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// The most recent message, if any.
    #[must_use]
    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_preserves_order() {
        let mut transcript = Transcript::new();
        transcript.push(Message::user("first"));
        transcript.push(Message::assistant("second"));
        transcript.push(Message::user("third"));

        let contents: Vec<&str> = transcript
            .messages()
            .iter()
            .map(|m| m.content.as_str())
            .collect();
        assert_eq!(contents, ["first", "second", "third"]);
    }

    #[test]
    fn rollback_removes_only_the_last_entry() {
        let mut transcript = Transcript::new();
        transcript.push(Message::user("kept"));
        transcript.push(Message::user("speculative"));

        let removed = transcript.rollback_last().unwrap();
        assert_eq!(removed.content, "speculative");
        assert_eq!(transcript.len(), 1);
        assert_eq!(transcript.last().unwrap().content, "kept");
    }

    #[test]
    fn rollback_on_empty_is_a_no_op() {
        let mut transcript = Transcript::new();
        assert!(transcript.rollback_last().is_none());
        assert!(transcript.is_empty());
    }

    #[test]
    fn wire_roundtrip_uses_lowercase_roles() {
        let json = serde_json::to_value(Message {
            role: MessageRole::Assistant,
            content: "hi".into(),
            timestamp: "2025-01-01T00:00:00Z".into(),
        })
        .unwrap();
        assert_eq!(json["role"], "assistant");

        let parsed: Message =
            serde_json::from_str(r#"{"role":"user","content":"q","timestamp":"t"}"#).unwrap();
        assert_eq!(parsed.role, MessageRole::User);
    }
}
