//! Chat session endpoints: listing, creation, deletion, message history.

use crate::error::ChatError;

use super::ApiClient;
use super::types::{CreateSessionRequest, MessageHistory, SessionInfo, SessionList};

impl ApiClient {
    /// List all chat sessions.
    pub async fn list_sessions(&self) -> Result<SessionList, ChatError> {
        self.get("/chat_sessions").await
    }

    /// Create a new session with an optional title.
    pub async fn create_session(&self, title: Option<&str>) -> Result<SessionInfo, ChatError> {
        let request = CreateSessionRequest {
            title: title.map(ToString::to_string),
            metadata: serde_json::json!({}),
        };
        self.post("/chat_sessions", &request).await
    }

    /// Delete a session and its stored messages.
    pub async fn delete_session(&self, session_id: &str) -> Result<(), ChatError> {
        self.delete(&format!("/chat_sessions/{session_id}")).await
    }

    /// Fetch up to `limit` stored messages of a session, oldest first.
    pub async fn session_messages(
        &self,
        session_id: &str,
        limit: usize,
    ) -> Result<MessageHistory, ChatError> {
        self.get(&format!("/chat_sessions/{session_id}/messages?limit={limit}"))
            .await
    }
}
