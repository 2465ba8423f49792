//! Wire types for the chat backend HTTP contract.
//!
//! Response types use `#[serde(default)]` generously: the backend decorates
//! payloads with stats fields the client does not act on, and older
//! deployments omit some of them.

use serde::{Deserialize, Serialize};

use crate::chat::transcript::Message;

/// Body of `POST /chat` and `POST /chat/stream`.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    /// The user's question, already trimmed.
    pub question: String,
    /// Session to attach the exchange to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    /// Restrict retrieval to one document.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doc_id: Option<String>,
    /// Number of retrieved chunks to feed the model.
    pub top_k: usize,
    /// Number of recent messages pulled from session history.
    pub memory_limit: usize,
    /// Generation cap.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f32,
}

/// Response of the single-shot `POST /chat`.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponse {
    /// The complete assistant reply.
    pub response: String,
    /// Retrieved source chunks the answer was grounded on.
    #[serde(default)]
    pub sources: Vec<serde_json::Value>,
    /// Server-side processing time in seconds.
    #[serde(default)]
    pub processing_time: f64,
    /// Session the exchange was stored under, if any.
    #[serde(default)]
    pub session_id: Option<String>,
}

/// One entry of `GET /chat_sessions`.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionInfo {
    /// Stable session identifier.
    pub session_id: String,
    /// Display title.
    pub title: String,
    /// RFC 3339 creation time.
    #[serde(default)]
    pub created_at: String,
    /// RFC 3339 last-update time.
    #[serde(default)]
    pub updated_at: String,
    /// Number of stored messages.
    #[serde(default)]
    pub message_count: usize,
    /// Free-form session metadata.
    #[serde(default)]
    pub metadata: serde_json::Value,
}

/// Response of `GET /chat_sessions`.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionList {
    /// Sessions, most recently updated first.
    #[serde(default)]
    pub sessions: Vec<SessionInfo>,
}

/// Body of `POST /chat_sessions`.
#[derive(Debug, Clone, Serialize)]
pub struct CreateSessionRequest {
    /// Display title for the new session.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Free-form metadata stored with the session.
    pub metadata: serde_json::Value,
}

/// Response of `GET /chat_sessions/{id}/messages`.
#[derive(Debug, Clone, Deserialize)]
pub struct MessageHistory {
    /// Stored messages in chronological order.
    #[serde(default)]
    pub messages: Vec<Message>,
}

/// One stored document, as returned by the document endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct DocumentInfo {
    /// Stable document identifier.
    pub id: String,
    /// Original file name.
    pub filename: String,
    /// Size in bytes.
    #[serde(default)]
    pub size: u64,
    /// RFC 3339 upload time.
    #[serde(default)]
    pub upload_time: String,
    /// File extension / kind as the backend classified it.
    #[serde(default)]
    pub file_type: String,
    /// Whether the document is selected for retrieval.
    #[serde(default)]
    pub selected: bool,
}

/// Response of `GET /documents`.
#[derive(Debug, Clone, Deserialize)]
pub struct DocumentList {
    /// All stored documents.
    #[serde(default)]
    pub documents: Vec<DocumentInfo>,
    /// Total count.
    #[serde(default)]
    pub total: usize,
}

/// Body of `POST /embed/document/{id}`.
#[derive(Debug, Clone, Serialize)]
pub struct EmbedRequest {
    /// Target chunk size in characters.
    pub chunk_size: usize,
    /// Overlap between consecutive chunks.
    pub chunk_overlap: usize,
}

impl Default for EmbedRequest {
    fn default() -> Self {
        Self {
            chunk_size: 500,
            chunk_overlap: 50,
        }
    }
}

/// Response of `POST /embed/document/{id}`.
#[derive(Debug, Clone, Deserialize)]
pub struct EmbedResponse {
    /// Document that was embedded.
    pub document_id: String,
    /// Number of chunks produced.
    #[serde(default)]
    pub chunks_created: usize,
    /// Number of vectors written to the index.
    #[serde(default)]
    pub vectors_stored: usize,
    /// Server-side processing time in seconds.
    #[serde(default)]
    pub processing_time: f64,
    /// Embedding job status string.
    #[serde(default)]
    pub status: String,
}

/// Response of `GET /health`.
#[derive(Debug, Clone, Deserialize)]
pub struct HealthResponse {
    /// Overall status, `"ok"` when healthy.
    pub status: String,
    /// Human-readable status message.
    #[serde(default)]
    pub message: String,
    /// Backend version string.
    #[serde(default)]
    pub version: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_request_omits_absent_optionals() {
        let body = serde_json::to_value(ChatRequest {
            question: "q".into(),
            session_id: None,
            doc_id: None,
            top_k: 5,
            memory_limit: 5,
            max_tokens: 1000,
            temperature: 0.7,
        })
        .unwrap();

        assert!(body.get("session_id").is_none());
        assert!(body.get("doc_id").is_none());
        assert_eq!(body["top_k"], 5);
    }

    #[test]
    fn session_list_tolerates_missing_fields() {
        let list: SessionList = serde_json::from_str(
            r#"{"sessions":[{"session_id":"s1","title":"First"}]}"#,
        )
        .unwrap();
        assert_eq!(list.sessions.len(), 1);
        assert_eq!(list.sessions[0].message_count, 0);
    }
}
