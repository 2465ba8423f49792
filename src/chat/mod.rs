//! The streaming chat consumer.
//!
//! [`ChatView`] owns the client-side state of one chat session: the
//! committed transcript, the assistant reply currently being streamed, and
//! the single-flight send machinery. It publishes an immutable
//! [`ChatSnapshot`] on every state transition through a `watch` channel;
//! rendering is the subscriber's problem.
//!
//! # Send lifecycle
//!
//! ```text
//! Idle -> Sending    user message appended optimistically, view is busy
//! Sending -> Streaming   response stream opened, empty reply draft created
//! Streaming -> Streaming  token frame: draft grows, snapshot published
//! Streaming -> Idle   end frame: draft committed to the transcript
//! Streaming -> Idle   error frame / transport failure: user message rolled back
//! Streaming -> Idle   cancel(): draft discarded, user message kept
//! Sending -> Idle     request establishment failed: user message rolled back
//! ```
//!
//! The rollback asymmetry is deliberate: a server or transport failure
//! means the exchange never happened, so the speculative user message is
//! removed; cancellation is the user changing their mind, and what they
//! said stays.
//!
//! Only one send may be outside `Idle` at a time per view. A second send
//! attempt is refused with [`ChatError::Busy`] before any I/O. Cancellation
//! is cooperative: [`ChatView::cancel`] trips a token that the send
//! observes at every await point, at latest before the next chunk.

pub mod transcript;

use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use futures::StreamExt;

use crate::api::ApiClient;
use crate::api::types::ChatRequest;
use crate::error::ChatError;
use crate::events::StreamEvent;

use self::transcript::{Message, Transcript};

/// Generation and retrieval knobs sent with every chat request.
#[derive(Debug, Clone)]
pub struct ChatTuning {
    /// Number of retrieved chunks to feed the model.
    pub top_k: usize,
    /// Number of recent messages pulled from session history.
    pub memory_limit: usize,
    /// Generation cap.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f32,
}

impl Default for ChatTuning {
    fn default() -> Self {
        Self {
            top_k: 5,
            memory_limit: 5,
            max_tokens: 1000,
            temperature: 0.7,
        }
    }
}

/// Where the view currently stands in the send lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SendPhase {
    /// No send outstanding.
    #[default]
    Idle,
    /// User message appended, request being established.
    Sending,
    /// Response stream open, reply accumulating.
    Streaming,
}

/// Immutable view of the chat state, published on every transition.
#[derive(Debug, Clone, Default)]
pub struct ChatSnapshot {
    /// Send lifecycle phase.
    pub phase: SendPhase,
    /// Session the view is bound to.
    pub session_id: Option<String>,
    /// Committed transcript, in order.
    pub messages: Vec<Message>,
    /// The assistant reply under construction, if a stream is open. Never
    /// present in `messages`; it is committed there only when complete.
    pub streaming: Option<Message>,
    /// Retrieved-source count reported by the current stream's `start`
    /// frame, if one arrived.
    pub sources_count: Option<usize>,
    /// Message of the last failed send, cleared when a new send begins.
    pub last_error: Option<String>,
}

#[derive(Debug)]
struct ChatState {
    session_id: Option<String>,
    transcript: Transcript,
    streaming: Option<Message>,
    phase: SendPhase,
    sources_count: Option<usize>,
    last_error: Option<String>,
    cancel: Option<CancellationToken>,
}

impl ChatState {
    fn snapshot(&self) -> ChatSnapshot {
        ChatSnapshot {
            phase: self.phase,
            session_id: self.session_id.clone(),
            messages: self.transcript.messages().to_vec(),
            streaming: self.streaming.clone(),
            sources_count: self.sources_count,
            last_error: self.last_error.clone(),
        }
    }
}

#[derive(Debug)]
struct ChatViewInner {
    api: ApiClient,
    tuning: ChatTuning,
    state: Mutex<ChatState>,
    updates: watch::Sender<ChatSnapshot>,
}

/// Client-side view of one chat session. Cheap to clone; clones share
/// state, so one clone can [`cancel`](ChatView::cancel) a send another
/// clone is awaiting.
#[derive(Debug, Clone)]
pub struct ChatView {
    inner: Arc<ChatViewInner>,
}

impl ChatView {
    /// Create a view with no session bound yet.
    #[must_use]
    pub fn new(api: ApiClient, tuning: ChatTuning) -> Self {
        let state = ChatState {
            session_id: None,
            transcript: Transcript::new(),
            streaming: None,
            phase: SendPhase::Idle,
            sources_count: None,
            last_error: None,
            cancel: None,
        };
        let (updates, _) = watch::channel(state.snapshot());

        Self {
            inner: Arc::new(ChatViewInner {
                api,
                tuning,
                state: Mutex::new(state),
                updates,
            }),
        }
    }

    /// Subscribe to state snapshots. The receiver always holds the latest
    /// published snapshot; every transition publishes exactly one.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ChatSnapshot> {
        self.inner.updates.subscribe()
    }

    /// The latest state snapshot.
    #[must_use]
    pub fn snapshot(&self) -> ChatSnapshot {
        self.lock().snapshot()
    }

    /// The session this view is bound to.
    #[must_use]
    pub fn session_id(&self) -> Option<String> {
        self.lock().session_id.clone()
    }

    /// Bind the view to a session, clearing the local transcript. Refused
    /// while a send is outstanding.
    pub fn set_session(&self, session_id: impl Into<String>) -> Result<(), ChatError> {
        {
            let mut state = self.lock();
            if state.phase != SendPhase::Idle {
                return Err(ChatError::Busy);
            }
            state.session_id = Some(session_id.into());
            state.transcript.replace_all(Vec::new());
            state.streaming = None;
            state.sources_count = None;
            state.last_error = None;
        }
        self.publish();
        Ok(())
    }

    /// Replace the local transcript with the session's stored history.
    pub async fn load_history(&self, limit: usize) -> Result<(), ChatError> {
        let session_id = {
            let state = self.lock();
            if state.phase != SendPhase::Idle {
                return Err(ChatError::Busy);
            }
            state
                .session_id
                .clone()
                .ok_or_else(|| ChatError::Validation("no session selected".to_string()))?
        };

        let history = self.inner.api.session_messages(&session_id, limit).await?;
        {
            let mut state = self.lock();
            // The view may have been rebound while the fetch was in flight.
            if state.session_id.as_deref() == Some(session_id.as_str()) {
                state.transcript.replace_all(history.messages);
            }
        }
        self.publish();
        Ok(())
    }

    /// Bind to a session and pull its stored history in one step.
    pub async fn open_session(
        &self,
        session_id: impl Into<String>,
        history_limit: usize,
    ) -> Result<(), ChatError> {
        self.set_session(session_id)?;
        self.load_history(history_limit).await
    }

    /// Request cancellation of the in-flight send, if any. No-op when idle.
    pub fn cancel(&self) {
        let state = self.lock();
        if let Some(token) = &state.cancel {
            token.cancel();
        }
    }

    /// Send a question and stream the reply token-by-token.
    ///
    /// On success the complete reply has been committed to the transcript;
    /// callers typically refresh session metadata at that point. All other
    /// exits are a [`ChatError`]; see the module docs for which of them
    /// roll back the optimistic user message.
    pub async fn send_streaming(&self, text: &str) -> Result<(), ChatError> {
        let (cancel, question, session_id) = self.begin_send(text)?;
        let outcome = self.run_stream(&question, &session_id, &cancel).await;
        self.settle(outcome)
    }

    /// Send a question through the single-shot endpoint.
    ///
    /// Same contract as [`send_streaming`](Self::send_streaming) minus the
    /// incremental publishes: the reply appears in one transition.
    pub async fn send(&self, text: &str) -> Result<(), ChatError> {
        let (cancel, question, session_id) = self.begin_send(text)?;
        let request = self.request_body(&question, &session_id);

        let outcome = tokio::select! {
            () = cancel.cancelled() => Err(ChatError::Cancelled),
            response = self.inner.api.chat(&request) => response.map(|r| r.response),
        };
        self.settle(outcome)
    }

    /// Validate, mark the view busy, and append the user message, all
    /// before any I/O. Rejections here leave the state untouched.
    fn begin_send(
        &self,
        text: &str,
    ) -> Result<(CancellationToken, String, String), ChatError> {
        let question = text.trim();
        if question.is_empty() {
            return Err(ChatError::Validation(
                "question must not be empty".to_string(),
            ));
        }

        let (token, session_id) = {
            let mut state = self.lock();
            let Some(session_id) = state.session_id.clone() else {
                return Err(ChatError::Validation("no session selected".to_string()));
            };
            if state.phase != SendPhase::Idle {
                return Err(ChatError::Busy);
            }

            let token = CancellationToken::new();
            state.phase = SendPhase::Sending;
            state.cancel = Some(token.clone());
            state.last_error = None;
            state.sources_count = None;
            state.transcript.push(Message::user(question));
            (token, session_id)
        };
        self.publish();

        Ok((token, question.to_string(), session_id))
    }

    /// Close out a send on every exit path: commit or roll back, clear the
    /// reply draft and the busy state, publish the final transition.
    fn settle(&self, outcome: Result<String, ChatError>) -> Result<(), ChatError> {
        {
            let mut state = self.lock();
            state.streaming = None;
            state.cancel = None;
            state.phase = SendPhase::Idle;

            match &outcome {
                Ok(reply) => state.transcript.push(Message::assistant(reply.clone())),
                Err(err) => {
                    if err.rolls_back() {
                        state.transcript.rollback_last();
                    }
                    if !matches!(err, ChatError::Cancelled) {
                        state.last_error = Some(err.to_string());
                    }
                }
            }
        }
        self.publish();
        outcome.map(|_| ())
    }

    /// Drive one streaming exchange to completion, returning the full reply.
    async fn run_stream(
        &self,
        question: &str,
        session_id: &str,
        cancel: &CancellationToken,
    ) -> Result<String, ChatError> {
        let request_id = Uuid::new_v4();
        let request = self.request_body(question, session_id);

        tracing::info!(
            request_id = %request_id,
            session_id = %session_id,
            question_chars = question.len(),
            "opening chat stream"
        );

        let mut events = tokio::select! {
            () = cancel.cancelled() => return Err(ChatError::Cancelled),
            opened = self.inner.api.chat_stream(&request) => opened?,
        };

        // Response is open: the reply draft becomes visible.
        {
            let mut state = self.lock();
            state.phase = SendPhase::Streaming;
            state.streaming = Some(Message::assistant(String::new()));
        }
        self.publish();

        let mut reply = String::new();
        loop {
            let item = tokio::select! {
                () = cancel.cancelled() => return Err(ChatError::Cancelled),
                item = events.next() => item,
            };
            let Some(parsed) = item else {
                // Connection closed with no end frame: the reply is not
                // trustworthy, treat as a transport failure.
                return Err(ChatError::Transport(
                    "stream closed before completion".to_string(),
                ));
            };

            match parsed {
                Ok(StreamEvent::Start { sources_count, .. }) => {
                    tracing::debug!(request_id = %request_id, sources_count, "generation started");
                    self.lock().sources_count = Some(sources_count);
                    self.publish();
                }
                Ok(StreamEvent::Token { content }) => {
                    reply.push_str(&content);
                    {
                        let mut state = self.lock();
                        if let Some(draft) = state.streaming.as_mut() {
                            draft.content.push_str(&content);
                        }
                    }
                    self.publish();
                }
                Ok(StreamEvent::End) => {
                    tracing::info!(
                        request_id = %request_id,
                        reply_chars = reply.len(),
                        "stream complete"
                    );
                    return Ok(reply);
                }
                Ok(StreamEvent::Error { message }) => {
                    return Err(ChatError::ServerStream(message));
                }
                Err(err @ ChatError::FrameParse(_)) => {
                    tracing::warn!(request_id = %request_id, error = %err, "skipping malformed frame");
                }
                Err(err) => return Err(err),
            }
        }
    }

    fn request_body(&self, question: &str, session_id: &str) -> ChatRequest {
        let tuning = &self.inner.tuning;
        ChatRequest {
            question: question.to_string(),
            session_id: Some(session_id.to_string()),
            doc_id: None,
            top_k: tuning.top_k,
            memory_limit: tuning.memory_limit,
            max_tokens: tuning.max_tokens,
            temperature: tuning.temperature,
        }
    }

    fn lock(&self) -> MutexGuard<'_, ChatState> {
        self.inner.state.lock().unwrap()
    }

    fn publish(&self) {
        let snapshot = self.lock().snapshot();
        self.inner.updates.send_replace(snapshot);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ApiClient, ApiConfig};

    fn view() -> ChatView {
        let api = ApiClient::new(&ApiConfig::default()).unwrap();
        ChatView::new(api, ChatTuning::default())
    }

    #[tokio::test]
    async fn send_without_session_is_rejected_before_io() {
        let view = view();
        let err = view.send_streaming("hello").await.unwrap_err();
        assert!(matches!(err, ChatError::Validation(_)));
        assert!(view.snapshot().messages.is_empty());
        assert_eq!(view.snapshot().phase, SendPhase::Idle);
    }

    #[tokio::test]
    async fn whitespace_question_is_rejected_before_io() {
        let view = view();
        view.set_session("s1").unwrap();
        let err = view.send_streaming("   \n\t ").await.unwrap_err();
        assert!(matches!(err, ChatError::Validation(_)));
        assert!(view.snapshot().messages.is_empty());
    }

    #[test]
    fn cancel_when_idle_is_a_no_op() {
        let view = view();
        view.cancel();
        assert_eq!(view.snapshot().phase, SendPhase::Idle);
    }

    #[test]
    fn set_session_resets_local_state() {
        let view = view();
        view.set_session("a").unwrap();
        assert_eq!(view.session_id().as_deref(), Some("a"));
        view.set_session("b").unwrap();
        assert_eq!(view.session_id().as_deref(), Some("b"));
        assert!(view.snapshot().messages.is_empty());
    }

    #[test]
    fn subscribers_see_the_initial_snapshot() {
        let view = view();
        let rx = view.subscribe();
        let snapshot = rx.borrow();
        assert_eq!(snapshot.phase, SendPhase::Idle);
        assert!(snapshot.streaming.is_none());
    }
}
