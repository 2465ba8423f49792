//! Chat endpoints: single-shot and streaming.

use std::pin::Pin;

use futures::{Stream, StreamExt};

use crate::error::ChatError;
use crate::events::{FrameDecoder, StreamEvent};

use super::ApiClient;
use super::check_status;
use super::types::{ChatRequest, ChatResponse};

/// A pinned stream of decoded chat events.
///
/// Item errors are per-frame: a [`ChatError::FrameParse`] item means one
/// bad line and the stream continues; a [`ChatError::Transport`] item means
/// the connection died and nothing follows it.
pub type EventStream = Pin<Box<dyn Stream<Item = Result<StreamEvent, ChatError>> + Send>>;

impl ApiClient {
    /// Single-shot chat: the complete reply in one response.
    pub async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, ChatError> {
        self.post("/chat", request).await
    }

    /// Streaming chat: opens `POST /chat/stream` and returns the decoded
    /// event stream.
    ///
    /// The response status is checked before any of the body is read; a
    /// non-success status fails here with [`ChatError::Transport`] and the
    /// stream is never consumed. No timeout is applied: the stream lives
    /// until `end`, a transport error, or the caller drops it.
    pub async fn chat_stream(&self, request: &ChatRequest) -> Result<EventStream, ChatError> {
        let response = self
            .http()
            .post(self.endpoint("/chat/stream"))
            .json(request)
            .send()
            .await?;
        let response = check_status(response).await?;
        let byte_stream = response.bytes_stream();

        let events = async_stream::stream! {
            let mut decoder = FrameDecoder::new();

            futures::pin_mut!(byte_stream);
            while let Some(chunk) = byte_stream.next().await {
                match chunk {
                    Ok(bytes) => {
                        for parsed in decoder.feed(&bytes) {
                            yield parsed;
                        }
                    }
                    Err(e) => {
                        yield Err(ChatError::Transport(e.to_string()));
                        return;
                    }
                }
            }

            // The connection closed; flush a final unterminated frame.
            if let Some(parsed) = decoder.finish() {
                yield parsed;
            }
        };

        Ok(Box::pin(events))
    }
}
