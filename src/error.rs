//! Error taxonomy for the chat client.
//!
//! Every non-commit exit of a send is one of these variants, so callers
//! match a single enum. [`ChatError::Cancelled`] is informational (the user
//! asked for it); everything else is a failure.

/// Errors surfaced by the API client and the chat consumer.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    /// Rejected before any I/O: empty input or no session selected.
    #[error("invalid request: {0}")]
    Validation(String),

    /// A send is already outstanding on this view. Rejected before any I/O;
    /// the transcript is untouched and no request is opened.
    #[error("a send is already in progress")]
    Busy,

    /// Network failure, or a non-success HTTP status establishing a request.
    #[error("transport error: {0}")]
    Transport(String),

    /// Local I/O failure, e.g. reading a file for upload.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// An `error`-typed frame received mid-stream, with the server's message.
    #[error("server stream error: {0}")]
    ServerStream(String),

    /// A malformed `data:` line. The consumer logs and skips these; they
    /// never abort a stream.
    #[error("malformed frame: {0}")]
    FrameParse(String),

    /// User-initiated cancellation. Not a failure: the optimistic user
    /// message stays in the transcript.
    #[error("cancelled")]
    Cancelled,
}

impl ChatError {
    /// Whether this error rolls back the optimistically appended user
    /// message. Cancellation is user intent, not failure, and keeps it.
    #[must_use]
    pub fn rolls_back(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::ServerStream(_))
    }
}

impl From<reqwest::Error> for ChatError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rollback_rule_is_asymmetric() {
        assert!(ChatError::Transport("reset".into()).rolls_back());
        assert!(ChatError::ServerStream("boom".into()).rolls_back());
        assert!(!ChatError::Cancelled.rolls_back());
        assert!(!ChatError::Busy.rolls_back());
        assert!(!ChatError::Validation("empty".into()).rolls_back());
    }
}
