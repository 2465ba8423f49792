//! Streaming event model and incremental frame decoder.
//!
//! The chat backend streams a reply as UTF-8 text, one event per line, each
//! line of the form `data: <json>`. A physical chunk boundary can fall
//! anywhere, including inside a line or a multi-byte code point, so
//! [`FrameDecoder`] buffers bytes until a newline arrives
//! and only then parses the completed line.
//!
//! # Event kinds
//!
//! - `start`: retrieval finished, generation is about to begin
//! - `token`: incremental text to append to the reply under construction
//! - `end`: the reply is complete
//! - `error`: fatal server-side failure for this exchange
//!
//! Lines that are not valid `data: <json>` frames are reported as
//! [`ChatError::FrameParse`] so the consumer can log and skip them; they
//! never abort the stream.

use serde::{Deserialize, Serialize};

use crate::error::ChatError;

/// One decoded frame from the chat stream.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// Retrieval is done; token generation starts next.
    Start {
        /// The question being answered, echoed back.
        #[serde(default)]
        question: String,
        /// Number of retrieved source chunks feeding the answer.
        #[serde(default)]
        sources_count: usize,
    },

    /// Incremental reply text. Applied strictly in arrival order.
    Token {
        /// The text fragment to append.
        content: String,
    },

    /// The reply is complete; the accumulated buffer is final.
    End,

    /// The server failed mid-stream. Fatal for this send.
    Error {
        /// Human-readable server-provided message.
        message: String,
    },
}

/// Incremental decoder for `data: <json>` framed streams.
///
/// Stateful across [`FrameDecoder::feed`] calls: a frame that spans two
/// physical chunks is held until its `\n` terminator arrives. One decoder
/// instance serves exactly one stream; replaying the same bytes through a
/// fresh decoder yields the same events no matter how they were chunked.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buf: Vec<u8>,
}

impl FrameDecoder {
    /// Create a decoder with an empty line buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one physical chunk and return the frames it completed.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<Result<StreamEvent, ChatError>> {
        self.buf.extend_from_slice(chunk);

        let mut out = Vec::new();
        while let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buf.drain(..=pos).collect();
            if let Some(parsed) = parse_line(&line) {
                out.push(parsed);
            }
        }
        out
    }

    /// Flush a trailing line that never received its terminator.
    ///
    /// Call once when the byte stream ends; a stream that closes mid-line
    /// still yields its final complete frame.
    pub fn finish(&mut self) -> Option<Result<StreamEvent, ChatError>> {
        if self.buf.is_empty() {
            return None;
        }
        let line = std::mem::take(&mut self.buf);
        parse_line(&line)
    }
}

/// Parse a single line. Returns `None` for blank keep-alives and lines
/// without the `data:` prefix, `Some(Err(..))` for unparseable payloads.
fn parse_line(raw: &[u8]) -> Option<Result<StreamEvent, ChatError>> {
    let text = String::from_utf8_lossy(raw);
    let line = text.trim();
    let data = line.strip_prefix("data:")?.trim();
    if data.is_empty() {
        return None;
    }

    Some(
        serde_json::from_str(data)
            .map_err(|e| ChatError::FrameParse(format!("{e} in line {line:?}"))),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCRIPT: &[u8] = b"data: {\"type\":\"start\",\"question\":\"hi\",\"sources_count\":3}\n\
data: {\"type\":\"token\",\"content\":\"Hello\"}\n\
data: {\"type\":\"token\",\"content\":\", \"}\n\
data: {\"type\":\"token\",\"content\":\"world\"}\n\
data: {\"type\":\"end\"}\n";

    fn decode_all(chunks: &[&[u8]]) -> Vec<StreamEvent> {
        let mut decoder = FrameDecoder::new();
        let mut events = Vec::new();
        for chunk in chunks {
            for parsed in decoder.feed(chunk) {
                events.push(parsed.expect("valid frame"));
            }
        }
        if let Some(parsed) = decoder.finish() {
            events.push(parsed.expect("valid trailing frame"));
        }
        events
    }

    fn token_concat(events: &[StreamEvent]) -> String {
        events
            .iter()
            .filter_map(|e| match e {
                StreamEvent::Token { content } => Some(content.as_str()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn parses_each_event_kind() {
        let events = decode_all(&[SCRIPT]);
        assert_eq!(events.len(), 5);
        assert_eq!(
            events[0],
            StreamEvent::Start {
                question: "hi".into(),
                sources_count: 3
            }
        );
        assert_eq!(
            events[1],
            StreamEvent::Token {
                content: "Hello".into()
            }
        );
        assert_eq!(events[4], StreamEvent::End);
    }

    #[test]
    fn parses_error_frame() {
        let events = decode_all(&[b"data: {\"type\":\"error\",\"message\":\"model crashed\"}\n"]);
        assert_eq!(
            events,
            vec![StreamEvent::Error {
                message: "model crashed".into()
            }]
        );
    }

    #[test]
    fn split_at_every_offset_yields_identical_events() {
        let whole = decode_all(&[SCRIPT]);
        assert_eq!(token_concat(&whole), "Hello, world");

        for split in 0..=SCRIPT.len() {
            let (a, b) = SCRIPT.split_at(split);
            let events = decode_all(&[a, b]);
            assert_eq!(events, whole, "split at byte {split} changed the result");
        }
    }

    #[test]
    fn byte_at_a_time_feed_matches_whole_feed() {
        let whole = decode_all(&[SCRIPT]);
        let singles: Vec<&[u8]> = SCRIPT.chunks(1).collect();
        assert_eq!(decode_all(&singles), whole);
    }

    #[test]
    fn chunk_boundary_inside_multibyte_codepoint() {
        let script = "data: {\"type\":\"token\",\"content\":\"héllo\"}\n".as_bytes();
        let whole = decode_all(&[script]);
        for split in 0..=script.len() {
            let (a, b) = script.split_at(split);
            assert_eq!(decode_all(&[a, b]), whole);
        }
    }

    #[test]
    fn malformed_line_is_an_error_not_an_abort() {
        let mut decoder = FrameDecoder::new();
        let parsed = decoder.feed(
            b"data: {\"type\":\"token\",\"content\":\"a\"}\n\
data: {not json}\n\
data: {\"type\":\"token\",\"content\":\"b\"}\n",
        );

        assert_eq!(parsed.len(), 3);
        assert!(parsed[0].is_ok());
        assert!(matches!(parsed[1], Err(ChatError::FrameParse(_))));
        assert!(parsed[2].is_ok());

        let valid: Vec<StreamEvent> = parsed.into_iter().flatten().collect();
        assert_eq!(token_concat(&valid), "ab");
    }

    #[test]
    fn unknown_event_type_is_a_parse_error() {
        let mut decoder = FrameDecoder::new();
        let parsed = decoder.feed(b"data: {\"type\":\"telemetry\",\"v\":1}\n");
        assert_eq!(parsed.len(), 1);
        assert!(matches!(parsed[0], Err(ChatError::FrameParse(_))));
    }

    #[test]
    fn blank_and_non_data_lines_yield_nothing() {
        let mut decoder = FrameDecoder::new();
        assert!(decoder.feed(b"\n\n: keep-alive\nevent: ping\n").is_empty());
        assert!(decoder.finish().is_none());
    }

    #[test]
    fn crlf_line_endings_are_tolerated() {
        let events = decode_all(&[b"data: {\"type\":\"token\",\"content\":\"x\"}\r\ndata: {\"type\":\"end\"}\r\n"]);
        assert_eq!(
            events,
            vec![
                StreamEvent::Token { content: "x".into() },
                StreamEvent::End
            ]
        );
    }

    #[test]
    fn finish_flushes_unterminated_trailing_frame() {
        let mut decoder = FrameDecoder::new();
        assert!(decoder.feed(b"data: {\"type\":\"end\"}").is_empty());
        assert!(matches!(decoder.finish(), Some(Ok(StreamEvent::End))));
        assert!(decoder.finish().is_none());
    }

    #[test]
    fn replay_is_deterministic() {
        let first = decode_all(&[SCRIPT]);
        let second = decode_all(&[SCRIPT]);
        assert_eq!(first, second);
        assert_eq!(token_concat(&first), token_concat(&second));
    }
}
