use axum::response::sse::Event;

/// Payload of the final frame of every chat stream.
pub const DONE_SENTINEL: &str = "[DONE]";

/// One SSE frame of a chat stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// A content fragment, already newline-escaped.
    Chunk(String),
    Done,
}

impl Frame {
    pub fn chunk(fragment: &str, newline_placeholder: &str) -> Self {
        Frame::Chunk(escape_newlines(fragment, newline_placeholder))
    }

    pub fn payload(&self) -> &str {
        match self {
            Frame::Chunk(text) => text,
            Frame::Done => DONE_SENTINEL,
        }
    }

    pub fn into_event(self) -> Event {
        Event::default().data(self.payload())
    }
}

/// A `data:` field cannot hold line breaks, so every `\n` (or `\r\n`) becomes
/// the placeholder the client swaps back. Lone `\r` is dropped.
pub fn escape_newlines(text: &str, placeholder: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "").replace('\n', placeholder)
}
