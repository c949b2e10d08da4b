//! SSE line, frame and event types.

use crate::models::{AnswerMode, FinalAnswer};

/// Represents a parsed SSE line
#[derive(Debug, Clone, PartialEq)]
pub enum SseLine {
    /// Event type declaration (e.g., "event: token")
    Event(String),
    /// Data payload (e.g., "data: {\"type\":\"token\"}")
    Data(String),
    /// Empty line - signals end of event
    Empty,
    /// Comment line (starts with ':')
    Comment(String),
}

/// One complete frame: the text between two blank-line boundaries with the
/// field prefixes stripped.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SseFrame {
    /// Value of an `event:` line, if the frame had one
    pub event: Option<String>,
    /// `data:` lines joined with `\n`
    pub data: String,
}

impl SseFrame {
    pub fn data(data: impl Into<String>) -> Self {
        Self {
            event: None,
            data: data.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.event.is_none() && self.data.is_empty()
    }
}

/// Typed SSE events emitted by the answering service.
#[derive(Debug, Clone, PartialEq)]
pub enum SseEvent {
    /// Stream opened; carries the announced answer mode
    Start { mode: AnswerMode },
    /// Incremental answer text
    Token { content: String },
    /// Stream finished; usually bare, may carry a structured answer
    End { answer: FinalAnswer },
    /// The backend failed to produce an answer
    Error { message: String },
    /// Keep-alive or an event type this client does not act on
    Ping,
}

impl SseEvent {
    /// Wire name of the event, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            SseEvent::Start { .. } => "start",
            SseEvent::Token { .. } => "token",
            SseEvent::End { .. } => "end",
            SseEvent::Error { .. } => "error",
            SseEvent::Ping => "ping",
        }
    }
}
