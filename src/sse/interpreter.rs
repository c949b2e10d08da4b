//! Classification of decoded frames into stream records.

use serde_json::Value;
use tracing::{debug, warn};

use crate::error::NetworkError;
use crate::models::FinalAnswer;
use crate::sse::events::{SseEvent, SseFrame};
use crate::sse::parser::parse_sse_event;

/// What one frame means for the session.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamRecord {
    /// Append this text to the answer
    Token(String),
    /// The answer is final, with this shape
    Completion(FinalAnswer),
    /// The backend gave up with this message
    Error(String),
}

impl StreamRecord {
    /// Completion and error records end a session.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, StreamRecord::Token(_))
    }
}

/// Turns frames into [`StreamRecord`]s.
///
/// Malformed frames are logged and skipped; they never end the stream.
#[derive(Debug, Default)]
pub struct StreamInterpreter {
    frames_seen: usize,
    frames_skipped: usize,
}

impl StreamInterpreter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Classify one frame. `None` means the frame carries nothing to apply.
    pub fn interpret(&mut self, frame: &SseFrame) -> Option<StreamRecord> {
        self.frames_seen += 1;

        let event = match parse_sse_event(frame) {
            Ok(event) => event,
            Err(err) => {
                self.frames_skipped += 1;
                warn!(
                    error_code = err.error_code(),
                    frame = self.frames_seen,
                    "Skipping malformed frame: {}",
                    err
                );
                return None;
            }
        };

        debug!(event_type = event.kind(), frame = self.frames_seen, "Frame received");

        match event {
            SseEvent::Token { content } => Some(StreamRecord::Token(content)),
            SseEvent::End { answer } => Some(StreamRecord::Completion(answer)),
            SseEvent::Error { message } => Some(StreamRecord::Error(message)),
            SseEvent::Start { .. } | SseEvent::Ping => None,
        }
    }

    pub fn frames_seen(&self) -> usize {
        self.frames_seen
    }

    pub fn frames_skipped(&self) -> usize {
        self.frames_skipped
    }
}

/// Interpret a complete, non-streamed answer body.
///
/// The whole body is one JSON document `{mode, answer, chart?, sources?}`;
/// it always yields a completion. A body that is not a JSON object cannot
/// be an answer and is reported as an invalid response.
pub fn interpret_body(body: &[u8]) -> Result<StreamRecord, NetworkError> {
    let value: Value =
        serde_json::from_slice(body).map_err(|e| NetworkError::InvalidResponse {
            message: e.to_string(),
        })?;

    if !value.is_object() {
        return Err(NetworkError::InvalidResponse {
            message: "answer body is not a JSON object".to_string(),
        });
    }

    let answer = FinalAnswer::from_body(&value);
    debug!(mode = %answer.mode, "Complete answer body received");
    Ok(StreamRecord::Completion(answer))
}
