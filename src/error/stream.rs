//! Streaming-related error types.
//!
//! Errors that occur while decoding and interpreting the answer stream.

use std::fmt;

/// Stream-specific error variants.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamError {
    /// A frame's payload was not valid JSON for its event type.
    InvalidJson { event_type: String, message: String },

    /// A frame carried an event type but no data.
    MissingData { event_type: String },

    /// Backend reported an error via an `error` frame.
    BackendError { message: String },

    /// The stream closed before a terminal frame arrived.
    EndedEarly,
}

impl StreamError {
    /// Frame-level faults are skipped; everything else ends the session.
    pub fn is_frame_level(&self) -> bool {
        matches!(
            self,
            StreamError::InvalidJson { .. } | StreamError::MissingData { .. }
        )
    }

    /// Get a user-friendly error message.
    pub fn user_message(&self) -> String {
        match self {
            StreamError::InvalidJson { event_type, .. } => {
                format!("Received malformed data for a '{}' event.", event_type)
            }
            StreamError::MissingData { event_type } => {
                format!("Received an empty '{}' event.", event_type)
            }
            StreamError::BackendError { message } => message.clone(),
            StreamError::EndedEarly => {
                "The answer stream closed before the answer was complete.".to_string()
            }
        }
    }

    /// Get a short error code for logging.
    pub fn error_code(&self) -> &'static str {
        match self {
            StreamError::InvalidJson { .. } => "E_STREAM_JSON",
            StreamError::MissingData { .. } => "E_STREAM_EMPTY",
            StreamError::BackendError { .. } => "E_STREAM_BACKEND",
            StreamError::EndedEarly => "E_STREAM_EOF",
        }
    }
}

impl fmt::Display for StreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamError::InvalidJson { event_type, message } => {
                write!(f, "Invalid JSON for {} event: {}", event_type, message)
            }
            StreamError::MissingData { event_type } => {
                write!(f, "Missing data for event type: {}", event_type)
            }
            StreamError::BackendError { message } => write!(f, "Backend error: {}", message),
            StreamError::EndedEarly => write!(f, "Stream ended before completion"),
        }
    }
}

impl std::error::Error for StreamError {}
