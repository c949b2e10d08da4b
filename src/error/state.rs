//! Conversation state errors.

use thiserror::Error;

/// Attempted operations on conversation state that does not allow them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    #[error("conversation not found: {conversation_id}")]
    ConversationNotFound { conversation_id: String },

    #[error("message {message_id} no longer exists in conversation {conversation_id}")]
    PlaceholderNotFound {
        conversation_id: String,
        message_id: String,
    },

    #[error("a question is already being answered in conversation {conversation_id}")]
    SessionInFlight { conversation_id: String },

    #[error("session {session_id} is already closed")]
    SessionClosed { session_id: String },
}

impl StateError {
    /// Get a short error code for logging.
    pub fn error_code(&self) -> &'static str {
        match self {
            StateError::ConversationNotFound { .. } => "E_STATE_CONV",
            StateError::PlaceholderNotFound { .. } => "E_STATE_MSG",
            StateError::SessionInFlight { .. } => "E_STATE_BUSY",
            StateError::SessionClosed { .. } => "E_STATE_CLOSED",
        }
    }

    /// Get a user-friendly error message.
    pub fn user_message(&self) -> String {
        match self {
            StateError::SessionInFlight { .. } => {
                "Please wait for the current answer to complete before asking another question."
                    .to_string()
            }
            StateError::ConversationNotFound { .. } => "Conversation no longer exists.".to_string(),
            other => other.to_string(),
        }
    }
}
