//! Unified error type for datachat.
//!
//! `ChatError` consolidates the domain-specific errors into a single enum so
//! the session controller can decide, in one place, whether a failure is
//! absorbed or surfaced as a failed assistant message.

use std::fmt;

use super::category::ErrorCategory;
use super::context::ErrorContext;
use super::network::NetworkError;
use super::state::StateError;
use super::stream::StreamError;
use crate::config::ConfigError;

/// Where a visible failure originated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultOrigin {
    /// Raised on our side before the request was dispatched.
    Client,
    /// Raised by the connection while the request was in flight.
    System,
    /// Reported by the backend.
    Server,
}

impl FaultOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            FaultOrigin::Client => "client",
            FaultOrigin::System => "system",
            FaultOrigin::Server => "server",
        }
    }
}

/// Unified error type.
#[derive(Debug)]
pub enum ChatError {
    /// Reaching the backend failed.
    Network(NetworkError),

    /// The answer stream failed.
    Stream(StreamError),

    /// Conversation state did not allow the operation.
    State(StateError),

    /// Invalid configuration.
    Config(ConfigError),

    /// Failure while preparing a request, before anything was sent.
    Client { message: String },

    /// Wrapped error with additional context.
    WithContext {
        error: Box<ChatError>,
        context: ErrorContext,
    },
}

impl ChatError {
    /// Convenience constructor for setup failures.
    pub fn client(message: impl Into<String>) -> Self {
        ChatError::Client {
            message: message.into(),
        }
    }

    /// Get the category of this error.
    pub fn category(&self) -> ErrorCategory {
        match self {
            ChatError::Network(err) => match err {
                NetworkError::HttpStatus { .. } => ErrorCategory::Server,
                NetworkError::InvalidRequest { .. } => ErrorCategory::Client,
                _ => ErrorCategory::Transport,
            },
            ChatError::Stream(err) => match err {
                StreamError::InvalidJson { .. } | StreamError::MissingData { .. } => {
                    ErrorCategory::Protocol
                }
                StreamError::BackendError { .. } => ErrorCategory::Server,
                StreamError::EndedEarly => ErrorCategory::Transport,
            },
            ChatError::State(_) => ErrorCategory::State,
            ChatError::Config(_) => ErrorCategory::Configuration,
            ChatError::Client { .. } => ErrorCategory::Client,
            ChatError::WithContext { error, .. } => error.category(),
        }
    }

    /// Where the failure originated, for the visible failed message.
    pub fn origin(&self) -> FaultOrigin {
        match self.category() {
            ErrorCategory::Server => FaultOrigin::Server,
            ErrorCategory::Transport => FaultOrigin::System,
            _ => FaultOrigin::Client,
        }
    }

    /// Get a user-friendly error message.
    pub fn user_message(&self) -> String {
        match self {
            ChatError::Network(err) => err.user_message(),
            ChatError::Stream(err) => err.user_message(),
            ChatError::State(err) => err.user_message(),
            ChatError::Config(err) => err.to_string(),
            ChatError::Client { message } => message.clone(),
            ChatError::WithContext { error, .. } => error.user_message(),
        }
    }

    /// Text stored on a failed assistant message.
    ///
    /// Backend-reported failures keep the server's wording; connection and
    /// setup failures are labelled with the side they came from.
    pub fn failure_text(&self) -> String {
        match self.origin() {
            FaultOrigin::Server => format!("Error: {}", self.user_message()),
            origin => format!("Error ({}): {}", origin.as_str(), self.user_message()),
        }
    }

    /// Get a short error code for logging.
    pub fn error_code(&self) -> &'static str {
        match self {
            ChatError::Network(err) => err.error_code(),
            ChatError::Stream(err) => err.error_code(),
            ChatError::State(err) => err.error_code(),
            ChatError::Config(_) => "E_CONFIG",
            ChatError::Client { .. } => "E_CLIENT",
            ChatError::WithContext { error, .. } => error.error_code(),
        }
    }

    /// Attach context to this error.
    pub fn with_context(self, ctx: ErrorContext) -> Self {
        ChatError::WithContext {
            error: Box::new(self),
            context: ctx,
        }
    }

    /// Get the context if this error has one attached.
    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            ChatError::WithContext { context, .. } => Some(context),
            _ => None,
        }
    }

    /// Get the inner error without context.
    pub fn inner(&self) -> &ChatError {
        match self {
            ChatError::WithContext { error, .. } => error.inner(),
            _ => self,
        }
    }

    /// Get the recovery hint for this error.
    pub fn recovery_hint(&self) -> &'static str {
        self.category().recovery_hint()
    }
}

impl fmt::Display for ChatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChatError::Network(err) => write!(f, "{}", err),
            ChatError::Stream(err) => write!(f, "{}", err),
            ChatError::State(err) => write!(f, "{}", err),
            ChatError::Config(err) => write!(f, "{}", err),
            ChatError::Client { message } => write!(f, "Client error: {}", message),
            ChatError::WithContext { error, context } => write!(f, "{} ({})", error, context),
        }
    }
}

impl std::error::Error for ChatError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ChatError::Network(err) => Some(err),
            ChatError::Stream(err) => Some(err),
            ChatError::State(err) => Some(err),
            ChatError::Config(err) => Some(err),
            ChatError::Client { .. } => None,
            ChatError::WithContext { error, .. } => error.source(),
        }
    }
}

impl From<NetworkError> for ChatError {
    fn from(err: NetworkError) -> Self {
        ChatError::Network(err)
    }
}

impl From<StreamError> for ChatError {
    fn from(err: StreamError) -> Self {
        ChatError::Stream(err)
    }
}

impl From<StateError> for ChatError {
    fn from(err: StateError) -> Self {
        ChatError::State(err)
    }
}

impl From<ConfigError> for ChatError {
    fn from(err: ConfigError) -> Self {
        ChatError::Config(err)
    }
}

impl From<serde_json::Error> for ChatError {
    fn from(err: serde_json::Error) -> Self {
        ChatError::Network(NetworkError::InvalidResponse {
            message: err.to_string(),
        })
    }
}
