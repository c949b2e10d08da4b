//! Error category classification for unified error handling.
//!
//! Categories decide what a failure does to the conversation: whether it is
//! absorbed silently or ends the session with a visible failed message.

use std::fmt;

/// High-level categorization of errors for handling decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Connection-level failures (refused, timeout, dropped stream).
    Transport,

    /// A single malformed frame. Recoverable: the frame is skipped and the
    /// session continues.
    Protocol,

    /// The backend reported a failure (explicit error frame or non-success status).
    Server,

    /// Failure raised on our side before the request was dispatched.
    Client,

    /// A mutation targeted state that no longer exists. Dropped silently.
    State,

    /// Invalid client configuration.
    Configuration,
}

impl ErrorCategory {
    /// Returns true if errors in this category end the session with a
    /// failed message the user can see.
    pub fn is_user_visible(&self) -> bool {
        !matches!(self, ErrorCategory::Protocol | ErrorCategory::State)
    }

    /// Returns a short label for the category suitable for logging.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Transport => "transport",
            ErrorCategory::Protocol => "protocol",
            ErrorCategory::Server => "server",
            ErrorCategory::Client => "client",
            ErrorCategory::State => "state",
            ErrorCategory::Configuration => "configuration",
        }
    }

    /// Returns suggested recovery actions for this category.
    ///
    /// Nothing is retried automatically; every hint ends with the user resubmitting.
    pub fn recovery_hint(&self) -> &'static str {
        match self {
            ErrorCategory::Transport => "Check that the server is reachable and ask again",
            ErrorCategory::Protocol => "No action needed",
            ErrorCategory::Server => "The server may be experiencing issues. Please ask again later",
            ErrorCategory::Client => "This may be a bug. Please report this issue if it persists",
            ErrorCategory::State => "Reopen the conversation",
            ErrorCategory::Configuration => "Check DATACHAT_API_URL and DATACHAT_TIMEOUT_SECS",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
