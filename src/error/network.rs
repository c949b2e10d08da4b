//! Network-related error types.
//!
//! Errors raised while reaching the answering service: connection failures,
//! timeouts, non-success statuses and unreadable bodies.

use std::fmt;

use crate::traits::HttpError;

/// Network-specific error variants.
#[derive(Debug, Clone, PartialEq)]
pub enum NetworkError {
    /// Connection to the server failed.
    ConnectionFailed { url: String, message: String },

    /// Request timed out.
    Timeout { operation: String },

    /// HTTP status error (non-2xx response).
    HttpStatus { status: u16, message: String },

    /// The request could not be built or sent (never left the client).
    InvalidRequest { message: String },

    /// Invalid response format.
    InvalidResponse { message: String },

    /// The response body broke off while it was being read.
    BodyInterrupted { message: String },

    /// Generic network error.
    Other { message: String },
}

impl NetworkError {
    /// True when the failure happened before anything was dispatched.
    pub fn is_before_dispatch(&self) -> bool {
        matches!(self, NetworkError::InvalidRequest { .. })
    }

    /// Get a user-friendly error message.
    pub fn user_message(&self) -> String {
        match self {
            NetworkError::ConnectionFailed { .. } => {
                "Unable to connect to the server. Please check that it is running.".to_string()
            }
            NetworkError::Timeout { operation } => {
                format!("The {} operation timed out.", operation)
            }
            NetworkError::HttpStatus { status, message } => match *status {
                401 => "Authentication required. Please sign in again.".to_string(),
                403 => "Access denied. You don't have permission for this action.".to_string(),
                404 => "The requested conversation was not found.".to_string(),
                _ if !message.is_empty() => format!("Query failed: {}", message),
                _ => format!("The server returned an error (HTTP {}).", status),
            },
            NetworkError::InvalidRequest { message } => {
                format!("The request could not be sent: {}", message)
            }
            NetworkError::InvalidResponse { .. } => {
                "Received an invalid response from the server.".to_string()
            }
            NetworkError::BodyInterrupted { .. } => {
                "The connection dropped while the answer was arriving.".to_string()
            }
            NetworkError::Other { message } => format!("Network error: {}", message),
        }
    }

    /// Get a short error code for logging.
    pub fn error_code(&self) -> &'static str {
        match self {
            NetworkError::ConnectionFailed { .. } => "E_NET_CONN",
            NetworkError::Timeout { .. } => "E_NET_TIMEOUT",
            NetworkError::HttpStatus { .. } => "E_NET_HTTP",
            NetworkError::InvalidRequest { .. } => "E_NET_REQUEST",
            NetworkError::InvalidResponse { .. } => "E_NET_INVALID",
            NetworkError::BodyInterrupted { .. } => "E_NET_BODY",
            NetworkError::Other { .. } => "E_NET_OTHER",
        }
    }
}

impl fmt::Display for NetworkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetworkError::ConnectionFailed { url, message } => {
                write!(f, "Connection failed to '{}': {}", url, message)
            }
            NetworkError::Timeout { operation } => write!(f, "{} timed out", operation),
            NetworkError::HttpStatus { status, message } => {
                write!(f, "HTTP {} error: {}", status, message)
            }
            NetworkError::InvalidRequest { message } => write!(f, "Invalid request: {}", message),
            NetworkError::InvalidResponse { message } => {
                write!(f, "Invalid response: {}", message)
            }
            NetworkError::BodyInterrupted { message } => {
                write!(f, "Response body interrupted: {}", message)
            }
            NetworkError::Other { message } => write!(f, "Network error: {}", message),
        }
    }
}

impl std::error::Error for NetworkError {}

/// Classify a transport-level [`HttpError`] for the request sent to `url`.
pub fn classify_http_error(err: HttpError, url: &str) -> NetworkError {
    match err {
        HttpError::ConnectionFailed(message) => NetworkError::ConnectionFailed {
            url: url.to_string(),
            message,
        },
        HttpError::Timeout(_) => NetworkError::Timeout {
            operation: "HTTP request".to_string(),
        },
        HttpError::ServerError { status, message } => NetworkError::HttpStatus {
            status,
            message: extract_detail(&message),
        },
        HttpError::InvalidUrl(message) => NetworkError::InvalidRequest { message },
        HttpError::Io(message) => NetworkError::BodyInterrupted { message },
        HttpError::Other(message) => NetworkError::Other { message },
    }
}

/// Pull the `detail` field out of an error body, falling back to the raw text.
///
/// The backend reports failures as `{"detail": "..."}`.
pub fn extract_detail(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("detail").and_then(|d| d.as_str()).map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_connection_failed() {
        let err = classify_http_error(
            HttpError::ConnectionFailed("refused".to_string()),
            "http://localhost:8000/ask/stream",
        );
        assert_eq!(
            err,
            NetworkError::ConnectionFailed {
                url: "http://localhost:8000/ask/stream".to_string(),
                message: "refused".to_string(),
            }
        );
        assert!(!err.is_before_dispatch());
    }

    #[test]
    fn test_classify_server_error_extracts_detail() {
        let err = classify_http_error(
            HttpError::ServerError {
                status: 404,
                message: r#"{"detail":"Conversation not found"}"#.to_string(),
            },
            "http://x",
        );
        assert_eq!(
            err,
            NetworkError::HttpStatus {
                status: 404,
                message: "Conversation not found".to_string(),
            }
        );
    }

    #[test]
    fn test_classify_invalid_url_is_before_dispatch() {
        let err = classify_http_error(HttpError::InvalidUrl("bad".to_string()), "bad");
        assert!(err.is_before_dispatch());
        assert_eq!(err.error_code(), "E_NET_REQUEST");
    }

    #[test]
    fn test_extract_detail_falls_back_to_body() {
        assert_eq!(extract_detail("Internal Server Error\n"), "Internal Server Error");
        assert_eq!(extract_detail(r#"{"other":1}"#), r#"{"other":1}"#);
    }

    #[test]
    fn test_http_status_user_message_uses_detail() {
        let err = NetworkError::HttpStatus {
            status: 500,
            message: "vector store offline".to_string(),
        };
        assert_eq!(err.user_message(), "Query failed: vector store offline");

        let bare = NetworkError::HttpStatus {
            status: 502,
            message: String::new(),
        };
        assert!(bare.user_message().contains("HTTP 502"));
    }

    #[test]
    fn test_display() {
        let err = NetworkError::Timeout {
            operation: "ask".to_string(),
        };
        assert_eq!(err.to_string(), "ask timed out");
    }
}
