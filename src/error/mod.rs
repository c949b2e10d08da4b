//! Unified error handling for datachat.
//!
//! | Category | Example | Effect on the session |
//! |----------|---------|-----------------------|
//! | Protocol | malformed frame | frame skipped, session continues |
//! | Server | `error` frame, non-2xx status | session ends, failed message |
//! | Transport | connection refused, dropped stream | session ends, failed message |
//! | Client | failure before dispatch | failed message appended |
//! | State | placeholder no longer exists | dropped silently |
//! | Configuration | invalid base URL | reported before any session |

mod category;
mod chat_error;
mod context;
mod network;
mod result;
mod state;
mod stream;

pub use category::ErrorCategory;
pub use chat_error::{ChatError, FaultOrigin};
pub use context::ErrorContext;
pub use network::{classify_http_error, extract_detail, NetworkError};
pub use result::{ChatResult, ResultExt};
pub use state::StateError;
pub use stream::StreamError;

#[cfg(test)]
mod integration_tests {
    use super::*;

    /// Frame-level faults never become visible; stream-level faults always do.
    #[test]
    fn test_propagation_policy() {
        let silent: Vec<ChatError> = vec![
            StreamError::InvalidJson {
                event_type: "token".to_string(),
                message: "bad".to_string(),
            }
            .into(),
            StateError::PlaceholderNotFound {
                conversation_id: "1".to_string(),
                message_id: "m".to_string(),
            }
            .into(),
        ];
        for err in silent {
            assert!(!err.category().is_user_visible(), "{:?}", err);
        }

        let visible: Vec<ChatError> = vec![
            StreamError::BackendError {
                message: "boom".to_string(),
            }
            .into(),
            StreamError::EndedEarly.into(),
            NetworkError::Timeout {
                operation: "ask".to_string(),
            }
            .into(),
            ChatError::client("setup"),
        ];
        for err in visible {
            assert!(err.category().is_user_visible(), "{:?}", err);
            assert!(err.failure_text().starts_with("Error"));
        }
    }
}
