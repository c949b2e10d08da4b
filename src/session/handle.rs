use uuid::Uuid;

use crate::models::{ConversationId, MessageId};

/// Identifier of one question-to-answer exchange.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifies the message an in-flight session is allowed to mutate.
///
/// Updates resolve the placeholder by `placeholder_id`; the index captured
/// at append time is only a lookup hint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionHandle {
    pub session_id: SessionId,
    /// Conversation the question was asked in. May be a pending ID that was
    /// later reconciled; the store follows the mapping.
    pub conversation_id: ConversationId,
    pub placeholder_id: MessageId,
    pub placeholder_index: usize,
    pub cancelled: bool,
}

impl SessionHandle {
    pub fn new(
        conversation_id: impl Into<ConversationId>,
        placeholder_id: MessageId,
        placeholder_index: usize,
    ) -> Self {
        Self {
            session_id: SessionId::generate(),
            conversation_id: conversation_id.into(),
            placeholder_id,
            placeholder_index,
            cancelled: false,
        }
    }

    /// Use an already generated session ID.
    pub fn with_session_id(mut self, session_id: SessionId) -> Self {
        self.session_id = session_id;
        self
    }
}
