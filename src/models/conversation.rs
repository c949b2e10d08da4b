use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{deserialize_id, deserialize_nullable_string, deserialize_timestamp};

/// Conversation identifier. The backend uses integers; locally created
/// conversations use `pending-<uuid>` until the backend assigns one.
pub type ConversationId = String;

/// Prefix of locally generated conversation ids.
pub const PENDING_PREFIX: &str = "pending-";

/// Generate an id for a conversation not yet known to the backend.
pub fn pending_conversation_id() -> ConversationId {
    format!("{}{}", PENDING_PREFIX, Uuid::new_v4())
}

/// True for ids produced by [`pending_conversation_id`].
pub fn is_pending_id(id: &str) -> bool {
    id.starts_with(PENDING_PREFIX)
}

/// Derive a conversation title from the first question.
///
/// Questions longer than `max_chars` characters are cut and marked with `...`.
pub fn derive_title(question: &str, max_chars: usize) -> String {
    let question = question.trim();
    if question.chars().count() > max_chars {
        let cut: String = question.chars().take(max_chars).collect();
        format!("{}...", cut)
    } else {
        question.to_string()
    }
}

/// A conversation as listed by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: ConversationId,
    #[serde(default, deserialize_with = "deserialize_nullable_string")]
    pub title: String,
    #[serde(default, deserialize_with = "deserialize_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "deserialize_timestamp")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub message_count: u32,
}

impl Conversation {
    /// A locally created conversation awaiting its backend id.
    pub fn pending(title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: pending_conversation_id(),
            title: title.into(),
            created_at: Some(now),
            updated_at: Some(now),
            message_count: 0,
        }
    }

    pub fn is_pending(&self) -> bool {
        is_pending_id(&self.id)
    }
}

/// A message as persisted by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredMessage {
    #[serde(default, deserialize_with = "deserialize_id")]
    pub id: String,
    #[serde(default, deserialize_with = "deserialize_id")]
    pub conversation_id: String,
    #[serde(default, deserialize_with = "deserialize_nullable_string")]
    pub role: String,
    #[serde(default, deserialize_with = "deserialize_nullable_string")]
    pub content: String,
    #[serde(default)]
    pub mode: Option<String>,
    /// Structured payload, either as JSON text or already-structured JSON
    #[serde(default, alias = "meta")]
    pub metadata: Option<serde_json::Value>,
    #[serde(default, deserialize_with = "deserialize_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
}

/// A conversation with its full message history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationDetail {
    #[serde(flatten)]
    pub conversation: Conversation,
    #[serde(default)]
    pub messages: Vec<StoredMessage>,
}
