//! Rebuilding local messages from persisted history

use serde_json::Value;
use tracing::warn;

use crate::models::{
    AnswerMode, AssistantMessage, ChartSpec, Message, MessageId, StoredMessage, StructuredPayload,
};

/// Decode stored metadata. It is usually JSON text, but may already be
/// structured. Undecodable metadata is `None`.
fn decode_metadata(stored: &StoredMessage) -> Option<Value> {
    match stored.metadata.as_ref()? {
        Value::Null => None,
        Value::String(text) if text.trim().is_empty() => None,
        Value::String(text) => match serde_json::from_str::<Value>(text) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(message_id = %stored.id, "Failed to parse message metadata: {}", e);
                None
            }
        },
        other => Some(other.clone()),
    }
}

fn decode_payload(mode: AnswerMode, metadata: Option<Value>) -> Option<StructuredPayload> {
    let metadata = metadata?;
    match mode {
        AnswerMode::Chart => ChartSpec::from_value(&metadata).map(StructuredPayload::Chart),
        AnswerMode::Aggregation => {
            let rows = match metadata {
                Value::Array(rows) => Some(rows),
                Value::Object(mut map) => match map.remove("sources") {
                    Some(Value::Array(rows)) => Some(rows),
                    _ => None,
                },
                _ => None,
            };
            rows.map(StructuredPayload::Rows)
        }
        AnswerMode::Rag => None,
    }
}

/// Rebuild one message.
///
/// `user` rows become user messages; every other row is an assistant answer
/// shaped by its stored mode. Metadata that does not decode for the mode
/// leaves the payload empty.
pub fn rehydrate_message(stored: &StoredMessage) -> Message {
    let id = if stored.id.is_empty() {
        MessageId::generate()
    } else {
        MessageId::from(stored.id.as_str())
    };

    if stored.role.eq_ignore_ascii_case("user") {
        return Message::User {
            id,
            content: stored.content.clone(),
        };
    }

    let mode = AnswerMode::parse(stored.mode.as_deref());
    let payload = decode_payload(mode, decode_metadata(stored));

    Message::Assistant(AssistantMessage {
        id,
        mode,
        content: stored.content.clone(),
        payload,
        streaming: false,
        success: true,
        error_text: None,
    })
}

/// Rebuild a whole history in order. Never fails.
pub fn rehydrate_messages(stored: &[StoredMessage]) -> Vec<Message> {
    stored.iter().map(rehydrate_message).collect()
}
