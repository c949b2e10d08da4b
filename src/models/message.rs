use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::answer::{AnswerMode, FinalAnswer, StructuredPayload};

/// Stable identifier of a message within the local store.
///
/// Generated when a message is created locally; rehydrated messages reuse
/// the backend id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(String);

impl MessageId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for MessageId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for MessageId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Role of a message in a conversation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    System,
    Assistant,
}

/// An assistant answer, possibly still streaming.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssistantMessage {
    pub id: MessageId,
    pub mode: AnswerMode,
    /// Answer text; empty while a placeholder waits for its first token
    pub content: String,
    pub payload: Option<StructuredPayload>,
    pub streaming: bool,
    pub success: bool,
    pub error_text: Option<String>,
}

impl AssistantMessage {
    /// Empty in-flight answer of not-yet-known shape.
    pub fn placeholder() -> Self {
        Self {
            id: MessageId::generate(),
            mode: AnswerMode::Rag,
            content: String::new(),
            payload: None,
            streaming: true,
            success: true,
            error_text: None,
        }
    }

    /// A finished failed answer carrying `text`.
    pub fn failed(text: impl Into<String>) -> Self {
        let mut message = Self::placeholder();
        message.fail(text);
        message
    }

    /// A finished answer built from a final answer shape.
    pub fn completed(answer: FinalAnswer) -> Self {
        let mut message = Self::placeholder();
        message.finalize(answer);
        message
    }

    /// Append streamed text. Returns false once the message has finished.
    pub fn append_token(&mut self, text: &str) -> bool {
        if !self.streaming {
            return false;
        }
        self.content.push_str(text);
        true
    }

    /// Apply the final answer shape.
    ///
    /// Structured modes replace the message body wholesale. A plain-text
    /// completion keeps the accumulated tokens and only falls back to the
    /// final answer text when nothing was streamed.
    pub fn finalize(&mut self, answer: FinalAnswer) {
        match answer.mode {
            AnswerMode::Chart => {
                self.mode = AnswerMode::Chart;
                self.content = String::new();
                self.payload = answer.payload;
            }
            AnswerMode::Aggregation => {
                self.mode = AnswerMode::Aggregation;
                self.content = answer.answer;
                self.payload = answer.payload;
            }
            AnswerMode::Rag => {
                if self.content.is_empty() && !answer.answer.is_empty() {
                    self.content = answer.answer;
                }
            }
        }
        self.streaming = false;
        self.success = true;
        self.error_text = None;
    }

    /// Overwrite the message with a failure.
    pub fn fail(&mut self, text: impl Into<String>) {
        let text = text.into();
        self.mode = AnswerMode::Rag;
        self.content = text.clone();
        self.payload = None;
        self.streaming = false;
        self.success = false;
        self.error_text = Some(text);
    }
}

/// A message in a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum Message {
    User { id: MessageId, content: String },
    System { id: MessageId, content: String },
    Assistant(AssistantMessage),
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Message::User {
            id: MessageId::generate(),
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Message::System {
            id: MessageId::generate(),
            content: content.into(),
        }
    }

    pub fn id(&self) -> &MessageId {
        match self {
            Message::User { id, .. } | Message::System { id, .. } => id,
            Message::Assistant(assistant) => &assistant.id,
        }
    }

    pub fn role(&self) -> MessageRole {
        match self {
            Message::User { .. } => MessageRole::User,
            Message::System { .. } => MessageRole::System,
            Message::Assistant(_) => MessageRole::Assistant,
        }
    }

    pub fn content(&self) -> &str {
        match self {
            Message::User { content, .. } | Message::System { content, .. } => content,
            Message::Assistant(assistant) => &assistant.content,
        }
    }

    pub fn is_streaming(&self) -> bool {
        matches!(self, Message::Assistant(a) if a.streaming)
    }

    pub fn as_assistant(&self) -> Option<&AssistantMessage> {
        match self {
            Message::Assistant(assistant) => Some(assistant),
            _ => None,
        }
    }

    pub fn as_assistant_mut(&mut self) -> Option<&mut AssistantMessage> {
        match self {
            Message::Assistant(assistant) => Some(assistant),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ChartSpec;

    #[test]
    fn test_placeholder_shape() {
        let placeholder = AssistantMessage::placeholder();
        assert_eq!(placeholder.mode, AnswerMode::Rag);
        assert!(placeholder.streaming);
        assert!(placeholder.success);
        assert!(placeholder.content.is_empty());
        assert!(placeholder.payload.is_none());
    }

    #[test]
    fn test_generated_ids_are_unique() {
        assert_ne!(MessageId::generate(), MessageId::generate());
    }

    #[test]
    fn test_tokens_rejected_after_finalize() {
        let mut message = AssistantMessage::placeholder();
        assert!(message.append_token("Hel"));
        assert!(message.append_token("lo"));
        message.finalize(FinalAnswer::bare());

        assert!(!message.append_token("!"));
        assert_eq!(message.content, "Hello");
        assert!(!message.streaming);
    }

    #[test]
    fn test_rag_finalize_keeps_streamed_text() {
        let mut message = AssistantMessage::placeholder();
        message.append_token("streamed");
        message.finalize(FinalAnswer {
            mode: AnswerMode::Rag,
            answer: "other".to_string(),
            payload: None,
        });
        assert_eq!(message.content, "streamed");

        let mut empty = AssistantMessage::placeholder();
        empty.finalize(FinalAnswer {
            mode: AnswerMode::Rag,
            answer: "from body".to_string(),
            payload: None,
        });
        assert_eq!(empty.content, "from body");
    }

    #[test]
    fn test_chart_finalize_replaces_body() {
        let mut message = AssistantMessage::placeholder();
        message.append_token("partial");
        message.finalize(FinalAnswer {
            mode: AnswerMode::Chart,
            answer: String::new(),
            payload: Some(StructuredPayload::Chart(ChartSpec::default())),
        });

        assert_eq!(message.mode, AnswerMode::Chart);
        assert_eq!(message.content, "");
        assert!(message.payload.as_ref().unwrap().as_chart().is_some());
    }

    #[test]
    fn test_fail_overwrites() {
        let mut message = AssistantMessage::placeholder();
        message.append_token("half an ans");
        message.fail("Error: boom");

        assert!(!message.success);
        assert!(!message.streaming);
        assert_eq!(message.content, "Error: boom");
        assert_eq!(message.error_text.as_deref(), Some("Error: boom"));
    }

    #[test]
    fn test_message_serializes_with_role_tag() {
        let json = serde_json::to_value(Message::user("hi")).unwrap();
        assert_eq!(json["role"], "user");
        assert_eq!(json["content"], "hi");
    }
}
