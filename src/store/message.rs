//! Message management methods for ConversationStore

use crate::error::StateError;
use crate::models::{AssistantMessage, Message, MessageId};

use super::ConversationStore;

impl ConversationStore {
    /// Append a message to a conversation, returning its ID and position.
    ///
    /// A conversation holds at most one streaming message; appending a
    /// second one is rejected.
    pub fn append_message(
        &mut self,
        conversation_id: &str,
        message: Message,
    ) -> Result<(MessageId, usize), StateError> {
        let id = self.resolve_id(conversation_id).to_string();
        let conversation = self
            .conversations
            .get_mut(&id)
            .ok_or_else(|| StateError::ConversationNotFound {
                conversation_id: id.clone(),
            })?;

        let messages = self.messages.entry(id.clone()).or_default();
        if message.is_streaming() && messages.iter().any(Message::is_streaming) {
            return Err(StateError::SessionInFlight {
                conversation_id: id,
            });
        }

        let message_id = message.id().clone();
        messages.push(message);
        conversation.message_count = conversation.message_count.saturating_add(1);
        Ok((message_id, messages.len() - 1))
    }

    /// Position of a message, trying `hint` before scanning.
    pub fn position_of(
        &self,
        conversation_id: &str,
        message_id: &MessageId,
        hint: Option<usize>,
    ) -> Option<usize> {
        let messages = self.messages.get(self.resolve_id(conversation_id))?;
        if let Some(index) = hint {
            if messages.get(index).map(Message::id) == Some(message_id) {
                return Some(index);
            }
        }
        messages.iter().position(|m| m.id() == message_id)
    }

    pub fn message(&self, conversation_id: &str, message_id: &MessageId) -> Option<&Message> {
        let index = self.position_of(conversation_id, message_id, None)?;
        self.messages(conversation_id).get(index)
    }

    /// Apply `update` to an assistant message addressed by ID.
    ///
    /// Fails with [`StateError::PlaceholderNotFound`] when the message (or
    /// its whole conversation) no longer exists.
    pub fn update_assistant<F, R>(
        &mut self,
        conversation_id: &str,
        message_id: &MessageId,
        hint: Option<usize>,
        update: F,
    ) -> Result<R, StateError>
    where
        F: FnOnce(&mut AssistantMessage) -> R,
    {
        let not_found = || StateError::PlaceholderNotFound {
            conversation_id: conversation_id.to_string(),
            message_id: message_id.to_string(),
        };

        let index = self
            .position_of(conversation_id, message_id, hint)
            .ok_or_else(not_found)?;
        let id = self.resolve_id(conversation_id).to_string();

        self.messages
            .get_mut(&id)
            .and_then(|messages| messages.get_mut(index))
            .and_then(Message::as_assistant_mut)
            .map(update)
            .ok_or_else(not_found)
    }

    /// Number of streaming messages in a conversation (0 or 1).
    pub fn streaming_count(&self, conversation_id: &str) -> usize {
        self.messages(conversation_id)
            .iter()
            .filter(|m| m.is_streaming())
            .count()
    }
}
