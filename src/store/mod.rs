//! Conversation and message store
//!
//! Holds the visible conversation list, each conversation's ordered message
//! log, the active selection and the per-conversation session leases. All
//! mutation goes through targeted operations: append, id-addressed update,
//! whole-conversation removal or whole-list replacement.

mod conversation;
mod lease;
mod message;
mod reconciliation;
mod rehydrate;

use std::collections::HashMap;

use crate::models::{Conversation, ConversationId, Message};
use crate::session::SessionId;

pub use rehydrate::{rehydrate_message, rehydrate_messages};

/// Local state of conversations and their messages.
#[derive(Debug, Default)]
pub struct ConversationStore {
    /// Known conversations indexed by ID
    pub(crate) conversations: HashMap<ConversationId, Conversation>,
    /// Display order of conversation IDs (most recent first)
    pub(crate) order: Vec<ConversationId>,
    /// Ordered messages per conversation
    pub(crate) messages: HashMap<ConversationId, Vec<Message>>,
    /// Currently open conversation
    pub(crate) active: Option<ConversationId>,
    /// Session currently allowed to write to each conversation
    pub(crate) leases: HashMap<ConversationId, SessionId>,
    /// Pending IDs that have been replaced by backend IDs
    pub(crate) pending_to_real: HashMap<ConversationId, ConversationId>,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Conversations in display order.
    pub fn conversations(&self) -> Vec<&Conversation> {
        self.order
            .iter()
            .filter_map(|id| self.conversations.get(id))
            .collect()
    }

    pub fn conversation(&self, id: &str) -> Option<&Conversation> {
        self.conversations.get(self.resolve_id(id))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.conversations.contains_key(self.resolve_id(id))
    }

    pub fn conversation_count(&self) -> usize {
        self.conversations.len()
    }

    /// Messages of a conversation, empty when unknown or not loaded.
    pub fn messages(&self, id: &str) -> &[Message] {
        self.messages
            .get(self.resolve_id(id))
            .map(|m| m.as_slice())
            .unwrap_or(&[])
    }

    pub fn active_id(&self) -> Option<&str> {
        self.active.as_deref()
    }

    pub fn active_conversation(&self) -> Option<&Conversation> {
        self.active.as_deref().and_then(|id| self.conversations.get(id))
    }

    /// Messages of the active conversation; empty when none is active.
    pub fn active_messages(&self) -> &[Message] {
        match self.active.as_deref() {
            Some(id) => self.messages(id),
            None => &[],
        }
    }

    /// Make a known conversation active. Returns false for unknown IDs.
    pub fn select(&mut self, id: &str) -> bool {
        let id = self.resolve_id(id).to_string();
        if self.conversations.contains_key(&id) {
            self.active = Some(id);
            true
        } else {
            false
        }
    }

    /// Leave no conversation active.
    pub fn clear_selection(&mut self) {
        self.active = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_store_is_empty() {
        let store = ConversationStore::new();
        assert_eq!(store.conversation_count(), 0);
        assert!(store.conversations().is_empty());
        assert!(store.active_id().is_none());
        assert!(store.active_messages().is_empty());
        assert!(store.messages("nope").is_empty());
    }

    #[test]
    fn test_select_unknown_conversation() {
        let mut store = ConversationStore::new();
        assert!(!store.select("missing"));
        assert!(store.active_id().is_none());
    }
}
