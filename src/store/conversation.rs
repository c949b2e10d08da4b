//! Conversation management methods for ConversationStore

use std::collections::HashSet;

use tracing::debug;

use crate::models::{derive_title, Conversation, ConversationDetail, ConversationId};

use super::rehydrate::rehydrate_messages;
use super::ConversationStore;

impl ConversationStore {
    /// Insert or update a conversation. New conversations go to the top of
    /// the list; existing ones keep their position.
    pub fn upsert_conversation(&mut self, conversation: Conversation) {
        let id = conversation.id.clone();
        if !self.conversations.contains_key(&id) {
            self.order.insert(0, id.clone());
        }
        self.messages.entry(id.clone()).or_default();
        self.conversations.insert(id, conversation);
    }

    /// Optimistically add a local conversation titled after `question` and
    /// make it active. Returns its pending ID.
    pub fn create_pending_conversation(
        &mut self,
        question: &str,
        title_max_chars: usize,
    ) -> ConversationId {
        let conversation = Conversation::pending(derive_title(question, title_max_chars));
        let id = conversation.id.clone();
        debug!(conversation_id = %id, "Created pending conversation");
        self.upsert_conversation(conversation);
        self.active = Some(id.clone());
        id
    }

    /// Replace the conversation list with a fresh listing from the backend.
    ///
    /// Local conversations the backend cannot know about yet (pending ones,
    /// and any with a session in flight) are kept at the top. Messages of
    /// conversations that disappeared are dropped. The active selection is
    /// kept while it still exists, otherwise cleared.
    pub fn replace_conversations(&mut self, listed: Vec<Conversation>) {
        let listed_ids: HashSet<ConversationId> = listed.iter().map(|c| c.id.clone()).collect();

        let kept: Vec<Conversation> = self
            .order
            .iter()
            .filter(|id| !listed_ids.contains(*id))
            .filter_map(|id| self.conversations.get(id))
            .filter(|c| c.is_pending() || self.leases.contains_key(&c.id))
            .cloned()
            .collect();

        self.order = kept
            .iter()
            .map(|c| c.id.clone())
            .chain(listed.iter().map(|c| c.id.clone()))
            .collect();

        self.conversations = kept
            .into_iter()
            .chain(listed)
            .map(|c| (c.id.clone(), c))
            .collect();

        let conversations = &self.conversations;
        self.messages.retain(|id, _| conversations.contains_key(id));
        for id in &self.order {
            self.messages.entry(id.clone()).or_default();
        }

        if let Some(active) = self.active.as_ref() {
            if !self.conversations.contains_key(active) {
                debug!(conversation_id = %active, "Active conversation no longer listed");
                self.active = None;
            }
        }
    }

    /// Install a conversation loaded from the backend with its history and
    /// make it active.
    ///
    /// The message log is rebuilt from the stored history, so any local
    /// message of that conversation is replaced.
    pub fn open_conversation(&mut self, detail: ConversationDetail) -> ConversationId {
        let ConversationDetail {
            conversation,
            messages,
        } = detail;
        let id = conversation.id.clone();

        self.upsert_conversation(conversation);
        self.messages.insert(id.clone(), rehydrate_messages(&messages));
        self.active = Some(id.clone());
        id
    }

    /// Remove a conversation with its messages and lease.
    ///
    /// When the removed conversation was active, the new head of the list
    /// becomes active, or nothing when the list is now empty. Returns false
    /// when the conversation was unknown.
    pub fn remove_conversation(&mut self, id: &str) -> bool {
        let id = self.resolve_id(id).to_string();
        let existed = self.conversations.remove(&id).is_some();
        if !existed {
            return false;
        }

        self.order.retain(|other| other != &id);
        self.messages.remove(&id);
        self.leases.remove(&id);
        self.pending_to_real.remove(&id);
        self.pending_to_real.retain(|_, real| real != &id);

        if self.active.as_deref() == Some(id.as_str()) {
            self.active = self.order.first().cloned();
            debug!(
                removed = %id,
                active = ?self.active,
                "Removed active conversation"
            );
        }
        true
    }

    /// Change a conversation's title. Returns false for unknown IDs.
    pub fn rename_conversation(&mut self, id: &str, title: impl Into<String>) -> bool {
        let id = self.resolve_id(id).to_string();
        match self.conversations.get_mut(&id) {
            Some(conversation) => {
                conversation.title = title.into();
                true
            }
            None => false,
        }
    }
}
