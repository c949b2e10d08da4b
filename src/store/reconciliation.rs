//! Pending conversation ID reconciliation for ConversationStore

use tracing::debug;

use crate::models::Conversation;

use super::ConversationStore;

impl ConversationStore {
    /// Resolve a conversation ID, following pending->real mappings if needed.
    /// Lookups made with an ID captured before reconciliation still land on
    /// the right conversation.
    pub(crate) fn resolve_id<'a>(&'a self, conversation_id: &'a str) -> &'a str {
        self.pending_to_real
            .get(conversation_id)
            .map(|s| s.as_str())
            .unwrap_or(conversation_id)
    }

    /// Replace a pending (local) conversation with the one the backend
    /// created for it.
    ///
    /// The conversation keeps its list position, messages, lease and
    /// selection under the new ID. The backend's title wins unless it is
    /// empty.
    pub fn reconcile_conversation_id(&mut self, pending_id: &str, mut real: Conversation) {
        let real_id = real.id.clone();

        if pending_id == real_id {
            self.upsert_conversation(real);
            return;
        }

        if let Some(pending) = self.conversations.remove(pending_id) {
            if real.title.trim().is_empty() {
                real.title = pending.title;
            }
            real.message_count = real.message_count.max(pending.message_count);
        }

        // The real ID may already be listed if a refresh raced the creation
        self.order.retain(|id| id != &real_id);
        match self.order.iter().position(|id| id == pending_id) {
            Some(pos) => self.order[pos] = real_id.clone(),
            None => self.order.insert(0, real_id.clone()),
        }
        self.conversations.insert(real_id.clone(), real);

        let messages = self.messages.remove(pending_id).unwrap_or_default();
        self.messages.insert(real_id.clone(), messages);

        if let Some(session) = self.leases.remove(pending_id) {
            self.leases.insert(real_id.clone(), session);
        }

        if self.active.as_deref() == Some(pending_id) {
            self.active = Some(real_id.clone());
        }

        debug!(pending_id, real_id = %real_id, "Reconciled conversation ID");
        self.pending_to_real
            .insert(pending_id.to_string(), real_id);
    }
}
