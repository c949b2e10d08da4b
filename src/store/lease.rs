//! Session leases: at most one writing session per conversation

use tracing::debug;

use crate::error::StateError;
use crate::session::SessionId;

use super::ConversationStore;

impl ConversationStore {
    /// Grant `session` exclusive write access to a conversation.
    ///
    /// Re-acquiring by the current holder succeeds; any other session is
    /// rejected while the lease is held.
    pub fn acquire_lease(
        &mut self,
        conversation_id: &str,
        session: SessionId,
    ) -> Result<(), StateError> {
        let id = self.resolve_id(conversation_id).to_string();
        if !self.conversations.contains_key(&id) {
            return Err(StateError::ConversationNotFound {
                conversation_id: id,
            });
        }

        match self.leases.get(&id) {
            Some(holder) if *holder != session => Err(StateError::SessionInFlight {
                conversation_id: id,
            }),
            _ => {
                debug!(conversation_id = %id, session_id = %session, "Lease acquired");
                self.leases.insert(id, session);
                Ok(())
            }
        }
    }

    /// Release the lease if `session` holds it. Returns true when released.
    pub fn release_lease(&mut self, conversation_id: &str, session: &SessionId) -> bool {
        let id = self.resolve_id(conversation_id).to_string();
        if self.leases.get(&id) == Some(session) {
            self.leases.remove(&id);
            debug!(conversation_id = %id, session_id = %session, "Lease released");
            true
        } else {
            false
        }
    }

    pub fn lease_holder(&self, conversation_id: &str) -> Option<&SessionId> {
        self.leases.get(self.resolve_id(conversation_id))
    }

    pub fn is_leased(&self, conversation_id: &str) -> bool {
        self.lease_holder(conversation_id).is_some()
    }
}
