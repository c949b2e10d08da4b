//! Notifications emitted while sessions progress.

use tokio::sync::mpsc;
use tracing::debug;

use crate::models::{AssistantMessage, ConversationId, MessageId};

use super::handle::{SessionHandle, SessionId};

/// A finished answer.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub session_id: SessionId,
    pub conversation_id: ConversationId,
    pub message_id: MessageId,
    pub message: AssistantMessage,
}

/// Receives session progress. Every callback defaults to doing nothing.
pub trait SessionObserver: Send + Sync {
    /// A token was appended to the session's placeholder.
    fn on_token(&self, _session: &SessionHandle, _text: &str) {}

    /// The placeholder was finalized.
    fn on_complete(&self, _session: &SessionHandle, _completion: &Completion) {}

    /// The session failed; `message` is the text now shown in its place.
    fn on_error(&self, _session: &SessionHandle, _message: &str) {}

    /// The conversation list is out of date and a refresh was started.
    fn on_conversations_stale(&self) {}
}

/// Observer that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl SessionObserver for NoopObserver {}

/// Owned form of an observer callback.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionNotice {
    Token {
        session_id: SessionId,
        text: String,
    },
    Completed(Completion),
    Failed {
        session_id: SessionId,
        message: String,
    },
    ConversationsStale,
}

/// Forwards notices over an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    tx: mpsc::UnboundedSender<SessionNotice>,
}

impl ChannelObserver {
    pub fn new(tx: mpsc::UnboundedSender<SessionNotice>) -> Self {
        Self { tx }
    }

    /// Create an observer together with the receiving end.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<SessionNotice>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }

    fn send(&self, notice: SessionNotice) {
        if self.tx.send(notice).is_err() {
            debug!("Session notice dropped: receiver closed");
        }
    }
}

impl SessionObserver for ChannelObserver {
    fn on_token(&self, session: &SessionHandle, text: &str) {
        self.send(SessionNotice::Token {
            session_id: session.session_id.clone(),
            text: text.to_string(),
        });
    }

    fn on_complete(&self, _session: &SessionHandle, completion: &Completion) {
        self.send(SessionNotice::Completed(completion.clone()));
    }

    fn on_error(&self, session: &SessionHandle, message: &str) {
        self.send(SessionNotice::Failed {
            session_id: session.session_id.clone(),
            message: message.to_string(),
        });
    }

    fn on_conversations_stale(&self) {
        self.send(SessionNotice::ConversationsStale);
    }
}
