//! Recording session observer for testing.

use std::sync::{Arc, Mutex};

use crate::session::{Completion, SessionHandle, SessionNotice, SessionObserver};

/// Observer that keeps every notification for later assertions.
///
/// Clones share the same log, so a test can hand one clone to the
/// controller and inspect another.
#[derive(Debug, Clone, Default)]
pub struct RecordingObserver {
    notices: Arc<Mutex<Vec<SessionNotice>>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// All notices received so far, in order.
    pub fn notices(&self) -> Vec<SessionNotice> {
        self.notices.lock().unwrap().clone()
    }

    /// Concatenation of every token received.
    pub fn streamed_text(&self) -> String {
        self.notices
            .lock()
            .unwrap()
            .iter()
            .filter_map(|n| match n {
                SessionNotice::Token { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn completions(&self) -> Vec<Completion> {
        self.notices
            .lock()
            .unwrap()
            .iter()
            .filter_map(|n| match n {
                SessionNotice::Completed(c) => Some(c.clone()),
                _ => None,
            })
            .collect()
    }

    /// Failure texts, in order.
    pub fn errors(&self) -> Vec<String> {
        self.notices
            .lock()
            .unwrap()
            .iter()
            .filter_map(|n| match n {
                SessionNotice::Failed { message, .. } => Some(message.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn stale_count(&self) -> usize {
        self.notices
            .lock()
            .unwrap()
            .iter()
            .filter(|n| matches!(n, SessionNotice::ConversationsStale))
            .count()
    }

    pub fn clear(&self) {
        self.notices.lock().unwrap().clear();
    }

    fn record(&self, notice: SessionNotice) {
        self.notices.lock().unwrap().push(notice);
    }
}

impl SessionObserver for RecordingObserver {
    fn on_token(&self, session: &SessionHandle, text: &str) {
        self.record(SessionNotice::Token {
            session_id: session.session_id.clone(),
            text: text.to_string(),
        });
    }

    fn on_complete(&self, _session: &SessionHandle, completion: &Completion) {
        self.record(SessionNotice::Completed(completion.clone()));
    }

    fn on_error(&self, session: &SessionHandle, message: &str) {
        self.record(SessionNotice::Failed {
            session_id: session.session_id.clone(),
            message: message.to_string(),
        });
    }

    fn on_conversations_stale(&self) {
        self.record(SessionNotice::ConversationsStale);
    }
}
