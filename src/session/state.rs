//! Query session state machine.
//!
//! One [`QuerySession`] per submitted question. Everything that happens to
//! the session (stream opened, record received, transport failure, end of
//! input) is fed through [`QuerySession::apply`], which validates the
//! transition and patches the placeholder in the store:
//!
//! Idle -> Streaming -> Completed | Failed
//! Idle -> Completed | Failed (complete-body answers, early failures)

use tracing::{debug, error, info, warn};

use crate::error::{ChatError, ErrorContext, StateError, StreamError};
use crate::models::AssistantMessage;
use crate::sse::StreamRecord;
use crate::store::ConversationStore;

use super::handle::SessionHandle;

/// Lifecycle phase of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionPhase {
    Idle,
    Streaming,
    Completed,
    Failed,
}

impl SessionPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionPhase::Completed | SessionPhase::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SessionPhase::Idle => "idle",
            SessionPhase::Streaming => "streaming",
            SessionPhase::Completed => "completed",
            SessionPhase::Failed => "failed",
        }
    }
}

/// Check that a phase transition is allowed.
pub fn can_transition(from: SessionPhase, to: SessionPhase) -> bool {
    matches!(
        (from, to),
        (SessionPhase::Idle, SessionPhase::Streaming)
            | (SessionPhase::Idle, SessionPhase::Completed)
            | (SessionPhase::Idle, SessionPhase::Failed)
            | (SessionPhase::Streaming, SessionPhase::Streaming)
            | (SessionPhase::Streaming, SessionPhase::Completed)
            | (SessionPhase::Streaming, SessionPhase::Failed)
    )
}

/// Something that happened to a session.
#[derive(Debug)]
pub enum SessionInput {
    /// The event stream is open
    Opened,
    /// A classified record arrived
    Record(StreamRecord),
    /// Reaching the backend or reading the body failed
    Failed(ChatError),
    /// The stream ended without a completion or error record
    EndOfStream,
}

/// What applying an input did.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionOutcome {
    /// Nothing changed
    Ignored,
    Opened,
    /// This text was appended to the placeholder
    Token(String),
    /// The placeholder was finalized into this message
    Completed(AssistantMessage),
    /// The placeholder now shows this failure text
    Failed(String),
    /// The placeholder no longer exists; the update was discarded
    Dropped(StateError),
}

/// State of one question-to-answer exchange.
#[derive(Debug)]
pub struct QuerySession {
    handle: SessionHandle,
    phase: SessionPhase,
    tokens_applied: usize,
}

impl QuerySession {
    pub fn new(handle: SessionHandle) -> Self {
        Self {
            handle,
            phase: SessionPhase::Idle,
            tokens_applied: 0,
        }
    }

    pub fn handle(&self) -> &SessionHandle {
        &self.handle
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn tokens_applied(&self) -> usize {
        self.tokens_applied
    }

    /// True once the session may no longer touch its placeholder.
    pub fn is_finished(&self) -> bool {
        self.phase.is_terminal() || self.handle.cancelled
    }

    /// Close the session without touching the store, e.g. because its
    /// conversation was deleted.
    pub fn cancel(&mut self) {
        if self.is_finished() {
            return;
        }
        self.handle.cancelled = true;
        self.phase = SessionPhase::Failed;
        info!(session_id = %self.handle.session_id, "Session cancelled");
    }

    fn transition(&mut self, to: SessionPhase) {
        debug_assert!(
            can_transition(self.phase, to),
            "invalid session transition {:?} -> {:?}",
            self.phase,
            to
        );
        self.phase = to;
    }

    /// Apply one input, patching the placeholder in `store`.
    ///
    /// Inputs arriving after the session finished are ignored.
    pub fn apply(&mut self, store: &mut ConversationStore, input: SessionInput) -> SessionOutcome {
        if self.is_finished() {
            debug!(
                session_id = %self.handle.session_id,
                "Ignoring input for finished session"
            );
            return SessionOutcome::Ignored;
        }

        match input {
            SessionInput::Opened => {
                if self.phase != SessionPhase::Idle {
                    return SessionOutcome::Ignored;
                }
                self.transition(SessionPhase::Streaming);
                SessionOutcome::Opened
            }
            SessionInput::Record(StreamRecord::Token(text)) => self.apply_token(store, text),
            SessionInput::Record(StreamRecord::Completion(answer)) => {
                let result = store.update_assistant(
                    &self.handle.conversation_id,
                    &self.handle.placeholder_id,
                    Some(self.handle.placeholder_index),
                    |assistant| {
                        assistant.finalize(answer);
                        assistant.clone()
                    },
                );
                self.close(store, SessionPhase::Completed);
                match result {
                    Ok(message) => {
                        info!(
                            session_id = %self.handle.session_id,
                            conversation_id = %self.handle.conversation_id,
                            mode = %message.mode,
                            tokens = self.tokens_applied,
                            "Session completed"
                        );
                        SessionOutcome::Completed(message)
                    }
                    Err(err) => self.dropped(err),
                }
            }
            SessionInput::Record(StreamRecord::Error(message)) => {
                self.fail(store, StreamError::BackendError { message }.into())
            }
            SessionInput::Failed(err) => self.fail(store, err),
            SessionInput::EndOfStream => self.fail(store, StreamError::EndedEarly.into()),
        }
    }

    fn apply_token(&mut self, store: &mut ConversationStore, text: String) -> SessionOutcome {
        if self.phase == SessionPhase::Idle {
            self.transition(SessionPhase::Streaming);
        }

        let result = store.update_assistant(
            &self.handle.conversation_id,
            &self.handle.placeholder_id,
            Some(self.handle.placeholder_index),
            |assistant| assistant.append_token(&text),
        );

        match result {
            Ok(true) => {
                self.tokens_applied += 1;
                SessionOutcome::Token(text)
            }
            Ok(false) => SessionOutcome::Ignored,
            Err(err) => {
                // The placeholder is gone for good; stop listening.
                self.close(store, SessionPhase::Failed);
                self.dropped(err)
            }
        }
    }

    fn fail(&mut self, store: &mut ConversationStore, err: ChatError) -> SessionOutcome {
        let text = err.failure_text();
        let context = err
            .context()
            .map(ErrorContext::to_log_string)
            .unwrap_or_default();
        error!(
            session_id = %self.handle.session_id,
            conversation_id = %self.handle.conversation_id,
            error_code = err.error_code(),
            category = %err.category(),
            context = %context,
            "Session failed: {}",
            err
        );

        let result = store.update_assistant(
            &self.handle.conversation_id,
            &self.handle.placeholder_id,
            Some(self.handle.placeholder_index),
            |assistant| assistant.fail(text.clone()),
        );
        self.close(store, SessionPhase::Failed);

        match result {
            Ok(()) => SessionOutcome::Failed(text),
            Err(state_err) => self.dropped(state_err),
        }
    }

    fn close(&mut self, store: &mut ConversationStore, phase: SessionPhase) {
        self.transition(phase);
        store.release_lease(&self.handle.conversation_id, &self.handle.session_id);
    }

    fn dropped(&self, err: StateError) -> SessionOutcome {
        warn!(
            session_id = %self.handle.session_id,
            error_code = err.error_code(),
            "Dropping session update: {}",
            err
        );
        SessionOutcome::Dropped(err)
    }
}
