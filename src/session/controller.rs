//! Query session orchestration.
//!
//! The controller owns the [`ConversationStore`]. Streams run on spawned
//! tasks that only forward what they see as [`SessionInput`]s over a
//! channel; every store mutation happens when the owner drains that
//! channel with [`QuerySessionController::process_next`] or
//! [`QuerySessionController::process_pending`].

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use futures_util::StreamExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::backend::{AnswerStream, BackendClient};
use crate::config::ClientConfig;
use crate::error::{
    classify_http_error, ChatError, ChatResult, ErrorContext, ResultExt, StateError,
};
use crate::models::{
    is_pending_id, AssistantMessage, Conversation, ConversationId, Message, MessageId,
};
use crate::sse::StreamInterpreter;
use crate::store::ConversationStore;
use crate::traits::HttpClient;

use super::handle::{SessionHandle, SessionId};
use super::observer::{Completion, NoopObserver, SessionObserver};
use super::state::{QuerySession, SessionInput, SessionOutcome, SessionPhase};

/// Closed sessions whose final phase is still remembered.
const CLOSED_SESSIONS_KEPT: usize = 256;

/// Messages sent from background tasks back to the controller.
#[derive(Debug)]
enum ControllerEvent {
    Session {
        session_id: SessionId,
        input: SessionInput,
    },
    ConversationsListed(ChatResult<Vec<Conversation>>),
}

struct ActiveSession {
    session: QuerySession,
    task: JoinHandle<()>,
}

/// Runs questions against the backend and applies the answers to the
/// conversation store.
pub struct QuerySessionController<H: HttpClient + 'static> {
    backend: Arc<BackendClient<H>>,
    store: ConversationStore,
    sessions: HashMap<SessionId, ActiveSession>,
    /// Final phase of sessions that already closed, oldest first
    closed: VecDeque<(SessionId, SessionPhase)>,
    observer: Arc<dyn SessionObserver>,
    event_tx: mpsc::UnboundedSender<ControllerEvent>,
    event_rx: mpsc::UnboundedReceiver<ControllerEvent>,
    title_max_chars: usize,
}

impl<H: HttpClient + 'static> QuerySessionController<H> {
    pub fn new(backend: BackendClient<H>, config: &ClientConfig) -> Self {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        Self {
            backend: Arc::new(backend),
            store: ConversationStore::new(),
            sessions: HashMap::new(),
            closed: VecDeque::new(),
            observer: Arc::new(NoopObserver),
            event_tx,
            event_rx,
            title_max_chars: config.title_max_chars,
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn SessionObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn store(&self) -> &ConversationStore {
        &self.store
    }

    pub fn backend(&self) -> &BackendClient<H> {
        &self.backend
    }

    /// Number of sessions still running.
    pub fn in_flight(&self) -> usize {
        self.sessions.len()
    }

    /// Current phase of a session, including closed ones.
    pub fn session_phase(&self, session_id: &SessionId) -> Option<SessionPhase> {
        self.sessions
            .get(session_id)
            .map(|active| active.session.phase())
            .or_else(|| {
                self.closed
                    .iter()
                    .find(|(id, _)| id == session_id)
                    .map(|(_, phase)| *phase)
            })
    }

    /// Ask a question.
    ///
    /// Without a `conversation_id` a pending conversation titled after the
    /// question is created and shown immediately, then created on the
    /// backend. The user message and a streaming placeholder are appended
    /// before the stream opens; the answer is applied as events are
    /// processed.
    ///
    /// Fails without touching the conversation when another question is
    /// still being answered in it.
    pub async fn submit(
        &mut self,
        question: &str,
        conversation_id: Option<&str>,
    ) -> ChatResult<SessionHandle> {
        if question.trim().is_empty() {
            return Err(ChatError::client("Question is empty"));
        }

        let session_id = SessionId::generate();
        let conversation_id = match conversation_id {
            Some(id) => match self.store.conversation(id) {
                Some(conversation) => conversation.id.clone(),
                None => {
                    return Err(StateError::ConversationNotFound {
                        conversation_id: id.to_string(),
                    }
                    .into())
                }
            },
            None => self
                .store
                .create_pending_conversation(question, self.title_max_chars),
        };

        self.store
            .acquire_lease(&conversation_id, session_id.clone())?;
        self.store.select(&conversation_id);

        if let Err(err) = self
            .store
            .append_message(&conversation_id, Message::user(question))
        {
            self.store.release_lease(&conversation_id, &session_id);
            return Err(err.into());
        }

        let conversation_id = if is_pending_id(&conversation_id) {
            self.create_remote(&conversation_id, &session_id).await?
        } else {
            conversation_id
        };

        let placeholder = Message::Assistant(AssistantMessage::placeholder());
        let (placeholder_id, index) = match self.store.append_message(&conversation_id, placeholder)
        {
            Ok(appended) => appended,
            Err(err) => {
                self.store.release_lease(&conversation_id, &session_id);
                return Err(err.into());
            }
        };

        let handle = SessionHandle::new(conversation_id.clone(), placeholder_id, index)
            .with_session_id(session_id.clone());

        let task = tokio::spawn(run_stream(
            Arc::clone(&self.backend),
            session_id.clone(),
            conversation_id.clone(),
            question.to_string(),
            self.event_tx.clone(),
        ));

        info!(
            session_id = %session_id,
            conversation_id = %conversation_id,
            "Question submitted"
        );
        self.sessions.insert(
            session_id,
            ActiveSession {
                session: QuerySession::new(handle.clone()),
                task,
            },
        );
        Ok(handle)
    }

    /// Create the backend conversation for a pending one and reconcile the
    /// IDs. On failure the pending conversation keeps the question followed
    /// by a failed answer, and the lease is released.
    async fn create_remote(
        &mut self,
        pending_id: &str,
        session_id: &SessionId,
    ) -> ChatResult<ConversationId> {
        let title = self
            .store
            .conversation(pending_id)
            .map(|c| c.title.clone())
            .unwrap_or_default();

        let created = self.backend.create_conversation(&title).await.with_context(|| {
            ErrorContext::new("create_conversation")
                .with_conversation_id(pending_id)
                .with_session_id(session_id.as_str())
                .with_component("controller")
        });
        match created {
            Ok(real) => {
                let real_id = real.id.clone();
                self.store.reconcile_conversation_id(pending_id, real);
                Ok(real_id)
            }
            Err(err) => {
                let context = err.context().cloned();
                let mut err = ChatError::client(format!(
                    "Could not create conversation: {}",
                    err.user_message()
                ));
                if let Some(context) = context {
                    err = err.with_context(context);
                }
                let text = err.failure_text();
                warn!(conversation_id = %pending_id, error_code = err.error_code(), "{}", text);

                let failed = Message::Assistant(AssistantMessage::failed(text.clone()));
                match self.store.append_message(pending_id, failed) {
                    Ok((message_id, index)) => {
                        let handle = SessionHandle::new(pending_id, message_id, index)
                            .with_session_id(session_id.clone());
                        self.observer.on_error(&handle, &text);
                    }
                    Err(state_err) => {
                        warn!("Could not record setup failure: {}", state_err);
                    }
                }
                self.store.release_lease(pending_id, session_id);
                self.remember_closed(session_id.clone(), SessionPhase::Failed);
                Err(err)
            }
        }
    }

    /// Wait for the next background event and apply it.
    ///
    /// Returns false when nothing can arrive anymore.
    pub async fn process_next(&mut self) -> bool {
        match self.event_rx.recv().await {
            Some(event) => {
                self.handle_event(event);
                true
            }
            None => false,
        }
    }

    /// Apply every event that is already queued. Returns how many there were.
    pub fn process_pending(&mut self) -> usize {
        let mut processed = 0;
        while let Ok(event) = self.event_rx.try_recv() {
            self.handle_event(event);
            processed += 1;
        }
        processed
    }

    /// Process events until the session closes, returning its final phase.
    ///
    /// The closed session is forgotten afterwards, so a later
    /// [`Self::session_phase`] for it returns `None`.
    pub async fn wait_for(&mut self, handle: &SessionHandle) -> Option<SessionPhase> {
        loop {
            let closed = self
                .closed
                .iter()
                .position(|(id, _)| *id == handle.session_id);
            if let Some(pos) = closed {
                return self.closed.remove(pos).map(|(_, phase)| phase);
            }
            if !self.sessions.contains_key(&handle.session_id) {
                return None;
            }
            if !self.process_next().await {
                return self.session_phase(&handle.session_id);
            }
        }
    }

    fn handle_event(&mut self, event: ControllerEvent) {
        match event {
            ControllerEvent::Session { session_id, input } => {
                self.apply_session_input(session_id, input)
            }
            ControllerEvent::ConversationsListed(Ok(conversations)) => {
                debug!(count = conversations.len(), "Conversation list refreshed");
                self.store.replace_conversations(conversations);
            }
            ControllerEvent::ConversationsListed(Err(err)) => {
                warn!(error_code = err.error_code(), "Conversation refresh failed: {}", err);
            }
        }
    }

    fn apply_session_input(&mut self, session_id: SessionId, input: SessionInput) {
        let Some(active) = self.sessions.get_mut(&session_id) else {
            debug!(session_id = %session_id, "Input for closed session ignored");
            return;
        };

        let outcome = active.session.apply(&mut self.store, input);
        let handle = active.session.handle().clone();
        let finished = active.session.is_finished();
        let phase = active.session.phase();

        match outcome {
            SessionOutcome::Token(text) => self.observer.on_token(&handle, &text),
            SessionOutcome::Completed(message) => {
                let completion = Completion {
                    session_id: handle.session_id.clone(),
                    conversation_id: handle.conversation_id.clone(),
                    message_id: handle.placeholder_id.clone(),
                    message,
                };
                self.observer.on_complete(&handle, &completion);
                self.request_refresh();
            }
            SessionOutcome::Failed(text) => self.observer.on_error(&handle, &text),
            SessionOutcome::Opened | SessionOutcome::Ignored | SessionOutcome::Dropped(_) => {}
        }

        if finished {
            self.close_session(&session_id, phase);
        }
    }

    fn close_session(&mut self, session_id: &SessionId, phase: SessionPhase) {
        if let Some(active) = self.sessions.remove(session_id) {
            // Tears down the stream if it is still being read
            active.task.abort();
        }
        self.remember_closed(session_id.clone(), phase);
    }

    fn remember_closed(&mut self, session_id: SessionId, phase: SessionPhase) {
        if self.closed.len() == CLOSED_SESSIONS_KEPT {
            self.closed.pop_front();
        }
        self.closed.push_back((session_id, phase));
    }

    /// Refresh the conversation list in the background.
    fn request_refresh(&self) {
        self.observer.on_conversations_stale();
        let backend = Arc::clone(&self.backend);
        let tx = self.event_tx.clone();
        tokio::spawn(async move {
            let result = backend.list_conversations().await;
            let _ = tx.send(ControllerEvent::ConversationsListed(result));
        });
    }

    /// Create an empty conversation on the backend and make it active.
    pub async fn new_conversation(&mut self, title: &str) -> ChatResult<ConversationId> {
        let conversation = self.backend.create_conversation(title).await?;
        let id = conversation.id.clone();
        self.store.upsert_conversation(conversation);
        self.store.select(&id);
        Ok(id)
    }

    /// Load a conversation's history and make it active.
    ///
    /// A conversation with a question in flight is only selected; its
    /// local messages are newer than the backend's.
    pub async fn open_conversation(&mut self, id: &str) -> ChatResult<ConversationId> {
        if self.store.is_leased(id) {
            self.store.select(id);
            if let Some(conversation) = self.store.conversation(id) {
                return Ok(conversation.id.clone());
            }
        }
        let detail = self.backend.get_conversation(id).await?;
        Ok(self.store.open_conversation(detail))
    }

    /// Delete a conversation, stopping any question in flight in it.
    ///
    /// Pending conversations never reached the backend and are only
    /// removed locally.
    pub async fn delete_conversation(&mut self, id: &str) -> ChatResult<()> {
        let resolved = match self.store.conversation(id) {
            Some(conversation) => conversation.id.clone(),
            None => id.to_string(),
        };

        if !is_pending_id(&resolved) {
            self.backend.delete_conversation(&resolved).await?;
        }

        let doomed: Vec<SessionId> = self
            .sessions
            .iter()
            .filter(|(_, active)| active.session.handle().conversation_id == resolved)
            .map(|(session_id, _)| session_id.clone())
            .collect();
        for session_id in doomed {
            if let Some(active) = self.sessions.get_mut(&session_id) {
                active.session.cancel();
            }
            self.close_session(&session_id, SessionPhase::Failed);
        }

        let was_active = self.store.active_id() == Some(resolved.as_str());
        self.store.remove_conversation(&resolved);

        if was_active {
            self.load_new_head().await;
        }
        Ok(())
    }

    /// Load the history of the conversation that became active after a
    /// deletion. Local-only or busy conversations keep their messages.
    async fn load_new_head(&mut self) {
        let Some(head) = self.store.active_id().map(str::to_string) else {
            return;
        };
        if is_pending_id(&head) || self.store.is_leased(&head) {
            return;
        }
        match self.backend.get_conversation(&head).await {
            Ok(detail) => {
                self.store.open_conversation(detail);
            }
            Err(err) => {
                warn!(
                    conversation_id = %head,
                    error_code = err.error_code(),
                    "Could not load conversation: {}",
                    err
                );
            }
        }
    }

    /// Replace the conversation list with the backend's.
    pub async fn refresh_conversations(&mut self) -> ChatResult<()> {
        let conversations = self.backend.list_conversations().await?;
        self.store.replace_conversations(conversations);
        Ok(())
    }

    pub async fn rename_conversation(&mut self, id: &str, title: &str) -> ChatResult<()> {
        self.backend.rename_conversation(id, title).await?;
        self.store.rename_conversation(id, title);
        Ok(())
    }

    /// Append a notice from the host application to the active conversation.
    pub fn append_system_message(&mut self, text: &str) -> ChatResult<MessageId> {
        let Some(id) = self.store.active_id().map(str::to_string) else {
            return Err(StateError::ConversationNotFound {
                conversation_id: "(none active)".to_string(),
            }
            .into());
        };
        let (message_id, _) = self.store.append_message(&id, Message::system(text))?;
        Ok(message_id)
    }
}

impl<H: HttpClient + 'static> Drop for QuerySessionController<H> {
    fn drop(&mut self) {
        for active in self.sessions.values() {
            active.task.abort();
        }
    }
}

/// Open the answer stream for one question and forward everything that
/// happens to the controller. Stops after a terminal record.
async fn run_stream<H: HttpClient>(
    backend: Arc<BackendClient<H>>,
    session_id: SessionId,
    conversation_id: ConversationId,
    question: String,
    tx: mpsc::UnboundedSender<ControllerEvent>,
) {
    let forward = |input: SessionInput| {
        tx.send(ControllerEvent::Session {
            session_id: session_id.clone(),
            input,
        })
        .is_ok()
    };

    let context = || {
        ErrorContext::new("ask")
            .with_conversation_id(conversation_id.as_str())
            .with_session_id(session_id.as_str())
            .with_component("run_stream")
    };

    let answer = match backend
        .ask(&question, Some(&conversation_id))
        .await
        .with_context(context)
    {
        Ok(answer) => answer,
        Err(err) => {
            forward(SessionInput::Failed(err));
            return;
        }
    };

    let mut frames = match answer {
        AnswerStream::Complete(record) => {
            forward(SessionInput::Record(record));
            return;
        }
        AnswerStream::Frames(frames) => frames,
    };

    if !forward(SessionInput::Opened) {
        return;
    }

    let mut interpreter = StreamInterpreter::new();
    while let Some(item) = frames.next().await {
        match item {
            Ok(frame) => {
                let Some(record) = interpreter.interpret(&frame) else {
                    continue;
                };
                let terminal = record.is_terminal();
                if !forward(SessionInput::Record(record)) || terminal {
                    return;
                }
            }
            Err(err) => {
                let url = backend.ask_url(Some(&conversation_id));
                let err = ChatError::from(classify_http_error(err, &url)).with_context(context());
                forward(SessionInput::Failed(err));
                return;
            }
        }
    }

    debug!(
        session_id = %session_id,
        frames = interpreter.frames_seen(),
        skipped = interpreter.frames_skipped(),
        "Stream ended without a terminal event"
    );
    forward(SessionInput::EndOfStream);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::mock::{MockHttpClient, MockResponse, RecordingObserver};
    use crate::traits::HttpError;

    const BASE: &str = "http://api.test";

    fn controller(mock: &MockHttpClient) -> (QuerySessionController<MockHttpClient>, RecordingObserver) {
        let config = ClientConfig::default().with_base_url(BASE);
        let observer = RecordingObserver::new();
        let controller = QuerySessionController::new(BackendClient::new(mock.clone(), &config), &config)
            .with_observer(Arc::new(observer.clone()));
        (controller, observer)
    }

    fn created(mock: &MockHttpClient, id: u32) {
        mock.set_response(
            "http://api.test/conversations",
            MockResponse::json(200, format!(r#"{{"id": {}, "title": "t"}}"#, id)),
        );
    }

    #[tokio::test]
    async fn test_empty_question_rejected() {
        let mock = MockHttpClient::new();
        let (mut controller, _) = controller(&mock);

        assert!(controller.submit("   ", None).await.is_err());
        assert_eq!(controller.store().conversation_count(), 0);
        assert!(mock.get_requests().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_conversation_rejected() {
        let mock = MockHttpClient::new();
        let (mut controller, _) = controller(&mock);

        let err = controller.submit("q", Some("404")).await.unwrap_err();
        assert!(matches!(
            err,
            ChatError::State(StateError::ConversationNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_creation_failure_leaves_failed_answer() {
        let mock = MockHttpClient::new();
        mock.set_response(
            "http://api.test/conversations",
            MockResponse::Error(HttpError::ConnectionFailed("refused".to_string())),
        );
        let (mut controller, observer) = controller(&mock);

        let err = controller.submit("How many orders?", None).await.unwrap_err();
        assert_eq!(err.origin().as_str(), "client");
        assert_eq!(err.context().unwrap().operation, "create_conversation");

        let conversations = controller.store().conversations();
        assert_eq!(conversations.len(), 1);
        assert!(conversations[0].is_pending());

        let messages = controller.store().active_messages();
        assert_eq!(messages.len(), 2);
        let failed = messages[1].as_assistant().unwrap();
        assert!(!failed.success);
        assert!(failed.content.starts_with("Error (client)"));

        assert_eq!(observer.errors().len(), 1);
        assert!(mock.requests_with_method("POST").iter().all(|r| !r.url.contains("/ask")));
        assert!(!controller.store().is_leased(&conversations[0].id.clone()));
    }

    #[tokio::test]
    async fn test_system_message_needs_active_conversation() {
        let mock = MockHttpClient::new();
        created(&mock, 4);
        let (mut controller, _) = controller(&mock);

        assert!(controller.append_system_message("Uploaded sales.csv").is_err());

        controller.new_conversation("Uploads").await.unwrap();
        controller.append_system_message("Uploaded sales.csv").unwrap();

        let messages = controller.store().active_messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].content(), "Uploaded sales.csv");
    }

    #[tokio::test]
    async fn test_question_text_kept_verbatim() {
        let mock = MockHttpClient::new();
        created(&mock, 3);
        mock.set_response(
            "http://api.test/ask/stream",
            MockResponse::sse(["data: {\"type\":\"end\"}\n\n"]),
        );
        let (mut controller, _) = controller(&mock);

        let handle = controller.submit("  Top 5 products?\n", None).await.unwrap();
        controller.wait_for(&handle).await;

        let messages = controller.store().messages("3");
        assert_eq!(messages[0].content(), "  Top 5 products?\n");
        assert_eq!(controller.store().conversation("3").unwrap().title, "t");

        let ask = mock
            .requests_with_method("POST")
            .into_iter()
            .find(|r| r.url.contains("/ask/stream"))
            .unwrap();
        assert_eq!(
            ask.body.as_deref(),
            Some(r#"{"query":"  Top 5 products?\n"}"#)
        );
    }

    #[tokio::test]
    async fn test_stream_failure_carries_context() {
        let mock = MockHttpClient::new();
        mock.set_response(
            "http://api.test/ask/stream",
            MockResponse::Error(HttpError::ConnectionFailed("refused".to_string())),
        );
        let config = ClientConfig::default().with_base_url(BASE);
        let backend = Arc::new(BackendClient::new(mock, &config));
        let (tx, mut rx) = mpsc::unbounded_channel();
        let session_id = SessionId::generate();

        run_stream(backend, session_id.clone(), "7".to_string(), "q".to_string(), tx).await;

        match rx.recv().await {
            Some(ControllerEvent::Session {
                input: SessionInput::Failed(err),
                ..
            }) => {
                let context = err.context().unwrap();
                assert_eq!(context.operation, "ask");
                assert_eq!(context.conversation_id.as_deref(), Some("7"));
                assert_eq!(context.session_id.as_deref(), Some(session_id.as_str()));
                assert!(err.failure_text().starts_with("Error (system): "));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_closed_sessions_are_forgotten() {
        let mock = MockHttpClient::new();
        created(&mock, 2);
        mock.set_response(
            "http://api.test/ask/stream",
            MockResponse::sse(["data: {\"type\":\"end\"}\n\n"]),
        );
        let (mut controller, _) = controller(&mock);

        let handle = controller.submit("q", None).await.unwrap();
        assert_eq!(
            controller.wait_for(&handle).await,
            Some(SessionPhase::Completed)
        );
        assert_eq!(controller.session_phase(&handle.session_id), None);

        let first = SessionId::generate();
        controller.remember_closed(first.clone(), SessionPhase::Failed);
        for _ in 0..CLOSED_SESSIONS_KEPT {
            controller.remember_closed(SessionId::generate(), SessionPhase::Completed);
        }
        assert_eq!(controller.closed.len(), CLOSED_SESSIONS_KEPT);
        assert_eq!(controller.session_phase(&first), None);
    }
}
