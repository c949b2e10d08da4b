//! Client for the answering service.
//!
//! Wraps an [`HttpClient`] with the backend's endpoints: the streamed
//! question endpoint and the conversation CRUD around it.

use futures_util::StreamExt;
use tracing::{debug, info};

use crate::config::ClientConfig;
use crate::error::{classify_http_error, extract_detail, ChatResult, NetworkError};
use crate::models::{
    Conversation, ConversationDetail, CreateConversationRequest, QueryRequest,
};
use crate::sse::{decode_frames, interpret_body, FrameStream, StreamRecord};
use crate::traits::{Headers, HttpClient, HttpError, Response};

/// How the answer to a question arrives.
pub enum AnswerStream {
    /// An event stream, decoded into frames as bytes arrive
    Frames(FrameStream),
    /// A complete JSON answer, already interpreted
    Complete(StreamRecord),
}

impl std::fmt::Debug for AnswerStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AnswerStream::Frames(_) => f.write_str("AnswerStream::Frames(..)"),
            AnswerStream::Complete(record) => {
                f.debug_tuple("AnswerStream::Complete").field(record).finish()
            }
        }
    }
}

/// Client for the answering service API.
pub struct BackendClient<H: HttpClient> {
    http: H,
    /// Base URL without a trailing slash
    pub base_url: String,
    auth_token: Option<String>,
}

impl<H: HttpClient> BackendClient<H> {
    pub fn new(http: H, config: &ClientConfig) -> Self {
        Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            auth_token: config.auth_token.clone(),
        }
    }

    pub fn http(&self) -> &H {
        &self.http
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn conversation_url(&self, id: &str) -> String {
        self.url(&format!("/conversations/{}", urlencoding::encode(id)))
    }

    /// URL of the question endpoint, attached to a conversation if given.
    pub fn ask_url(&self, conversation_id: Option<&str>) -> String {
        match conversation_id {
            Some(id) => self.url(&format!(
                "/ask/stream?conversation_id={}",
                urlencoding::encode(id)
            )),
            None => self.url("/ask/stream"),
        }
    }

    fn headers(&self) -> Headers {
        let mut headers = Headers::new();
        headers.insert("Content-Type".to_string(), "application/json".to_string());
        if let Some(token) = &self.auth_token {
            headers.insert("Authorization".to_string(), format!("Bearer {}", token));
        }
        headers
    }

    /// Turn a buffered result into a successful response or a classified error.
    fn check(result: Result<Response, HttpError>, url: &str) -> Result<Response, NetworkError> {
        let response = result.map_err(|e| classify_http_error(e, url))?;
        if !response.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(NetworkError::HttpStatus {
                status: response.status,
                message: extract_detail(&body),
            });
        }
        Ok(response)
    }

    /// Check if the backend is reachable and healthy.
    pub async fn health(&self) -> ChatResult<bool> {
        let url = self.url("/health");
        let result = self.http.get(&url, &self.headers()).await;
        match result {
            Ok(response) => Ok(response.is_success()),
            Err(e) => Err(classify_http_error(e, &url).into()),
        }
    }

    /// Fetch all conversations, most recent first.
    pub async fn list_conversations(&self) -> ChatResult<Vec<Conversation>> {
        let url = self.url("/conversations");
        let response = Self::check(self.http.get(&url, &self.headers()).await, &url)?;
        let conversations: Vec<Conversation> = response.json()?;
        debug!(count = conversations.len(), "Fetched conversations");
        Ok(conversations)
    }

    /// Create a conversation with the given title.
    pub async fn create_conversation(&self, title: &str) -> ChatResult<Conversation> {
        let url = self.url("/conversations");
        let body = serde_json::to_string(&CreateConversationRequest::new(title))?;
        let response = Self::check(self.http.post(&url, &body, &self.headers()).await, &url)?;
        let conversation: Conversation = response.json()?;
        info!(conversation_id = %conversation.id, "Created conversation");
        Ok(conversation)
    }

    /// Fetch a conversation with its full message history.
    pub async fn get_conversation(&self, id: &str) -> ChatResult<ConversationDetail> {
        let url = self.conversation_url(id);
        let response = Self::check(self.http.get(&url, &self.headers()).await, &url)?;
        Ok(response.json()?)
    }

    pub async fn delete_conversation(&self, id: &str) -> ChatResult<()> {
        let url = self.conversation_url(id);
        Self::check(self.http.delete(&url, &self.headers()).await, &url)?;
        info!(conversation_id = %id, "Deleted conversation");
        Ok(())
    }

    /// Rename a conversation. The title travels as a query parameter.
    pub async fn rename_conversation(&self, id: &str, title: &str) -> ChatResult<()> {
        let url = format!(
            "{}/title?title={}",
            self.conversation_url(id),
            urlencoding::encode(title)
        );
        Self::check(self.http.patch(&url, "", &self.headers()).await, &url)?;
        Ok(())
    }

    /// Send a question and start receiving its answer.
    ///
    /// An event-stream response is returned undecoded past framing; any
    /// other content type is read to the end and interpreted as a complete
    /// answer. Failures to reach the backend and non-success statuses are
    /// returned before any record exists.
    pub async fn ask(
        &self,
        question: &str,
        conversation_id: Option<&str>,
    ) -> ChatResult<AnswerStream> {
        let url = self.ask_url(conversation_id);
        let body = serde_json::to_string(&QueryRequest::new(question))?;
        let mut headers = self.headers();
        headers.insert(
            "Accept".to_string(),
            "text/event-stream, application/json".to_string(),
        );

        let response = self
            .http
            .post_stream(&url, &body, &headers)
            .await
            .map_err(|e| classify_http_error(e, &url))?;

        if response.is_event_stream() {
            debug!(url = %url, "Answer is streamed");
            return Ok(AnswerStream::Frames(decode_frames(response.body)));
        }

        debug!(
            url = %url,
            content_type = ?response.content_type(),
            "Answer is a complete body"
        );
        let mut body = response.body;
        let mut collected = Vec::new();
        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(|e| classify_http_error(e, &url))?;
            collected.extend_from_slice(&chunk);
        }
        Ok(AnswerStream::Complete(interpret_body(&collected)?))
    }
}
