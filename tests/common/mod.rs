//! Common test utilities for integration tests.
//!
//! SSE body builders, chunking helpers and controller fixtures shared by
//! the integration tests.
//!
//! # Example
//!
//! ```ignore
//! let body = sse_body(&[token_frame("A"), end_frame()]);
//! mock.set_response(ASK_URL, MockResponse::Stream(chunk_every(&body, 3)));
//! ```

#![allow(dead_code)]

use std::sync::Arc;

use bytes::Bytes;
use datachat::adapters::mock::{MockHttpClient, MockResponse, RecordingObserver};
use datachat::backend::BackendClient;
use datachat::config::ClientConfig;
use datachat::session::QuerySessionController;
use serde_json::json;

pub const BASE_URL: &str = "http://api.test";
pub const ASK_URL: &str = "http://api.test/ask/stream";
pub const CONVERSATIONS_URL: &str = "http://api.test/conversations";

/// One `data:` frame carrying `payload`.
pub fn data_frame(payload: &serde_json::Value) -> String {
    format!("data: {}\n\n", payload)
}

pub fn start_frame(mode: &str) -> String {
    data_frame(&json!({"type": "start", "mode": mode}))
}

pub fn token_frame(text: &str) -> String {
    data_frame(&json!({"type": "token", "content": text}))
}

/// The backend's bare end frame.
pub fn end_frame() -> String {
    data_frame(&json!({"type": "end", "content": null}))
}

pub fn error_frame(message: &str) -> String {
    data_frame(&json!({"type": "error", "content": message}))
}

/// Concatenate frames into one body.
pub fn sse_body(frames: &[String]) -> String {
    frames.concat()
}

/// Split a body into chunks of at most `size` bytes, ignoring character
/// boundaries.
pub fn chunk_every(body: &str, size: usize) -> Vec<Bytes> {
    body.as_bytes()
        .chunks(size.max(1))
        .map(Bytes::copy_from_slice)
        .collect()
}

/// Split a body at the given byte offsets.
pub fn split_at(body: &str, cuts: &[usize]) -> Vec<Bytes> {
    let bytes = body.as_bytes();
    let mut chunks = Vec::new();
    let mut start = 0;
    for &cut in cuts {
        let cut = cut.min(bytes.len());
        if cut > start {
            chunks.push(Bytes::copy_from_slice(&bytes[start..cut]));
            start = cut;
        }
    }
    chunks.push(Bytes::copy_from_slice(&bytes[start..]));
    chunks
}

/// JSON of a backend conversation.
pub fn conversation_json(id: u64, title: &str) -> String {
    json!({
        "id": id,
        "title": title,
        "created_at": "2024-05-01T10:00:00",
        "updated_at": "2024-05-01T10:05:00.123456",
        "message_count": 0
    })
    .to_string()
}

/// Mock whose conversation creation returns `id`.
pub fn mock_with_created(id: u64) -> MockHttpClient {
    let mock = MockHttpClient::new();
    mock.set_response(
        CONVERSATIONS_URL,
        MockResponse::json(200, conversation_json(id, "New")),
    );
    mock
}

pub fn test_config() -> ClientConfig {
    ClientConfig::default()
        .with_base_url(BASE_URL)
        .with_auth_token("test-token")
}

/// Controller over `mock` with a recording observer.
pub fn controller_with(
    mock: &MockHttpClient,
) -> (QuerySessionController<MockHttpClient>, RecordingObserver) {
    let config = test_config();
    let observer = RecordingObserver::new();
    let controller = QuerySessionController::new(BackendClient::new(mock.clone(), &config), &config)
        .with_observer(Arc::new(observer.clone()));
    (controller, observer)
}
