//! Trait abstractions for dependency injection and testability.
//!
//! - [`HttpClient`] - HTTP client operations (GET, POST, PATCH, DELETE, streaming)
//! - [`SessionObserver`](crate::session::SessionObserver) lives with the session
//!   state machine it reports on.

pub mod http;

pub use http::{ByteStream, Headers, HttpClient, HttpError, Response, StreamingResponse};
