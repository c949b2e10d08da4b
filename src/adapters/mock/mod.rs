//! Mock implementations for testing.
//!
//! - [`MockHttpClient`] - HTTP client with configurable responses and streams
//! - [`RecordingObserver`] - session observer that records every notification

pub mod http;
pub mod observer;

pub use http::{MockHttpClient, MockResponse, RecordedRequest};
pub use observer::RecordingObserver;
