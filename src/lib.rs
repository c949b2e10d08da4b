//! datachat - a streaming client for conversational data questions
//!
//! Questions go to an answering service that streams the answer back as
//! server-sent events. The crate decodes the stream, applies it to a local
//! conversation store and finalizes it as plain text, tabular rows or a
//! chart.
//!
//! This library exposes modules for use by the binary and integration tests.

pub mod adapters;
pub mod backend;
pub mod cli;
pub mod config;
pub mod error;
pub mod models;
pub mod session;
pub mod sse;
pub mod store;
pub mod traits;
