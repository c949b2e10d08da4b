//! Query sessions
//!
//! A session covers one question: from submitting it, through the streamed
//! answer, to the finalized or failed assistant message.
//!
//! # Module structure
//! - `handle` - SessionId and the SessionHandle returned to callers
//! - `state` - QuerySession state machine with a single `apply`
//! - `observer` - SessionObserver callbacks and the channel observer
//! - `controller` - QuerySessionController, owner of the store and the streams

mod controller;
mod handle;
mod observer;
mod state;

pub use controller::QuerySessionController;
pub use handle::{SessionHandle, SessionId};
pub use observer::{ChannelObserver, Completion, NoopObserver, SessionNotice, SessionObserver};
pub use state::{can_transition, QuerySession, SessionInput, SessionOutcome, SessionPhase};
