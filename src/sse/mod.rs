//! SSE (Server-Sent Events) stream handling
//!
//! The answering service streams frames separated by a blank line:
//! - `data: <json>` - data payload line, `{"type": "token" | "end" | "error" | "start", ...}`
//! - `event: <type>` - optional event type line, overrides the JSON `type`
//! - Lines starting with `:` - comments (ignored)
//!
//! # Module structure
//! - `decoder` - chunk buffering and framing (FrameDecoder, decode_frames)
//! - `events` - line, frame and event types
//! - `interpreter` - frame to StreamRecord classification, complete-body answers
//! - `parser` - line/frame/event parsing functions
//! - `payloads` - internal payload deserialization structs

mod decoder;
mod events;
mod interpreter;
mod parser;
mod payloads;

pub use decoder::{decode_frames, FrameDecoder, FrameStream};
pub use events::{SseEvent, SseFrame, SseLine};
pub use interpreter::{interpret_body, StreamInterpreter, StreamRecord};
pub use parser::{parse_sse_event, parse_sse_frame, parse_sse_line};
