//! SSE line and frame parsing.
//!
//! Turns the text of one complete frame into an [`SseFrame`], and an
//! [`SseFrame`] into a typed [`SseEvent`].

use serde_json::Value;

use crate::error::StreamError;
use crate::models::{AnswerMode, FinalAnswer};
use crate::sse::events::{SseEvent, SseFrame, SseLine};
use crate::sse::payloads::{ErrorPayload, StartPayload, TokenPayload};

/// Text shown when an error frame carries no message.
const UNKNOWN_BACKEND_ERROR: &str = "Unknown error";

/// Parse a single SSE line into its component type
pub fn parse_sse_line(line: &str) -> SseLine {
    if line.is_empty() {
        return SseLine::Empty;
    }

    if let Some(stripped) = line.strip_prefix(':') {
        return SseLine::Comment(stripped.trim().to_string());
    }

    if let Some(rest) = line.strip_prefix("event:") {
        return SseLine::Event(rest.trim().to_string());
    }

    if let Some(rest) = line.strip_prefix("data:") {
        return SseLine::Data(rest.trim().to_string());
    }

    // Unknown line format - treat as comment
    SseLine::Comment(line.to_string())
}

/// Parse the text of one frame (no blank lines inside) into an [`SseFrame`].
///
/// Multiple `data:` lines are joined with `\n`; the last `event:` line wins.
pub fn parse_sse_frame(text: &str) -> SseFrame {
    let mut frame = SseFrame::default();
    let mut data_lines: Vec<String> = Vec::new();

    for line in text.split('\n') {
        match parse_sse_line(line) {
            SseLine::Event(event_type) if !event_type.is_empty() => {
                frame.event = Some(event_type);
            }
            SseLine::Data(data) => data_lines.push(data),
            SseLine::Event(_) | SseLine::Empty | SseLine::Comment(_) => {}
        }
    }

    frame.data = data_lines.join("\n");
    frame
}

/// Parse a frame into a typed event.
///
/// The event type comes from the frame's `event:` line when present,
/// otherwise from the `type` field of the JSON payload. Unknown types are
/// reported as [`SseEvent::Ping`] so they are ignored rather than failing
/// the stream.
pub fn parse_sse_event(frame: &SseFrame) -> Result<SseEvent, StreamError> {
    let declared = frame.event.as_deref();

    if frame.data.is_empty() {
        return match declared {
            Some("end") | Some("done") => Ok(SseEvent::End {
                answer: FinalAnswer::bare(),
            }),
            Some("token") | Some("error") => Err(StreamError::MissingData {
                event_type: declared.unwrap_or_default().to_string(),
            }),
            Some(_) => Ok(SseEvent::Ping),
            None => Err(StreamError::MissingData {
                event_type: "unknown".to_string(),
            }),
        };
    }

    let value: Value =
        serde_json::from_str(&frame.data).map_err(|e| StreamError::InvalidJson {
            event_type: declared.unwrap_or("unknown").to_string(),
            message: e.to_string(),
        })?;

    let event_type = match declared {
        Some(event_type) => event_type.to_string(),
        None => value
            .get("type")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| StreamError::InvalidJson {
                event_type: "unknown".to_string(),
                message: "missing \"type\" field".to_string(),
            })?,
    };

    match event_type.as_str() {
        "token" => {
            let payload: TokenPayload = decode(&event_type, &value)?;
            Ok(SseEvent::Token {
                content: payload.into_text(),
            })
        }
        "end" | "done" => Ok(SseEvent::End {
            answer: FinalAnswer::from_body(&value),
        }),
        "error" => {
            // An error frame always ends the answer, even with odd fields
            let message = decode::<ErrorPayload>(&event_type, &value)
                .ok()
                .and_then(ErrorPayload::into_text)
                .unwrap_or_else(|| UNKNOWN_BACKEND_ERROR.to_string());
            Ok(SseEvent::Error { message })
        }
        "start" => {
            let payload: StartPayload = decode(&event_type, &value)?;
            Ok(SseEvent::Start {
                mode: AnswerMode::parse(payload.mode.as_deref()),
            })
        }
        // Ignore unknown events instead of erroring
        _ => Ok(SseEvent::Ping),
    }
}

fn decode<T: serde::de::DeserializeOwned>(event_type: &str, value: &Value) -> Result<T, StreamError> {
    serde_json::from_value(value.clone()).map_err(|e| StreamError::InvalidJson {
        event_type: event_type.to_string(),
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sse_line_variants() {
        assert_eq!(parse_sse_line(""), SseLine::Empty);
        assert_eq!(
            parse_sse_line(": keep-alive"),
            SseLine::Comment("keep-alive".to_string())
        );
        assert_eq!(
            parse_sse_line("event: token"),
            SseLine::Event("token".to_string())
        );
        assert_eq!(
            parse_sse_line("data: {\"type\":\"end\"}"),
            SseLine::Data("{\"type\":\"end\"}".to_string())
        );
        assert_eq!(
            parse_sse_line("retry: 100"),
            SseLine::Comment("retry: 100".to_string())
        );
    }

    #[test]
    fn test_parse_frame_joins_data_lines() {
        let frame = parse_sse_frame(": hi\nevent: token\ndata: {\"content\":\ndata: \"x\"}");
        assert_eq!(frame.event.as_deref(), Some("token"));
        assert_eq!(frame.data, "{\"content\":\n\"x\"}");
    }

    #[test]
    fn test_parse_token_event() {
        let event =
            parse_sse_event(&SseFrame::data(r#"{"type":"token","content":"Hello"}"#)).unwrap();
        assert_eq!(
            event,
            SseEvent::Token {
                content: "Hello".to_string()
            }
        );
    }

    #[test]
    fn test_token_with_null_content_is_empty() {
        let event =
            parse_sse_event(&SseFrame::data(r#"{"type":"token","content":null}"#)).unwrap();
        assert_eq!(
            event,
            SseEvent::Token {
                content: String::new()
            }
        );
    }

    #[test]
    fn test_parse_bare_end() {
        let event = parse_sse_event(&SseFrame::data(r#"{"type":"end","content":null}"#)).unwrap();
        assert_eq!(
            event,
            SseEvent::End {
                answer: FinalAnswer::bare()
            }
        );
    }

    #[test]
    fn test_parse_end_with_structured_answer() {
        let event = parse_sse_event(&SseFrame::data(
            r#"{"type":"end","mode":"aggregation","answer":"3 rows","sources":[{"a":1}]}"#,
        ))
        .unwrap();
        match event {
            SseEvent::End { answer } => {
                assert_eq!(answer.mode, AnswerMode::Aggregation);
                assert_eq!(answer.answer, "3 rows");
            }
            other => panic!("expected End, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_error_event_aliases() {
        let content =
            parse_sse_event(&SseFrame::data(r#"{"type":"error","content":"boom"}"#)).unwrap();
        assert_eq!(
            content,
            SseEvent::Error {
                message: "boom".to_string()
            }
        );

        let message =
            parse_sse_event(&SseFrame::data(r#"{"type":"error","message":"bang"}"#)).unwrap();
        assert_eq!(
            message,
            SseEvent::Error {
                message: "bang".to_string()
            }
        );

        let empty = parse_sse_event(&SseFrame::data(r#"{"type":"error"}"#)).unwrap();
        assert_eq!(
            empty,
            SseEvent::Error {
                message: "Unknown error".to_string()
            }
        );
    }

    #[test]
    fn test_error_event_with_several_text_fields() {
        let both = parse_sse_event(&SseFrame::data(
            r#"{"type":"error","content":"DB down","detail":"trace"}"#,
        ))
        .unwrap();
        assert_eq!(
            both,
            SseEvent::Error {
                message: "DB down".to_string()
            }
        );

        let blank_content = parse_sse_event(&SseFrame::data(
            r#"{"type":"error","content":"  ","message":"bang","detail":"trace"}"#,
        ))
        .unwrap();
        assert_eq!(
            blank_content,
            SseEvent::Error {
                message: "bang".to_string()
            }
        );

        let odd = parse_sse_event(&SseFrame::data(r#"{"type":"error","content":{"code":5}}"#))
            .unwrap();
        assert_eq!(
            odd,
            SseEvent::Error {
                message: "Unknown error".to_string()
            }
        );

        let token = parse_sse_event(&SseFrame::data(
            r#"{"type":"token","content":"Hi","text":"ignored"}"#,
        ))
        .unwrap();
        assert_eq!(
            token,
            SseEvent::Token {
                content: "Hi".to_string()
            }
        );
    }

    #[test]
    fn test_start_and_unknown_events_are_harmless() {
        let start = parse_sse_event(&SseFrame::data(r#"{"type":"start","mode":"rag"}"#)).unwrap();
        assert_eq!(
            start,
            SseEvent::Start {
                mode: AnswerMode::Rag
            }
        );

        let unknown = parse_sse_event(&SseFrame::data(r#"{"type":"sources","items":[]}"#)).unwrap();
        assert_eq!(unknown, SseEvent::Ping);
    }

    #[test]
    fn test_event_line_overrides_json_type() {
        let frame = SseFrame {
            event: Some("error".to_string()),
            data: r#"{"type":"token","content":"nope"}"#.to_string(),
        };
        assert_eq!(
            parse_sse_event(&frame).unwrap(),
            SseEvent::Error {
                message: "nope".to_string()
            }
        );
    }

    #[test]
    fn test_malformed_frames_are_errors() {
        let garbage = parse_sse_event(&SseFrame::data("{not json")).unwrap_err();
        assert!(matches!(garbage, StreamError::InvalidJson { .. }));
        assert!(garbage.is_frame_level());

        let untyped = parse_sse_event(&SseFrame::data(r#"{"content":"x"}"#)).unwrap_err();
        assert!(matches!(untyped, StreamError::InvalidJson { .. }));

        let empty_token = parse_sse_event(&SseFrame {
            event: Some("token".to_string()),
            data: String::new(),
        })
        .unwrap_err();
        assert_eq!(
            empty_token,
            StreamError::MissingData {
                event_type: "token".to_string()
            }
        );
    }
}
