//! Simple line-based output for the CLI.

use std::io::{self, Write};

use crate::models::{AssistantMessage, Conversation, Message, StructuredPayload};

/// Line width for separators.
const LINE_WIDTH: usize = 60;

/// Write a header.
///
/// ```text
/// Revenue questions
/// ────────────────────────────────────────────────────────────
/// ```
pub fn write_header<W: Write>(out: &mut W, title: &str) -> io::Result<()> {
    writeln!(out, "{}", title)?;
    writeln!(out, "{}", "─".repeat(LINE_WIDTH))
}

/// One line of `datachat list`.
///
/// ```text
///     12  Total revenue by region  (4 messages, 2024-05-01 10:00)
/// ```
pub fn format_conversation_line(conversation: &Conversation) -> String {
    let title = if conversation.title.is_empty() {
        "(untitled)"
    } else {
        conversation.title.as_str()
    };
    let mut line = format!(
        "{:>6}  {}  ({} messages",
        conversation.id, title, conversation.message_count
    );
    if let Some(updated) = conversation.updated_at.or(conversation.created_at) {
        line.push_str(&format!(", {}", updated.format("%Y-%m-%d %H:%M")));
    }
    line.push(')');
    line
}

/// Lines describing a structured answer.
pub fn format_payload(payload: &StructuredPayload) -> Vec<String> {
    match payload {
        StructuredPayload::Chart(chart) => {
            let mut lines = Vec::new();
            let kind = chart.chart_type.as_deref().unwrap_or("chart");
            match chart.title.as_deref() {
                Some(title) if !title.is_empty() => lines.push(format!("[{}] {}", kind, title)),
                _ => lines.push(format!("[{}] {}", kind, chart.series_label())),
            }
            for (label, value) in chart.points() {
                lines.push(format!("  {}: {}", label, value));
            }
            lines
        }
        StructuredPayload::Rows(rows) => rows
            .iter()
            .map(|row| format!("  {}", row))
            .collect(),
    }
}

/// The visible text of an assistant message, payload included.
pub fn format_answer(message: &AssistantMessage) -> Vec<String> {
    let mut lines = Vec::new();
    if !message.content.is_empty() {
        lines.push(message.content.clone());
    }
    if let Some(payload) = &message.payload {
        lines.extend(format_payload(payload));
    }
    lines
}

/// Lines of `datachat show` for one message.
pub fn format_message(message: &Message) -> Vec<String> {
    match message {
        Message::User { content, .. } => vec![format!("> {}", content)],
        Message::System { content, .. } => vec![format!("* {}", content)],
        Message::Assistant(assistant) => {
            let mut lines = format_answer(assistant);
            if lines.is_empty() {
                lines.push("(no answer)".to_string());
            }
            lines
        }
    }
}
