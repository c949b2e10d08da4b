//! SSE payload deserialization structs
//!
//! Internal structs used to deserialize the JSON carried in `data:` lines.

use serde::Deserialize;

/// Token payload: `{"type":"token","content":"..."}`
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct TokenPayload {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
}

impl TokenPayload {
    /// `content`, else `text`.
    pub fn into_text(self) -> String {
        self.content.or(self.text).unwrap_or_default()
    }
}

/// Start payload: `{"type":"start","mode":"rag"}`
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct StartPayload {
    #[serde(default)]
    pub mode: Option<String>,
}

/// Error payload. The text is in `content`; `message` and `detail` are
/// fallbacks, in that order.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ErrorPayload {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub detail: Option<String>,
}

impl ErrorPayload {
    /// First non-blank text field.
    pub fn into_text(self) -> Option<String> {
        [self.content, self.message, self.detail]
            .into_iter()
            .flatten()
            .find(|m| !m.trim().is_empty())
    }
}
