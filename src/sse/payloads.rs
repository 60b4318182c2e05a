//! SSE payload deserialization structs
//!
//! Contains internal structs used to deserialize JSON data payloads
//! from the conversation stream.

use serde::Deserialize;

/// Payload of a `text_delta` frame
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct TextDeltaPayload {
    pub text: String,
}

/// Payload of an `error` frame
///
/// NestJS-style bodies carry both keys (`{statusCode, message, error}`);
/// `message` is the human-readable one.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ErrorPayload {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ErrorPayload {
    /// First non-blank of `message` and `error`.
    pub fn into_message(self) -> Option<String> {
        [self.message, self.error]
            .into_iter()
            .flatten()
            .find(|m| !m.trim().is_empty())
    }
}
