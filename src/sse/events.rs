//! SSE frame and event type definitions

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Frame type carrying a text fragment.
pub const TEXT_DELTA: &str = "text_delta";
/// Frame type carrying phase/progress information.
pub const METADATA: &str = "metadata";
/// Frame type carrying the final structured result.
pub const MESSAGE_COMPLETE: &str = "message_complete";
/// Frame type carrying a server-side failure.
pub const ERROR: &str = "error";

/// Represents a parsed SSE line
#[derive(Debug, Clone, PartialEq)]
pub enum SseLine {
    /// Event type declaration: `event: <type>`
    Event(String),
    /// Data payload: `data: <json>`
    Data(String),
    /// Empty line (frame separator)
    Empty,
    /// Comment line: `: <comment>`
    Comment(String),
}

/// One `event:`/`data:` line pair off the wire.
///
/// The payload is guaranteed to be well-formed JSON; frames whose payload
/// does not decode are dropped by the parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamFrame {
    pub event_type: String,
    pub payload: String,
}

impl StreamFrame {
    pub fn new(event_type: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            payload: payload.into(),
        }
    }
}

/// Progress information replaced wholesale by each `metadata` frame.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamMetadata {
    #[serde(default)]
    pub phase: Option<String>,
    #[serde(default)]
    pub is_completed: Option<bool>,
    /// Identifier of the assistant message being produced (string or number)
    #[serde(default)]
    pub assistant_message_id: Option<Value>,
    /// Identifier of the stored user message (string or number)
    #[serde(default)]
    pub user_message_id: Option<Value>,
    /// Specification snapshot, when the backend sends one
    #[serde(default)]
    pub specification: Option<Value>,
}

/// Typed conversation event decoded from a [`StreamFrame`].
#[derive(Debug, Clone, PartialEq)]
pub enum ConversationEvent {
    /// Partial assistant text, appended in arrival order
    TextDelta { text: String },
    /// Latest phase/progress information
    Metadata(StreamMetadata),
    /// Final structured result; terminal
    MessageComplete(Value),
    /// Server-reported failure; terminal
    Error { message: String },
}

impl ConversationEvent {
    /// Get the wire type name of this event
    pub fn event_type_name(&self) -> &'static str {
        match self {
            ConversationEvent::TextDelta { .. } => TEXT_DELTA,
            ConversationEvent::Metadata(_) => METADATA,
            ConversationEvent::MessageComplete(_) => MESSAGE_COMPLETE,
            ConversationEvent::Error { .. } => ERROR,
        }
    }
}

/// Errors that can occur while decoding a frame into a typed event
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SseParseError {
    /// Payload is not valid JSON, or lacks the fields its type requires
    #[error("Invalid payload for event '{event_type}': {details}")]
    InvalidPayload { event_type: String, details: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_type_name() {
        assert_eq!(
            ConversationEvent::TextDelta {
                text: String::new()
            }
            .event_type_name(),
            "text_delta"
        );
        assert_eq!(
            ConversationEvent::Metadata(StreamMetadata::default()).event_type_name(),
            "metadata"
        );
        assert_eq!(
            ConversationEvent::MessageComplete(Value::Null).event_type_name(),
            "message_complete"
        );
    }

    #[test]
    fn test_metadata_accepts_numeric_and_string_ids() {
        let meta: StreamMetadata = serde_json::from_str(
            r#"{"phase":"drafting","isCompleted":false,"assistantMessageId":12,"userMessageId":"u-3"}"#,
        )
        .unwrap();
        assert_eq!(meta.phase.as_deref(), Some("drafting"));
        assert_eq!(meta.is_completed, Some(false));
        assert_eq!(meta.assistant_message_id, Some(Value::from(12)));
        assert_eq!(meta.user_message_id, Some(Value::from("u-3")));
        assert!(meta.specification.is_none());
    }

    #[test]
    fn test_parse_error_display() {
        let err = SseParseError::InvalidPayload {
            event_type: "text_delta".to_string(),
            details: "missing field `text`".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid payload for event 'text_delta': missing field `text`"
        );
    }
}
