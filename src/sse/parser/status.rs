//! Metadata and error event parsers

use crate::sse::events::{ConversationEvent, SseParseError, StreamMetadata};
use crate::sse::payloads::ErrorPayload;

const UNKNOWN_ERROR: &str = "Unknown stream error";

/// Parse metadata event
pub(super) fn parse_metadata_event(
    event_type: &str,
    data: &str,
) -> Result<ConversationEvent, SseParseError> {
    let metadata: StreamMetadata =
        serde_json::from_str(data).map_err(|e| SseParseError::InvalidPayload {
            event_type: event_type.to_string(),
            details: e.to_string(),
        })?;
    Ok(ConversationEvent::Metadata(metadata))
}

/// Parse error event
pub(super) fn parse_error_event(
    event_type: &str,
    data: &str,
) -> Result<ConversationEvent, SseParseError> {
    let payload: ErrorPayload =
        serde_json::from_str(data).map_err(|e| SseParseError::InvalidPayload {
            event_type: event_type.to_string(),
            details: e.to_string(),
        })?;
    let message = payload
        .into_message()
        .unwrap_or_else(|| UNKNOWN_ERROR.to_string());
    Ok(ConversationEvent::Error { message })
}
