//! Content and result event parsers

use crate::sse::events::{ConversationEvent, SseParseError, TEXT_DELTA};
use crate::sse::payloads::TextDeltaPayload;

/// Parse text_delta event
pub(super) fn parse_text_delta_event(data: &str) -> Result<ConversationEvent, SseParseError> {
    let payload: TextDeltaPayload =
        serde_json::from_str(data).map_err(|e| SseParseError::InvalidPayload {
            event_type: TEXT_DELTA.to_string(),
            details: e.to_string(),
        })?;
    Ok(ConversationEvent::TextDelta { text: payload.text })
}

/// Parse message_complete event; any JSON value is a valid final result
pub(super) fn parse_message_complete_event(
    event_type: &str,
    data: &str,
) -> Result<ConversationEvent, SseParseError> {
    let result: serde_json::Value =
        serde_json::from_str(data).map_err(|e| SseParseError::InvalidPayload {
            event_type: event_type.to_string(),
            details: e.to_string(),
        })?;
    Ok(ConversationEvent::MessageComplete(result))
}
