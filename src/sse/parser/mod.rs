//! SSE frame parsing logic
//!
//! [`parse`] is a pure function over the decoded text buffer: it returns
//! every complete frame plus the trailing partial line that must be carried
//! into the next call. An `event:` line still waiting for its `data:` line is
//! returned as `pending_event` and handed back through [`parse_resuming`].
//! State only advances on fully terminated lines, so the frame sequence does
//! not depend on how the byte stream was chunked.

mod content;
mod status;

use crate::sse::events::{
    ConversationEvent, SseLine, SseParseError, StreamFrame, ERROR, MESSAGE_COMPLETE, METADATA,
    TEXT_DELTA,
};

use content::{parse_message_complete_event, parse_text_delta_event};
use status::{parse_error_event, parse_metadata_event};

/// Result of one [`parse`] call.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParseOutput {
    /// Complete frames in wire order
    pub frames: Vec<StreamFrame>,
    /// Unconsumed tail: the trailing partial line
    pub remainder: String,
    /// Event type whose `data:` line has not arrived yet
    pub pending_event: Option<String>,
}

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

/// Split `buffer` into complete frames and a remainder.
///
/// Lines end with `\n` (a preceding `\r` is stripped). An `event:` line sets
/// the pending type; the next `data:` line combines with it into a frame and
/// clears it. A `data:` line without a pending type is dropped, as is a frame
/// whose payload is not valid JSON. Blank lines and comments change nothing.
///
/// The caller must prepend the returned remainder to the next chunk and pass
/// `pending_event` to [`parse_resuming`].
pub fn parse(buffer: &str) -> ParseOutput {
    parse_resuming(None, buffer)
}

/// [`parse`], continuing with the event type left pending by the previous call.
pub fn parse_resuming(pending_event: Option<String>, buffer: &str) -> ParseOutput {
    let mut frames = Vec::new();
    let mut pending = pending_event;
    let mut offset = 0;

    while let Some(newline) = buffer[offset..].find('\n') {
        let end = offset + newline;
        let raw = &buffer[offset..end];
        let line = raw.strip_suffix('\r').unwrap_or(raw);

        match parse_sse_line(line) {
            SseLine::Event(event_type) => pending = Some(event_type),
            SseLine::Data(payload) => match pending.take() {
                Some(event_type) => {
                    if let Err(e) = serde_json::from_str::<serde_json::Value>(&payload) {
                        tracing::warn!(
                            event_type = %event_type,
                            error = %e,
                            "Dropping frame with malformed payload"
                        );
                    } else {
                        frames.push(StreamFrame {
                            event_type,
                            payload,
                        });
                    }
                }
                None => tracing::debug!("Dropping data line without event type"),
            },
            SseLine::Empty | SseLine::Comment(_) => {}
        }

        offset = end + 1;
    }

    ParseOutput {
        frames,
        remainder: buffer[offset..].to_string(),
        pending_event: pending,
    }
}

/// Decode a frame into a typed conversation event.
///
/// Returns `Ok(None)` for frame types this client does not handle.
pub fn parse_conversation_event(
    frame: &StreamFrame,
) -> Result<Option<ConversationEvent>, SseParseError> {
    let data = frame.payload.as_str();
    let event = match frame.event_type.as_str() {
        TEXT_DELTA => parse_text_delta_event(data)?,
        METADATA => parse_metadata_event(METADATA, data)?,
        MESSAGE_COMPLETE => parse_message_complete_event(MESSAGE_COMPLETE, data)?,
        ERROR => parse_error_event(ERROR, data)?,
        // Ignore unknown events instead of erroring (more resilient)
        _ => return Ok(None),
    };
    Ok(Some(event))
}
