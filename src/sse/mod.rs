//! SSE (Server-Sent Events) frame parsing
//!
//! Parses the line-oriented event framing of the conversation stream.
//! The format consists of:
//! - `event: <type>` - event type line
//! - `data: <json>` - data payload line
//! - Empty line - separates frames
//! - Lines starting with `:` - comments (ignored)
//!
//! # Module structure
//! - `events` - Frame and typed event definitions (StreamFrame, ConversationEvent, SseLine, SseParseError)
//! - `payloads` - Internal payload deserialization structs
//! - `parser` - Parsing logic (parse, parse_resuming, parse_sse_line, parse_conversation_event)

mod events;
mod parser;
mod payloads;

// Re-export public types
pub use events::{ConversationEvent, SseLine, SseParseError, StreamFrame, StreamMetadata};
pub use parser::{parse, parse_conversation_event, parse_resuming, parse_sse_line, ParseOutput};
