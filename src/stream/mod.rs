//! Conversation streaming.
//!
//! - `decoder` - bytes to frames, holding back partial lines and characters
//! - `reducer` - folds typed events into an observable state
//! - `session` - owns one streaming request and its cancellable read loop

pub mod decoder;
pub mod reducer;
pub mod session;

pub use decoder::FrameDecoder;
pub use reducer::{ConversationStreamReducer, ConversationStreamState, StreamPhase, Transition};
pub use session::{CompletionHook, StreamHandle, StreamSession};
