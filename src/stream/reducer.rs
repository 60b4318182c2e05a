//! Conversation stream state machine.
//!
//! ```text
//! Idle ──begin──► Streaming ──message_complete──► Completed
//!                     │ ──error frame / failure──► Failed
//!                     └──cancel──────────────────► Cancelled
//! ```
//!
//! Terminal states absorb every later event; only [`reset`] leaves them.
//!
//! [`reset`]: ConversationStreamReducer::reset

use serde_json::Value;

use crate::error::StreamError;
use crate::sse::{ConversationEvent, StreamMetadata};

/// Lifecycle phase of one conversation stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StreamPhase {
    #[default]
    Idle,
    Streaming,
    Completed,
    Failed,
    Cancelled,
}

impl StreamPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            StreamPhase::Completed | StreamPhase::Failed | StreamPhase::Cancelled
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StreamPhase::Idle => "idle",
            StreamPhase::Streaming => "streaming",
            StreamPhase::Completed => "completed",
            StreamPhase::Failed => "failed",
            StreamPhase::Cancelled => "cancelled",
        }
    }
}

/// Observable state of one conversation stream.
///
/// `final_result` and `error` are never both set, and both are `None`
/// while streaming. `accumulated_text` is only ever appended to.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConversationStreamState {
    pub phase: StreamPhase,
    pub is_streaming: bool,
    pub accumulated_text: String,
    pub latest_metadata: Option<StreamMetadata>,
    pub final_result: Option<Value>,
    pub error: Option<String>,
}

/// What applying an input did to the state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Input was absorbed without a state change
    Ignored,
    /// Text or metadata changed; still streaming
    Updated,
    Completed,
    Failed,
    Cancelled,
}

impl Transition {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Transition::Completed | Transition::Failed | Transition::Cancelled
        )
    }
}

/// Folds conversation events into a [`ConversationStreamState`].
#[derive(Debug, Default)]
pub struct ConversationStreamReducer {
    state: ConversationStreamState,
}

impl ConversationStreamReducer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &ConversationStreamState {
        &self.state
    }

    pub fn phase(&self) -> StreamPhase {
        self.state.phase
    }

    /// Enter `Streaming`. Only valid from `Idle`.
    pub fn begin(&mut self) -> Transition {
        if self.state.phase != StreamPhase::Idle {
            return Transition::Ignored;
        }
        self.state.phase = StreamPhase::Streaming;
        self.state.is_streaming = true;
        Transition::Updated
    }

    /// Apply one decoded event. Events outside `Streaming` are ignored.
    pub fn apply(&mut self, event: ConversationEvent) -> Transition {
        if self.state.phase != StreamPhase::Streaming {
            return Transition::Ignored;
        }
        match event {
            ConversationEvent::TextDelta { text } => {
                if text.is_empty() {
                    return Transition::Ignored;
                }
                self.state.accumulated_text.push_str(&text);
                Transition::Updated
            }
            ConversationEvent::Metadata(metadata) => {
                self.state.latest_metadata = Some(metadata);
                Transition::Updated
            }
            ConversationEvent::MessageComplete(result) => {
                self.state.final_result = Some(result);
                self.settle(StreamPhase::Completed);
                Transition::Completed
            }
            ConversationEvent::Error { message } => {
                self.fail_with(StreamError::Server { message }.to_string())
            }
        }
    }

    /// Fail the stream from outside the event flow (network, timeout, EOF).
    pub fn fail(&mut self, error: &StreamError) -> Transition {
        if self.state.phase != StreamPhase::Streaming {
            return Transition::Ignored;
        }
        self.fail_with(error.to_string())
    }

    /// Cancel the stream. Wins over anything not yet applied.
    pub fn cancel(&mut self) -> Transition {
        if self.state.phase.is_terminal() {
            return Transition::Ignored;
        }
        self.settle(StreamPhase::Cancelled);
        Transition::Cancelled
    }

    /// End of stream. Without a terminal frame this is a failure.
    pub fn finish(&mut self) -> Transition {
        self.fail(&StreamError::UnexpectedEof)
    }

    /// Return to `Idle` with empty state, ready for a new stream.
    pub fn reset(&mut self) {
        self.state = ConversationStreamState::default();
    }

    fn fail_with(&mut self, message: String) -> Transition {
        self.state.error = Some(message);
        self.settle(StreamPhase::Failed);
        Transition::Failed
    }

    fn settle(&mut self, phase: StreamPhase) {
        self.state.phase = phase;
        self.state.is_streaming = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn streaming() -> ConversationStreamReducer {
        let mut reducer = ConversationStreamReducer::new();
        reducer.begin();
        reducer
    }

    fn delta(text: &str) -> ConversationEvent {
        ConversationEvent::TextDelta {
            text: text.to_string(),
        }
    }

    #[test]
    fn test_initial_state_is_idle() {
        let reducer = ConversationStreamReducer::new();
        assert_eq!(reducer.phase(), StreamPhase::Idle);
        assert!(!reducer.state().is_streaming);
    }

    #[test]
    fn test_events_before_begin_are_ignored() {
        let mut reducer = ConversationStreamReducer::new();
        assert_eq!(reducer.apply(delta("early")), Transition::Ignored);
        assert_eq!(reducer.state().accumulated_text, "");
    }

    #[test]
    fn test_text_accumulates_in_order() {
        let mut reducer = streaming();
        for part in ["The ", "quick ", "fox"] {
            assert_eq!(reducer.apply(delta(part)), Transition::Updated);
        }
        assert_eq!(reducer.state().accumulated_text, "The quick fox");
        assert!(reducer.state().is_streaming);
    }

    #[test]
    fn test_metadata_is_replaced() {
        let mut reducer = streaming();
        for phase in ["drafting", "reviewing"] {
            reducer.apply(ConversationEvent::Metadata(StreamMetadata {
                phase: Some(phase.to_string()),
                ..Default::default()
            }));
        }
        let meta = reducer.state().latest_metadata.clone().unwrap();
        assert_eq!(meta.phase.as_deref(), Some("reviewing"));
    }

    #[test]
    fn test_message_complete_sets_result() {
        let mut reducer = streaming();
        reducer.apply(delta("done"));

        let transition = reducer.apply(ConversationEvent::MessageComplete(json!({"id": 42})));

        assert_eq!(transition, Transition::Completed);
        let state = reducer.state();
        assert_eq!(state.phase, StreamPhase::Completed);
        assert!(!state.is_streaming);
        assert_eq!(state.final_result, Some(json!({"id": 42})));
        assert_eq!(state.error, None);
        assert_eq!(state.accumulated_text, "done");
    }

    #[test]
    fn test_error_frame_fails_with_message() {
        let mut reducer = streaming();
        let transition = reducer.apply(ConversationEvent::Error {
            message: "Model overloaded".to_string(),
        });

        assert_eq!(transition, Transition::Failed);
        assert_eq!(reducer.state().error.as_deref(), Some("Model overloaded"));
        assert_eq!(reducer.state().final_result, None);
    }

    #[test]
    fn test_terminal_states_absorb_events() {
        let mut reducer = streaming();
        reducer.apply(ConversationEvent::MessageComplete(json!({"id": 1})));

        assert_eq!(reducer.apply(delta("late")), Transition::Ignored);
        assert_eq!(
            reducer.apply(ConversationEvent::Error {
                message: "late".to_string()
            }),
            Transition::Ignored
        );
        assert_eq!(reducer.cancel(), Transition::Ignored);
        assert_eq!(reducer.phase(), StreamPhase::Completed);
        assert_eq!(reducer.state().error, None);
    }

    #[test]
    fn test_cancel_is_final() {
        let mut reducer = streaming();
        reducer.apply(delta("partial"));

        assert_eq!(reducer.cancel(), Transition::Cancelled);
        assert_eq!(reducer.apply(delta(" more")), Transition::Ignored);
        assert_eq!(
            reducer.apply(ConversationEvent::MessageComplete(json!({}))),
            Transition::Ignored
        );
        assert_eq!(reducer.fail(&StreamError::UnexpectedEof), Transition::Ignored);

        let state = reducer.state();
        assert_eq!(state.phase, StreamPhase::Cancelled);
        assert_eq!(state.accumulated_text, "partial");
        assert_eq!(state.final_result, None);
        assert_eq!(state.error, None);
    }

    #[test]
    fn test_eof_without_terminal_frame_fails() {
        let mut reducer = streaming();
        assert_eq!(reducer.finish(), Transition::Failed);
        assert_eq!(
            reducer.state().error.as_deref(),
            Some("Stream ended before a result was received")
        );
    }

    #[test]
    fn test_reset_returns_to_idle() {
        let mut reducer = streaming();
        reducer.apply(delta("x"));
        reducer.cancel();

        reducer.reset();

        assert_eq!(reducer.state(), &ConversationStreamState::default());
        assert_eq!(reducer.begin(), Transition::Updated);
    }
}
