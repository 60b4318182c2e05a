//! Streaming-related error types.
//!
//! These describe why a conversation stream ended in the `Failed` state.
//! Malformed frames never produce one of these: they are dropped by the parser.

use thiserror::Error;

use crate::traits::HttpError;

/// Stream-specific error variants.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StreamError {
    /// The streaming request could not be opened (includes a 401, which is
    /// never refreshed for long-lived connections).
    #[error("Failed to open stream: {message}")]
    ConnectFailed {
        status: Option<u16>,
        message: String,
    },

    /// Reading from the open stream failed.
    #[error("Stream connection lost: {message}")]
    ConnectionLost { message: String },

    /// No bytes arrived within the configured read timeout.
    #[error("Stream read timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    /// The server closed the stream before sending a terminal frame.
    #[error("Stream ended before a result was received")]
    UnexpectedEof,

    /// The server sent an explicit `error` frame.
    #[error("{message}")]
    Server { message: String },
}

impl StreamError {
    /// Check if re-invoking the operation from scratch is likely to help.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            StreamError::ConnectionLost { .. }
                | StreamError::Timeout { .. }
                | StreamError::UnexpectedEof
        )
    }

    /// Get a short error code for logging.
    pub fn error_code(&self) -> &'static str {
        match self {
            StreamError::ConnectFailed { .. } => "STREAM_CONNECT_FAILED",
            StreamError::ConnectionLost { .. } => "STREAM_CONNECTION_LOST",
            StreamError::Timeout { .. } => "STREAM_TIMEOUT",
            StreamError::UnexpectedEof => "STREAM_UNEXPECTED_EOF",
            StreamError::Server { .. } => "STREAM_SERVER_ERROR",
        }
    }
}

impl From<HttpError> for StreamError {
    fn from(err: HttpError) -> Self {
        match err {
            HttpError::ServerError { status, message } => StreamError::ConnectFailed {
                status: Some(status),
                message,
            },
            other => StreamError::ConnectFailed {
                status: None,
                message: other.to_string(),
            },
        }
    }
}
