//! Unified error type for transport operations.

use thiserror::Error;

use super::auth::AuthError;
use super::category::ErrorCategory;
use super::stream::StreamError;
use crate::traits::{CredentialsError, HttpError};

/// Unified error type returned by the coordinator and the conversation client.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The HTTP layer failed before a response was received.
    #[error(transparent)]
    Http(#[from] HttpError),

    /// Authentication failed and could not be recovered.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// The credential store could not be read or written.
    #[error(transparent)]
    Credentials(#[from] CredentialsError),

    /// A stream could not be opened or failed while reading.
    #[error(transparent)]
    Stream(#[from] StreamError),

    /// A typed helper received a non-success status.
    #[error("Request failed with status {status}: {message}")]
    Status { status: u16, message: String },

    /// A request body could not be encoded or a response body decoded.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The configuration is unusable.
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl TransportError {
    /// Get the category of this error.
    pub fn category(&self) -> ErrorCategory {
        match self {
            TransportError::Http(err) => match err {
                HttpError::ServerError { status, .. } if *status >= 500 => ErrorCategory::Server,
                HttpError::ServerError { .. } | HttpError::InvalidUrl(_) => ErrorCategory::Client,
                _ => ErrorCategory::Network,
            },
            TransportError::Auth(_) => ErrorCategory::Auth,
            TransportError::Credentials(_) => ErrorCategory::Storage,
            TransportError::Stream(err) => match err {
                StreamError::Server { .. } => ErrorCategory::Server,
                StreamError::ConnectFailed {
                    status: Some(401), ..
                } => ErrorCategory::Auth,
                _ => ErrorCategory::Network,
            },
            TransportError::Status { status, .. } => match *status {
                401 | 403 => ErrorCategory::Auth,
                s if s >= 500 => ErrorCategory::Server,
                _ => ErrorCategory::Client,
            },
            TransportError::Json(_) => ErrorCategory::Client,
            TransportError::Config(_) => ErrorCategory::Configuration,
        }
    }

    /// Check if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            TransportError::Stream(err) => err.is_retryable(),
            TransportError::Auth(_) => false,
            other => other.category().is_retryable(),
        }
    }

    /// Whether the session ended and the user has to sign in again.
    pub fn requires_reauth(&self) -> bool {
        matches!(self, TransportError::Auth(err) if err.requires_reauth())
    }

    /// Terminal-facing report: what failed, then what the user can do.
    pub fn user_report(&self) -> String {
        let summary = match self {
            TransportError::Auth(err) => err.user_message(),
            other => other.to_string(),
        };
        let category = self.category();
        let mut report = format!("{} ({})\n  {}", summary, category, category.recovery_hint());
        if self.requires_reauth() {
            report.push_str("\n  Run `speclink login <email>` to sign in.");
        } else if self.is_retryable() {
            report.push_str("\n  The failure looks temporary; retrying may succeed.");
        }
        report
    }
}

/// Type alias for results of transport operations.
pub type TransportResult<T> = Result<T, TransportError>;
