//! Authentication-related error types.
//!
//! `AuthError` is `Clone` because a single refresh outcome is delivered to
//! every request that queued behind it.

use thiserror::Error;

/// Authentication-specific error variants.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// No credential pair is stored (logged-out state).
    #[error("Not authenticated")]
    NotAuthenticated,

    /// The refresh exchange failed: revoked or expired refresh credential,
    /// non-success status, or a network failure during the exchange.
    #[error("Token refresh failed: {message}")]
    RefreshFailed {
        status: Option<u16>,
        message: String,
    },

    /// The refresh exchange did not finish within the configured timeout.
    #[error("Token refresh timed out after {timeout_secs}s")]
    RefreshTimedOut { timeout_secs: u64 },

    /// The task leading a refresh episode was dropped before it finished.
    #[error("Token refresh was abandoned before completing")]
    RefreshAbandoned,

    /// Login or registration was rejected by the server.
    #[error("Authentication rejected ({status}): {message}")]
    Rejected { status: u16, message: String },
}

impl AuthError {
    pub fn refresh_failed(message: impl Into<String>) -> Self {
        AuthError::RefreshFailed {
            status: None,
            message: message.into(),
        }
    }

    /// Whether this error ends the session (credentials are cleared and the
    /// user has to sign in again).
    pub fn requires_reauth(&self) -> bool {
        matches!(
            self,
            AuthError::NotAuthenticated
                | AuthError::RefreshFailed { .. }
                | AuthError::RefreshTimedOut { .. }
        )
    }

    /// Get a short error code for logging.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::NotAuthenticated => "AUTH_NOT_AUTHENTICATED",
            AuthError::RefreshFailed { .. } => "AUTH_REFRESH_FAILED",
            AuthError::RefreshTimedOut { .. } => "AUTH_REFRESH_TIMEOUT",
            AuthError::RefreshAbandoned => "AUTH_REFRESH_ABANDONED",
            AuthError::Rejected { .. } => "AUTH_REJECTED",
        }
    }

    /// Get a user-friendly error message.
    pub fn user_message(&self) -> String {
        match self {
            AuthError::NotAuthenticated => {
                "You are not signed in. Please sign in to continue.".to_string()
            }
            AuthError::RefreshFailed { .. } | AuthError::RefreshTimedOut { .. } => {
                "Your session has expired. Please sign in again.".to_string()
            }
            AuthError::RefreshAbandoned => {
                "Your session could not be renewed. Please try again.".to_string()
            }
            AuthError::Rejected { status: 401, .. } => {
                "Invalid email or password.".to_string()
            }
            AuthError::Rejected { message, .. } => format!("Sign-in failed: {}", message),
        }
    }
}
