//! Error category classification.
//!
//! Categories drive retry decisions and how a collaborator should present a
//! failure: some are recovered inside the transport, the rest surface as an
//! observable terminal state.

use std::fmt;

/// High-level categorization of transport errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Connection, DNS or timeout problems.
    /// Generally transient and retryable.
    Network,

    /// Authentication problems that need the user to sign in again.
    Auth,

    /// Backend errors (HTTP 5xx, error frames sent by the server).
    Server,

    /// Client-side errors: bad requests, undecodable responses.
    Client,

    /// Local credential storage failures.
    Storage,

    /// Invalid or missing configuration.
    Configuration,
}

impl ErrorCategory {
    /// Returns true if errors in this category are generally transient
    /// and the operation can be re-invoked from scratch.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorCategory::Network | ErrorCategory::Server)
    }

    /// Returns a short label for the category suitable for logging.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Network => "network",
            ErrorCategory::Auth => "auth",
            ErrorCategory::Server => "server",
            ErrorCategory::Client => "client",
            ErrorCategory::Storage => "storage",
            ErrorCategory::Configuration => "configuration",
        }
    }

    /// Returns suggested recovery actions for this category.
    pub fn recovery_hint(&self) -> &'static str {
        match self {
            ErrorCategory::Network => "Check your internet connection and try again",
            ErrorCategory::Auth => "Sign in again to continue",
            ErrorCategory::Server => {
                "The server may be experiencing issues. Please try again later"
            }
            ErrorCategory::Client => "This may be a bug. Please report it if it persists",
            ErrorCategory::Storage => "Check permissions on the credentials file",
            ErrorCategory::Configuration => "Check your configuration settings",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
