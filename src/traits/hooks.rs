//! Collaborator hooks invoked by the transport.
//!
//! The UI layer implements these to react to transport outcomes it does not
//! drive itself: a session that can no longer be renewed, and a conversation
//! whose completion makes cached views stale.

use serde_json::Value;

/// Notified once per failed refresh episode, after the credentials were cleared.
pub trait SessionExpiredHandler: Send + Sync {
    fn on_session_expired(&self, reason: &str);
}

/// Notified once when a conversation stream completes with a final result.
pub trait CacheInvalidator: Send + Sync {
    fn invalidate_conversation(&self, feature_id: &str, result: &Value);
}

/// Session-expired handler that only logs; for headless use.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSessionExpired;

impl SessionExpiredHandler for LogSessionExpired {
    fn on_session_expired(&self, reason: &str) {
        tracing::warn!(reason = %reason, "Session expired; sign in again to continue");
    }
}

/// Invalidator for collaborators that keep no cache.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopInvalidator;

impl CacheInvalidator for NoopInvalidator {
    fn invalidate_conversation(&self, _feature_id: &str, _result: &Value) {}
}
