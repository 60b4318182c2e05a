//! Conversation client: sends a message to a feature's assistant and
//! streams the reply.

use serde::Serialize;
use std::sync::Arc;

use crate::auth::AuthTransport;
use crate::error::TransportResult;
use crate::stream::{StreamHandle, StreamSession};
use crate::traits::{CacheInvalidator, NoopInvalidator};

#[derive(Serialize)]
struct MessageRequest<'a> {
    content: &'a str,
}

/// Starts conversation streams for features.
///
/// The stream carries the access credential stored at start time; a stream
/// rejected with 401 fails instead of refreshing.
#[derive(Clone)]
pub struct ConversationClient {
    transport: AuthTransport,
    invalidator: Arc<dyn CacheInvalidator>,
}

impl ConversationClient {
    pub fn new(transport: AuthTransport) -> Self {
        Self {
            transport,
            invalidator: Arc::new(NoopInvalidator),
        }
    }

    /// Notify `invalidator` whenever a conversation completes.
    pub fn with_invalidator(mut self, invalidator: Arc<dyn CacheInvalidator>) -> Self {
        self.invalidator = invalidator;
        self
    }

    pub fn transport(&self) -> &AuthTransport {
        &self.transport
    }

    /// Streaming endpoint of a feature's conversation.
    pub fn stream_url(&self, feature_id: &str) -> String {
        self.transport.config().url(&format!(
            "/features/{}/conversation/messages/stream",
            urlencoding::encode(feature_id)
        ))
    }

    /// Post `content` to the feature's conversation and start streaming the
    /// reply. Must be called inside a tokio runtime.
    pub async fn stream_message(
        &self,
        feature_id: &str,
        content: &str,
    ) -> TransportResult<StreamHandle> {
        let credential = self.transport.current_access_token().await?;
        let invalidator = Arc::clone(&self.invalidator);
        let feature = feature_id.to_string();

        let session = StreamSession::new(
            self.transport.http(),
            self.stream_url(feature_id),
            &MessageRequest { content },
            credential.as_deref(),
        )?
        .with_read_timeout(self.transport.config().stream_read_timeout)
        .on_complete(move |result| {
            tracing::debug!(feature_id = %feature, "Invalidating conversation caches");
            invalidator.invalidate_conversation(&feature, result);
        });

        tracing::info!(feature_id = %feature_id, session = %session.id(), "Streaming conversation message");
        Ok(session.start())
    }
}
