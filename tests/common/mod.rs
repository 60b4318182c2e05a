//! Common test utilities for integration tests.
//!
//! Wires an [`AuthTransport`] against a wiremock server with a credentials
//! file in a temporary directory, and records session-expired signals.

#![allow(dead_code)]

use parking_lot::Mutex;
use speclink::adapters::{FileCredentialsProvider, ReqwestHttpClient};
use speclink::auth::{AuthTransport, CredentialPair, CredentialsManager};
use speclink::config::TransportConfig;
use speclink::traits::SessionExpiredHandler;
use std::sync::Arc;
use tempfile::TempDir;
use wiremock::MockServer;

/// Session-expired handler that records every reason it was given.
#[derive(Default)]
pub struct RecordingHandler {
    reasons: Mutex<Vec<String>>,
}

impl RecordingHandler {
    pub fn count(&self) -> usize {
        self.reasons.lock().len()
    }
}

impl SessionExpiredHandler for RecordingHandler {
    fn on_session_expired(&self, reason: &str) {
        self.reasons.lock().push(reason.to_string());
    }
}

/// A transport talking to a mock server, plus handles to inspect it.
pub struct TestTransport {
    pub transport: AuthTransport,
    pub manager: CredentialsManager,
    pub expired: Arc<RecordingHandler>,
    _dir: TempDir,
}

impl TestTransport {
    /// Build a transport for `server`, optionally pre-seeded with `pair`.
    pub fn new(server: &MockServer, pair: Option<CredentialPair>) -> Self {
        Self::with_config(TransportConfig::new(server.uri()), pair)
    }

    pub fn with_config(config: TransportConfig, pair: Option<CredentialPair>) -> Self {
        let dir = TempDir::new().expect("tempdir");
        let manager = CredentialsManager::with_path(dir.path().join("credentials.json"));
        if let Some(pair) = pair {
            manager.save(&pair).expect("seed credentials");
        }

        let expired = Arc::new(RecordingHandler::default());
        let transport = AuthTransport::new(
            config,
            Arc::new(ReqwestHttpClient::new()),
            Arc::new(FileCredentialsProvider::with_manager(manager.clone())),
        )
        .with_session_expired_handler(expired.clone());

        Self {
            transport,
            manager,
            expired,
            _dir: dir,
        }
    }

    /// Pair currently persisted on disk.
    pub fn stored(&self) -> Option<CredentialPair> {
        self.manager.load().expect("read credentials")
    }
}

/// The pair every test starts with.
pub fn initial_pair() -> CredentialPair {
    CredentialPair::new("T1", "R1")
}

/// Join `frames` of (type, json payload) into a wire body.
pub fn sse_body(frames: &[(&str, &str)]) -> String {
    frames
        .iter()
        .map(|(event_type, payload)| format!("event: {}\ndata: {}\n\n", event_type, payload))
        .collect()
}
