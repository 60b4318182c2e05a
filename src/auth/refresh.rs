//! Refresh executor: trades a refresh credential for a new pair.
//!
//! The executor talks to the network through a bare [`HttpClient`], never
//! through the coordinator, so a failing refresh cannot recurse into
//! authorization handling.

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;

use crate::auth::CredentialPair;
use crate::error::AuthError;
use crate::traits::{HttpClient, RequestSpec, Response};

/// Performs exactly one refresh exchange per call.
#[async_trait]
pub trait RefreshExecutor: Send + Sync {
    /// Exchange `refresh_token` for a new pair.
    ///
    /// Any non-success outcome is an [`AuthError::RefreshFailed`].
    async fn execute(&self, refresh_token: &str) -> Result<CredentialPair, AuthError>;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
}

/// Refresh executor posting to `/auth/refresh-token`.
#[derive(Clone)]
pub struct HttpRefreshExecutor {
    http: Arc<dyn HttpClient>,
    refresh_url: String,
}

impl HttpRefreshExecutor {
    pub fn new(http: Arc<dyn HttpClient>, refresh_url: impl Into<String>) -> Self {
        Self {
            http,
            refresh_url: refresh_url.into(),
        }
    }

    pub fn refresh_url(&self) -> &str {
        &self.refresh_url
    }
}

#[async_trait]
impl RefreshExecutor for HttpRefreshExecutor {
    async fn execute(&self, refresh_token: &str) -> Result<CredentialPair, AuthError> {
        let request = RequestSpec::post(&self.refresh_url)
            .with_json(&RefreshRequest { refresh_token })
            .map_err(|e| AuthError::refresh_failed(e.to_string()))?;

        let response = self
            .http
            .execute(&request)
            .await
            .map_err(|e| AuthError::refresh_failed(e.to_string()))?;

        if !response.is_success() {
            return Err(AuthError::RefreshFailed {
                status: Some(response.status),
                message: error_message(&response),
            });
        }

        response
            .json::<CredentialPair>()
            .map_err(|e| AuthError::refresh_failed(format!("invalid refresh response: {}", e)))
    }
}

/// Best-effort error text from a failed response: the JSON `message` or
/// `error` field, else the raw body, else the status.
pub(crate) fn error_message(response: &Response) -> String {
    if let Ok(json) = response.json::<serde_json::Value>() {
        for key in ["message", "error"] {
            if let Some(text) = json.get(key).and_then(|v| v.as_str()) {
                return text.to_string();
            }
        }
    }
    match response.text() {
        Ok(text) if !text.trim().is_empty() => text,
        _ => format!("HTTP {}", response.status),
    }
}
