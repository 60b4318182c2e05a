//! Reqwest-based HTTP client adapter.
//!
//! This module provides the production HTTP client implementation using
//! reqwest, implementing the [`HttpClient`] trait from `crate::traits`.

use async_trait::async_trait;
use futures_util::StreamExt;

use crate::traits::{ByteStream, Headers, HttpClient, HttpError, Method, RequestSpec, Response};

/// HTTP client implementation using reqwest.
///
/// Status codes are passed through untouched on buffered requests; only the
/// streaming path turns a non-2xx status into [`HttpError::ServerError`].
///
/// # Example
///
/// ```ignore
/// use speclink::adapters::ReqwestHttpClient;
/// use speclink::traits::{HttpClient, RequestSpec};
///
/// let client = ReqwestHttpClient::new();
/// let response = client.execute(&RequestSpec::get("https://api.example.com/features")).await?;
/// println!("Status: {}", response.status);
/// ```
#[derive(Debug, Clone)]
pub struct ReqwestHttpClient {
    client: reqwest::Client,
}

impl ReqwestHttpClient {
    /// Create a new ReqwestHttpClient with default settings.
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    /// Create a new ReqwestHttpClient with a custom reqwest::Client.
    ///
    /// This allows for advanced configuration like custom timeouts,
    /// connection pools, or TLS settings.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Convert reqwest error to HttpError.
    fn convert_error(err: reqwest::Error) -> HttpError {
        if err.is_timeout() {
            HttpError::Timeout(err.to_string())
        } else if err.is_connect() {
            HttpError::ConnectionFailed(err.to_string())
        } else if err.is_builder() {
            HttpError::InvalidUrl(err.to_string())
        } else {
            HttpError::Other(err.to_string())
        }
    }

    /// Convert reqwest headers to our Headers type.
    fn convert_headers(headers: &reqwest::header::HeaderMap) -> Headers {
        headers
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.to_string(), v.to_string()))
            })
            .collect()
    }

    /// Translate a [`RequestSpec`] into a reqwest builder.
    fn build(&self, request: &RequestSpec) -> reqwest::RequestBuilder {
        let mut builder = match request.method {
            Method::Get => self.client.get(&request.url),
            Method::Post => self.client.post(&request.url),
            Method::Put => self.client.put(&request.url),
            Method::Patch => self.client.patch(&request.url),
            Method::Delete => self.client.delete(&request.url),
        };
        for (key, value) in &request.headers {
            builder = builder.header(key, value);
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }
        builder
    }
}

impl Default for ReqwestHttpClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn execute(&self, request: &RequestSpec) -> Result<Response, HttpError> {
        let response = self
            .build(request)
            .send()
            .await
            .map_err(Self::convert_error)?;

        let status = response.status().as_u16();
        let headers = Self::convert_headers(response.headers());
        let body = response.bytes().await.map_err(Self::convert_error)?;

        tracing::trace!(
            method = request.method.as_str(),
            url = %request.url,
            status,
            "HTTP request completed"
        );
        Ok(Response::with_headers(status, headers, body))
    }

    async fn execute_stream(&self, request: &RequestSpec) -> Result<ByteStream, HttpError> {
        let response = self
            .build(request)
            .header("Accept", "text/event-stream")
            .send()
            .await
            .map_err(Self::convert_error)?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(HttpError::ServerError { status, message });
        }

        let stream = response.bytes_stream().map(|result| {
            result.map_err(|e| {
                if e.is_timeout() {
                    HttpError::Timeout(e.to_string())
                } else {
                    HttpError::Io(e.to_string())
                }
            })
        });

        Ok(Box::pin(stream))
    }
}
