//! HTTP client trait abstraction.
//!
//! Provides a trait-based abstraction for HTTP operations, enabling
//! dependency injection and mocking in tests. The coordinator, the refresh
//! executor and stream sessions all talk to the network through it.

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use serde::Serialize;
use std::collections::HashMap;
use std::pin::Pin;
use thiserror::Error;

/// HTTP headers represented as a key-value map.
pub type Headers = HashMap<String, String>;

/// Incremental response body of a streaming request.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, HttpError>> + Send>>;

/// Name of the header carrying the access credential.
pub const AUTHORIZATION: &str = "Authorization";

/// HTTP method of a [`RequestSpec`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }
}

/// Description of one outgoing request.
///
/// A request is plain data so it can be re-issued unchanged after a credential
/// refresh; only the `Authorization` header differs between attempts.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestSpec {
    pub method: Method,
    pub url: String,
    pub headers: Headers,
    pub body: Option<String>,
}

impl RequestSpec {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Headers::new(),
            body: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::Get, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::Post, url)
    }

    pub fn put(url: impl Into<String>) -> Self {
        Self::new(Method::Put, url)
    }

    pub fn patch(url: impl Into<String>) -> Self {
        Self::new(Method::Patch, url)
    }

    pub fn delete(url: impl Into<String>) -> Self {
        Self::new(Method::Delete, url)
    }

    /// Add a header, replacing any previous value with the same name.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Set a raw body.
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Serialize `body` as JSON and set the matching content type.
    pub fn with_json<T: Serialize + ?Sized>(self, body: &T) -> Result<Self, serde_json::Error> {
        let encoded = serde_json::to_string(body)?;
        Ok(self
            .with_header("Content-Type", "application/json")
            .with_body(encoded))
    }

    /// Copy of this request carrying `Authorization: Bearer <token>`.
    pub fn with_bearer(&self, token: &str) -> Self {
        let mut request = self.clone();
        request
            .headers
            .retain(|name, _| !name.eq_ignore_ascii_case(AUTHORIZATION));
        request
            .headers
            .insert(AUTHORIZATION.to_string(), format!("Bearer {}", token));
        request
    }

    /// Bearer token currently attached to this request, if any.
    pub fn bearer_token(&self) -> Option<&str> {
        self.headers
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(AUTHORIZATION))
            .and_then(|(_, value)| value.strip_prefix("Bearer "))
    }

    /// Path component of the URL (`/auth/login` for
    /// `https://api.example.com/auth/login?x=1`).
    pub fn path(&self) -> String {
        match reqwest::Url::parse(&self.url) {
            Ok(url) => url.path().to_string(),
            Err(_) => self
                .url
                .split(['?', '#'])
                .next()
                .unwrap_or_default()
                .to_string(),
        }
    }
}

/// HTTP response wrapper.
#[derive(Debug, Clone)]
pub struct Response {
    /// HTTP status code
    pub status: u16,
    /// Response headers
    pub headers: Headers,
    /// Response body
    pub body: Bytes,
}

impl Response {
    /// Create a new response.
    pub fn new(status: u16, body: Bytes) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body,
        }
    }

    /// Create a new response with headers.
    pub fn with_headers(status: u16, headers: Headers, body: Bytes) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// Check if the response indicates success (2xx status).
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Check if the response is an authorization failure (401).
    pub fn is_unauthorized(&self) -> bool {
        self.status == 401
    }

    /// Get the response body as a string.
    pub fn text(&self) -> Result<String, std::string::FromUtf8Error> {
        String::from_utf8(self.body.to_vec())
    }

    /// Parse the response body as JSON.
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }
}

/// HTTP client errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HttpError {
    /// Connection failed
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),
    /// Request timeout
    #[error("Request timeout: {0}")]
    Timeout(String),
    /// Server returned an error status where a body stream was expected
    #[error("Server error ({status}): {message}")]
    ServerError { status: u16, message: String },
    /// IO error while reading a body
    #[error("IO error: {0}")]
    Io(String),
    /// Invalid URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
    /// Other error
    #[error("HTTP error: {0}")]
    Other(String),
}

/// Trait for HTTP client operations.
///
/// Implementations include the production reqwest-based client and the mock
/// client used in tests. Implementations must not interpret status codes:
/// a 401 is an ordinary [`Response`] from `execute`.
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Issue a request and buffer the whole response body.
    async fn execute(&self, request: &RequestSpec) -> Result<Response, HttpError>;

    /// Issue a request and return the body as a stream of chunks.
    ///
    /// Non-2xx statuses are reported as [`HttpError::ServerError`].
    async fn execute_stream(&self, request: &RequestSpec) -> Result<ByteStream, HttpError>;
}
