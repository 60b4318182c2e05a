//! Mock HTTP client for testing.
//!
//! Provides a configurable mock HTTP client that can return predefined
//! responses or errors, compute responses from the incoming request, and
//! delay responses to stage concurrent refresh storms.

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::traits::{
    ByteStream, Headers, HttpClient, HttpError, RequestSpec, Response, AUTHORIZATION,
};

/// A recorded HTTP request for verification in tests.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    /// HTTP method (GET, POST, ...)
    pub method: String,
    /// Request URL
    pub url: String,
    /// Request headers
    pub headers: Headers,
    /// Request body
    pub body: Option<String>,
}

impl RecordedRequest {
    fn from_spec(request: &RequestSpec) -> Self {
        Self {
            method: request.method.as_str().to_string(),
            url: request.url.clone(),
            headers: request.headers.clone(),
            body: request.body.clone(),
        }
    }

    /// Bearer token the request carried, if any.
    pub fn bearer_token(&self) -> Option<&str> {
        self.headers
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(AUTHORIZATION))
            .and_then(|(_, value)| value.strip_prefix("Bearer "))
    }
}

/// Configuration for a mock response.
#[derive(Debug, Clone)]
pub enum MockResponse {
    /// Return a buffered response (any status)
    Success(Response),
    /// Return an error
    Error(HttpError),
    /// Return a stream of chunks, then end
    Stream(Vec<Bytes>),
    /// Return a stream of chunks spaced by a delay, then end
    DelayedStream(Vec<Bytes>, Duration),
    /// Return a stream of chunks that then stays open without data
    OpenStream(Vec<Bytes>),
    /// Return a stream of chunks followed by a read error
    BrokenStream(Vec<Bytes>, HttpError),
    /// Fail opening a stream
    StreamError(HttpError),
}

type Handler = Arc<dyn Fn(&RecordedRequest) -> MockResponse + Send + Sync>;

#[derive(Clone)]
enum Responder {
    Fixed(MockResponse),
    Computed(Handler),
}

impl Responder {
    fn respond(&self, request: &RecordedRequest) -> MockResponse {
        match self {
            Responder::Fixed(response) => response.clone(),
            Responder::Computed(handler) => handler(request),
        }
    }
}

/// Mock HTTP client for testing.
///
/// Clones share configuration and the request log, so a test can keep one
/// handle while the code under test owns another.
///
/// # Example
///
/// ```ignore
/// use speclink::adapters::mock::{MockHttpClient, MockResponse};
/// use speclink::traits::{HttpClient, Response, RequestSpec};
/// use bytes::Bytes;
///
/// let client = MockHttpClient::new();
/// client.set_handler("https://api.example.com/features", |req| {
///     match req.bearer_token() {
///         Some("T2") => MockResponse::Success(Response::new(200, Bytes::from("[]"))),
///         _ => MockResponse::Success(Response::new(401, Bytes::new())),
///     }
/// });
///
/// let response = client.execute(&RequestSpec::get("https://api.example.com/features")).await?;
/// assert_eq!(response.status, 401);
/// assert_eq!(client.request_count("https://api.example.com/features"), 1);
/// ```
#[derive(Clone, Default)]
pub struct MockHttpClient {
    /// Configured responders by URL pattern
    responses: Arc<Mutex<HashMap<String, Responder>>>,
    /// One-shot responses consumed before the configured responder
    queued: Arc<Mutex<HashMap<String, Vec<MockResponse>>>>,
    /// Default response when no specific match
    default_response: Arc<Mutex<Option<MockResponse>>>,
    /// Per-URL latency before responding
    delays: Arc<Mutex<HashMap<String, Duration>>>,
    /// Recorded requests for verification
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockHttpClient {
    /// Create a new mock HTTP client.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a response for a URL.
    ///
    /// The URL is matched exactly first, then as a prefix.
    pub fn set_response(&self, url: &str, response: MockResponse) {
        self.responses
            .lock()
            .insert(url.to_string(), Responder::Fixed(response));
    }

    /// Compute the response for a URL from the recorded request.
    pub fn set_handler<F>(&self, url: &str, handler: F)
    where
        F: Fn(&RecordedRequest) -> MockResponse + Send + Sync + 'static,
    {
        self.responses
            .lock()
            .insert(url.to_string(), Responder::Computed(Arc::new(handler)));
    }

    /// Queue a response used once, ahead of the configured responder.
    pub fn push_response(&self, url: &str, response: MockResponse) {
        self.queued
            .lock()
            .entry(url.to_string())
            .or_default()
            .push(response);
    }

    /// Set a default response for URLs without specific matches.
    pub fn set_default_response(&self, response: MockResponse) {
        *self.default_response.lock() = Some(response);
    }

    /// Delay every response for `url` by `delay`.
    pub fn set_delay(&self, url: &str, delay: Duration) {
        self.delays.lock().insert(url.to_string(), delay);
    }

    /// Get all recorded requests.
    pub fn get_requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().clone()
    }

    /// Recorded requests whose URL equals `url`.
    pub fn requests_to(&self, url: &str) -> Vec<RecordedRequest> {
        self.requests
            .lock()
            .iter()
            .filter(|r| r.url == url)
            .cloned()
            .collect()
    }

    /// Number of recorded requests whose URL equals `url`.
    pub fn request_count(&self, url: &str) -> usize {
        self.requests.lock().iter().filter(|r| r.url == url).count()
    }

    /// Clear all recorded requests.
    pub fn clear_requests(&self) {
        self.requests.lock().clear();
    }

    /// Clear all configured responses.
    pub fn clear_responses(&self) {
        self.responses.lock().clear();
        self.queued.lock().clear();
    }

    fn record_request(&self, request: &RequestSpec) -> RecordedRequest {
        let recorded = RecordedRequest::from_spec(request);
        self.requests.lock().push(recorded.clone());
        recorded
    }

    fn get_response(&self, request: &RecordedRequest) -> Option<MockResponse> {
        let url = request.url.as_str();

        if let Some(queue) = self.queued.lock().get_mut(url) {
            if !queue.is_empty() {
                return Some(queue.remove(0));
            }
        }

        let responder = {
            let responses = self.responses.lock();
            responses.get(url).cloned().or_else(|| {
                responses
                    .iter()
                    .find(|(pattern, _)| url.starts_with(pattern.as_str()))
                    .map(|(_, responder)| responder.clone())
            })
        };
        if let Some(responder) = responder {
            return Some(responder.respond(request));
        }

        self.default_response.lock().clone()
    }

    async fn delay_for(&self, url: &str) {
        let delay = self.delays.lock().get(url).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl HttpClient for MockHttpClient {
    async fn execute(&self, request: &RequestSpec) -> Result<Response, HttpError> {
        let recorded = self.record_request(request);
        self.delay_for(&request.url).await;

        match self.get_response(&recorded) {
            Some(MockResponse::Success(response)) => Ok(response),
            Some(MockResponse::Error(err)) | Some(MockResponse::StreamError(err)) => Err(err),
            Some(_) => Err(HttpError::Other(
                "Stream response on non-stream request".to_string(),
            )),
            None => Err(HttpError::Other(format!(
                "No mock response for URL: {}",
                request.url
            ))),
        }
    }

    async fn execute_stream(&self, request: &RequestSpec) -> Result<ByteStream, HttpError> {
        let recorded = self.record_request(request);
        self.delay_for(&request.url).await;

        match self.get_response(&recorded) {
            Some(MockResponse::Stream(chunks)) => {
                Ok(Box::pin(futures::stream::iter(chunks.into_iter().map(Ok))))
            }
            Some(MockResponse::DelayedStream(chunks, delay)) => {
                let stream = futures::stream::iter(chunks).then(move |chunk| async move {
                    tokio::time::sleep(delay).await;
                    Ok::<_, HttpError>(chunk)
                });
                Ok(Box::pin(stream))
            }
            Some(MockResponse::OpenStream(chunks)) => {
                let stream = futures::stream::iter(chunks.into_iter().map(Ok))
                    .chain(futures::stream::pending());
                Ok(Box::pin(stream))
            }
            Some(MockResponse::BrokenStream(chunks, err)) => {
                let stream = futures::stream::iter(chunks.into_iter().map(Ok))
                    .chain(futures::stream::once(async move { Err(err) }));
                Ok(Box::pin(stream))
            }
            Some(MockResponse::StreamError(err)) | Some(MockResponse::Error(err)) => Err(err),
            Some(MockResponse::Success(response)) if response.is_success() => Err(
                HttpError::Other("Non-stream response on stream request".to_string()),
            ),
            Some(MockResponse::Success(response)) => Err(HttpError::ServerError {
                status: response.status,
                message: response.text().unwrap_or_default(),
            }),
            None => Err(HttpError::Other(format!(
                "No mock response for URL: {}",
                request.url
            ))),
        }
    }
}
