//! Stream session: one streaming request and its read loop.
//!
//! The session opens the request with a fixed credential (it never takes
//! part in refresh), then loops reading chunks, decoding frames and folding
//! them into a [`ConversationStreamReducer`] shared with the
//! [`StreamHandle`]. Cancelling through the handle is synchronous: the
//! shared state is `Cancelled` before `cancel` returns, and anything the
//! read loop produces afterwards is absorbed by the reducer.

use futures_util::StreamExt;
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::decoder::FrameDecoder;
use super::reducer::{ConversationStreamReducer, ConversationStreamState, StreamPhase, Transition};
use crate::error::StreamError;
use crate::sse::{parse_conversation_event, StreamFrame};
use crate::traits::{ByteStream, HttpClient, RequestSpec};

/// Invoked once with the final result when the stream completes.
pub type CompletionHook = Box<dyn FnOnce(&Value) + Send + Sync>;

/// Reducer plus its observers, shared by the read loop and the handle.
struct Shared {
    reducer: Mutex<ConversationStreamReducer>,
    state_tx: watch::Sender<ConversationStreamState>,
}

impl Shared {
    /// Apply `f` to the reducer and publish the state if anything changed.
    fn update(&self, f: impl FnOnce(&mut ConversationStreamReducer) -> Transition) -> Transition {
        let mut reducer = self.reducer.lock();
        let transition = f(&mut reducer);
        if transition != Transition::Ignored {
            self.state_tx.send_replace(reducer.state().clone());
        }
        transition
    }

    fn snapshot(&self) -> ConversationStreamState {
        self.reducer.lock().state().clone()
    }

    fn phase(&self) -> StreamPhase {
        self.reducer.lock().phase()
    }
}

/// A streaming request that has not been started yet.
///
/// # Example
///
/// ```ignore
/// let mut handle = StreamSession::new(http, url, &json!({"content": "Add search"}), Some("T1"))?
///     .with_read_timeout(Some(Duration::from_secs(120)))
///     .start();
/// let final_state = handle.wait().await;
/// ```
pub struct StreamSession {
    id: Uuid,
    http: Arc<dyn HttpClient>,
    request: RequestSpec,
    read_timeout: Option<Duration>,
    on_complete: Option<CompletionHook>,
}

impl StreamSession {
    /// Prepare a POST of `body` to `endpoint`, carrying `credential` as a
    /// static bearer header.
    pub fn new<B: Serialize + ?Sized>(
        http: Arc<dyn HttpClient>,
        endpoint: impl Into<String>,
        body: &B,
        credential: Option<&str>,
    ) -> Result<Self, serde_json::Error> {
        let mut request = RequestSpec::post(endpoint).with_json(body)?;
        if let Some(token) = credential {
            request = request.with_bearer(token);
        }
        Ok(Self {
            id: Uuid::new_v4(),
            http,
            request,
            read_timeout: None,
            on_complete: None,
        })
    }

    /// Fail the stream when no chunk arrives within `timeout`.
    pub fn with_read_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Run `hook` with the final result once the stream completes.
    pub fn on_complete(mut self, hook: impl FnOnce(&Value) + Send + Sync + 'static) -> Self {
        self.on_complete = Some(Box::new(hook));
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Spawn the read loop on the current tokio runtime.
    pub fn start(self) -> StreamHandle {
        let mut reducer = ConversationStreamReducer::new();
        reducer.begin();
        let (state_tx, state_rx) = watch::channel(reducer.state().clone());
        let shared = Arc::new(Shared {
            reducer: Mutex::new(reducer),
            state_tx,
        });
        let cancel = CancellationToken::new();
        let id = self.id;

        tracing::debug!(session = %id, url = %self.request.url, "Starting stream");
        let task = tokio::spawn(self.run(Arc::clone(&shared), cancel.clone()));

        StreamHandle {
            id,
            shared,
            state_rx,
            cancel,
            task,
        }
    }

    async fn run(mut self, shared: Arc<Shared>, cancel: CancellationToken) {
        self.read_loop(&shared, &cancel).await;
        tracing::debug!(
            session = %self.id,
            phase = shared.phase().as_str(),
            "Stream session finished"
        );
    }

    async fn read_loop(&mut self, shared: &Shared, cancel: &CancellationToken) {
        let opened = tokio::select! {
            biased;
            _ = cancel.cancelled() => return,
            opened = self.http.execute_stream(&self.request) => opened,
        };
        let mut body = match opened {
            Ok(body) => body,
            Err(e) => {
                let err = StreamError::from(e);
                tracing::warn!(
                    session = %self.id,
                    code = err.error_code(),
                    error = %err,
                    "Failed to open stream"
                );
                shared.update(|r| r.fail(&err));
                return;
            }
        };

        let mut decoder = FrameDecoder::new();
        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::debug!(session = %self.id, "Stream cancelled");
                    return;
                }
                next = next_chunk(&mut body, self.read_timeout) => next,
            };

            match next {
                Ok(Some(chunk)) => {
                    let frames = decoder.push(&chunk);
                    if self.dispatch(shared, frames) {
                        return;
                    }
                }
                Ok(None) => {
                    let frames = decoder.finish();
                    if self.dispatch(shared, frames) {
                        return;
                    }
                    if shared.update(|r| r.finish()) == Transition::Failed {
                        tracing::warn!(session = %self.id, "Stream ended without a result");
                    }
                    return;
                }
                Err(err) => {
                    tracing::warn!(
                        session = %self.id,
                        code = err.error_code(),
                        error = %err,
                        "Stream read failed"
                    );
                    shared.update(|r| r.fail(&err));
                    return;
                }
            }
        }
    }

    /// Fold frames into the reducer. Returns true once the stream is terminal.
    fn dispatch(&mut self, shared: &Shared, frames: Vec<StreamFrame>) -> bool {
        for frame in frames {
            let event = match parse_conversation_event(&frame) {
                Ok(Some(event)) => event,
                Ok(None) => {
                    tracing::debug!(event_type = %frame.event_type, "Ignoring unknown frame type");
                    continue;
                }
                Err(e) => {
                    tracing::warn!(session = %self.id, error = %e, "Dropping undecodable frame");
                    continue;
                }
            };

            tracing::trace!(
                session = %self.id,
                event_type = event.event_type_name(),
                "Applying event"
            );
            let transition = shared.update(|r| r.apply(event));
            match transition {
                Transition::Completed => {
                    tracing::debug!(session = %self.id, "Stream completed");
                    if let (Some(hook), Some(result)) =
                        (self.on_complete.take(), shared.snapshot().final_result)
                    {
                        hook(&result);
                    }
                }
                Transition::Failed => {
                    tracing::warn!(session = %self.id, "Stream failed with error frame");
                }
                Transition::Cancelled | Transition::Updated | Transition::Ignored => {}
            }
            // A cancel from the handle lands between frames as Ignored.
            if transition.is_terminal() || shared.phase().is_terminal() {
                return true;
            }
        }
        false
    }
}

async fn next_chunk(
    body: &mut ByteStream,
    read_timeout: Option<Duration>,
) -> Result<Option<bytes::Bytes>, StreamError> {
    let item = match read_timeout {
        Some(limit) => tokio::time::timeout(limit, body.next())
            .await
            .map_err(|_| StreamError::Timeout {
                timeout_secs: limit.as_secs(),
            })?,
        None => body.next().await,
    };
    match item {
        Some(Ok(chunk)) => Ok(Some(chunk)),
        Some(Err(e)) => Err(StreamError::ConnectionLost {
            message: e.to_string(),
        }),
        None => Ok(None),
    }
}

/// Handle to a running stream session.
///
/// Dropping the handle aborts the network read; the state observed so far
/// stays as it was.
pub struct StreamHandle {
    id: Uuid,
    shared: Arc<Shared>,
    state_rx: watch::Receiver<ConversationStreamState>,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl StreamHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Current state snapshot.
    pub fn state(&self) -> ConversationStreamState {
        self.shared.snapshot()
    }

    /// Receiver notified on every state change.
    pub fn subscribe(&self) -> watch::Receiver<ConversationStreamState> {
        self.state_rx.clone()
    }

    /// Cancel the stream.
    ///
    /// The state is `Cancelled` when this returns, unless the stream had
    /// already reached a terminal state. No later frame changes it.
    pub fn cancel(&self) {
        if self.shared.update(|r| r.cancel()) == Transition::Cancelled {
            tracing::debug!(session = %self.id, "Cancelling stream");
        }
        self.cancel.cancel();
    }

    /// Whether the read loop has exited.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait until the stream reaches a terminal state and return it.
    pub async fn wait(&mut self) -> ConversationStreamState {
        let mut rx = self.state_rx.clone();
        let mut loop_exited = self.task.is_finished();
        loop {
            if rx.borrow_and_update().phase.is_terminal() || loop_exited {
                break;
            }
            tokio::select! {
                changed = rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                _ = &mut self.task => loop_exited = true,
            }
        }
        self.state()
    }
}

impl Drop for StreamHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
