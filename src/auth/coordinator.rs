//! Auth transport coordinator.
//!
//! Every authenticated request of the application goes through
//! [`AuthTransport::send`]. It attaches the stored access credential and,
//! when the server answers 401, runs the single-flight refresh before
//! re-issuing the request exactly once:
//!
//! ```text
//! request ──► 401? ──no──► response
//!              │
//!              ├─ excluded path or already retried ──► response (unchanged)
//!              │
//!              └─ join refresh episode
//!                   ├─ leader: exchange refresh token, store pair, wake waiters
//!                   └─ waiter: await leader's outcome
//!                        │
//!                        └─ ok: replay once with new token
//!                           err: credentials cleared, session expired, error
//! ```

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;

use super::credentials::{CredentialPair, CredentialsManager};
use super::episode::{RefreshEpisode, RefreshOutcome, Ticket};
use super::refresh::{error_message, HttpRefreshExecutor, RefreshExecutor};
use crate::adapters::{BrowserLoginRedirect, FileCredentialsProvider, ReqwestHttpClient};
use crate::config::{TransportConfig, LOGIN_PATH, REGISTER_PATH};
use crate::error::{AuthError, TransportError, TransportResult};
use crate::traits::{
    CredentialsProvider, HttpClient, LogSessionExpired, RequestSpec, Response,
    SessionExpiredHandler,
};

const USER_AGENT: &str = concat!("speclink/", env!("CARGO_PKG_VERSION"));

#[derive(Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

/// Authenticated request pipeline with single-flight credential refresh.
///
/// Cheap to clone; clones share the credential store and the refresh
/// episode, so concurrent 401s across clones still cause one refresh.
#[derive(Clone)]
pub struct AuthTransport {
    http: Arc<dyn HttpClient>,
    credentials: Arc<dyn CredentialsProvider>,
    refresher: Arc<dyn RefreshExecutor>,
    session_expired: Arc<dyn SessionExpiredHandler>,
    episode: RefreshEpisode,
    config: TransportConfig,
}

impl AuthTransport {
    /// Create a transport over the given HTTP client and credential store.
    ///
    /// The refresh exchange goes through the same (bare) HTTP client, and
    /// an expired session is only logged until a handler is installed.
    pub fn new(
        config: TransportConfig,
        http: Arc<dyn HttpClient>,
        credentials: Arc<dyn CredentialsProvider>,
    ) -> Self {
        let refresher = Arc::new(HttpRefreshExecutor::new(
            Arc::clone(&http),
            config.refresh_url(),
        ));
        Self {
            http,
            credentials,
            refresher,
            session_expired: Arc::new(LogSessionExpired),
            episode: RefreshEpisode::new(),
            config,
        }
    }

    /// Production wiring: reqwest client, file-backed credentials, and a
    /// browser redirect when a login URL is configured.
    pub fn from_config(config: TransportConfig) -> TransportResult<Self> {
        let manager = match &config.credentials_path {
            Some(path) => CredentialsManager::with_path(path.clone()),
            None => CredentialsManager::new().ok_or_else(|| {
                TransportError::Config("could not determine home directory".to_string())
            })?,
        };
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| TransportError::Config(format!("failed to build HTTP client: {}", e)))?;
        let http = Arc::new(ReqwestHttpClient::with_client(client));
        let credentials = Arc::new(FileCredentialsProvider::with_manager(manager));

        let mut transport = Self::new(config, http, credentials);
        if let Some(login_url) = transport.config.login_url.clone() {
            transport = transport.with_session_expired_handler(Arc::new(
                BrowserLoginRedirect::new(login_url),
            ));
        }
        Ok(transport)
    }

    /// Replace the refresh executor.
    pub fn with_refresh_executor(mut self, refresher: Arc<dyn RefreshExecutor>) -> Self {
        self.refresher = refresher;
        self
    }

    /// Replace the session-expired handler.
    pub fn with_session_expired_handler(mut self, handler: Arc<dyn SessionExpiredHandler>) -> Self {
        self.session_expired = handler;
        self
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    /// Bare HTTP client, for calls that must not be refreshed (streams).
    pub fn http(&self) -> Arc<dyn HttpClient> {
        Arc::clone(&self.http)
    }

    pub fn credentials(&self) -> Arc<dyn CredentialsProvider> {
        Arc::clone(&self.credentials)
    }

    /// Whether a refresh episode is currently running.
    pub fn is_refreshing(&self) -> bool {
        self.episode.is_in_progress()
    }

    /// Access credential currently in the store.
    pub async fn current_access_token(&self) -> TransportResult<Option<String>> {
        Ok(self.credentials.load().await?.map(|pair| pair.access_token))
    }

    /// Whether a credential pair is stored.
    pub async fn is_authenticated(&self) -> TransportResult<bool> {
        Ok(self.credentials.load().await?.is_some())
    }

    /// Send a request, refreshing credentials once on a 401.
    ///
    /// Non-401 responses of any status are returned unmodified. A 401 on an
    /// excluded path, or on the replayed request, is returned as-is. When
    /// the refresh fails the error is returned and the request is not replayed.
    pub async fn send(&self, request: RequestSpec) -> TransportResult<Response> {
        let token = self.current_access_token().await?;
        let response = self.issue(&request, token.as_deref()).await?;
        if !response.is_unauthorized() {
            return Ok(response);
        }

        let path = request.path();
        if self.config.is_excluded(&path) {
            tracing::debug!(path = %path, "401 on excluded path, not refreshing");
            return Ok(response);
        }

        tracing::debug!(
            method = request.method.as_str(),
            path = %path,
            "Access token rejected, refreshing"
        );
        let fresh = self.refreshed_access_token().await?;

        let replay = self.issue(&request, Some(&fresh)).await?;
        if replay.is_unauthorized() {
            tracing::warn!(path = %path, "Request rejected again after refresh");
        }
        Ok(replay)
    }

    /// GET `path` and decode a JSON body.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> TransportResult<T> {
        let response = self.send(RequestSpec::get(self.config.url(path))).await?;
        decode(response)
    }

    /// POST a JSON body to `path` and decode a JSON response.
    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> TransportResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = RequestSpec::post(self.config.url(path)).with_json(body)?;
        decode(self.send(request).await?)
    }

    /// Sign in with email and password and store the returned pair.
    pub async fn login(&self, email: &str, password: &str) -> TransportResult<CredentialPair> {
        self.establish(LOGIN_PATH, &LoginRequest { email, password })
            .await
    }

    /// Create an account and store the returned pair.
    pub async fn register<B: Serialize + ?Sized>(&self, body: &B) -> TransportResult<CredentialPair> {
        self.establish(REGISTER_PATH, body).await
    }

    /// Forget the stored pair. Safe to call when logged out.
    pub async fn logout(&self) -> TransportResult<()> {
        self.credentials.clear().await?;
        tracing::info!("Logged out");
        Ok(())
    }

    async fn establish<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> TransportResult<CredentialPair> {
        let request = RequestSpec::post(self.config.url(path)).with_json(body)?;
        let response = self.send(request).await?;
        if !response.is_success() {
            return Err(AuthError::Rejected {
                status: response.status,
                message: error_message(&response),
            }
            .into());
        }

        let pair: CredentialPair = response.json()?;
        self.credentials.save(&pair).await?;
        tracing::info!(path = %path, "Signed in");
        Ok(pair)
    }

    async fn issue(&self, request: &RequestSpec, token: Option<&str>) -> TransportResult<Response> {
        let response = match token {
            Some(token) => self.http.execute(&request.with_bearer(token)).await?,
            None => self.http.execute(request).await?,
        };
        Ok(response)
    }

    /// Join the refresh episode and obtain the new access token.
    async fn refreshed_access_token(&self) -> Result<String, AuthError> {
        match self.episode.join() {
            Ticket::Waiter(rx) => {
                tracing::debug!("Refresh already in progress, waiting");
                // sender dropped without a value only if the leader vanished
                rx.await.unwrap_or(Err(AuthError::RefreshAbandoned))
            }
            Ticket::Leader(guard) => {
                let outcome = self.run_refresh().await;
                if let Err(err) = &outcome {
                    self.expire_session(err).await;
                }
                let resolved = guard.finish(&outcome);
                match &outcome {
                    Ok(_) => tracing::info!(waiters = resolved, "Credentials refreshed"),
                    Err(err) => tracing::warn!(
                        waiters = resolved,
                        error = %err,
                        code = err.error_code(),
                        "Credential refresh failed"
                    ),
                }
                outcome
            }
        }
    }

    /// The leader's part: exchange, then store the new pair.
    async fn run_refresh(&self) -> RefreshOutcome {
        let pair = self
            .credentials
            .load()
            .await
            .map_err(|e| AuthError::refresh_failed(e.to_string()))?
            .ok_or(AuthError::NotAuthenticated)?;

        let exchange = self.refresher.execute(&pair.refresh_token);
        let fresh = match self.config.refresh_timeout {
            Some(limit) => tokio::time::timeout(limit, exchange)
                .await
                .map_err(|_| AuthError::RefreshTimedOut {
                    timeout_secs: limit.as_secs(),
                })??,
            None => exchange.await?,
        };

        if let Err(err) = self.credentials.save(&fresh).await {
            tracing::warn!(error = %err, "Failed to store refreshed credentials");
        }
        Ok(fresh.access_token)
    }

    /// Runs once per failed episode, before the waiters are rejected.
    async fn expire_session(&self, err: &AuthError) {
        if let Err(clear_err) = self.credentials.clear().await {
            tracing::error!(error = %clear_err, "Failed to clear credentials");
        }
        self.session_expired.on_session_expired(&err.to_string());
    }
}

fn decode<T: DeserializeOwned>(response: Response) -> TransportResult<T> {
    if !response.is_success() {
        return Err(TransportError::Status {
            status: response.status,
            message: error_message(&response),
        });
    }
    Ok(response.json()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::mock::{InMemoryCredentials, MockHttpClient, MockResponse};
    use bytes::Bytes;
    use parking_lot::Mutex;
    use std::time::Duration;

    const BASE: &str = "https://api.example.com/api";
    const FEATURES: &str = "https://api.example.com/api/features";
    const REFRESH: &str = "https://api.example.com/api/auth/refresh-token";

    #[derive(Default)]
    struct RecordingHandler {
        reasons: Mutex<Vec<String>>,
    }

    impl SessionExpiredHandler for RecordingHandler {
        fn on_session_expired(&self, reason: &str) {
            self.reasons.lock().push(reason.to_string());
        }
    }

    fn ok(body: &str) -> MockResponse {
        MockResponse::Success(Response::new(200, Bytes::from(body.to_string())))
    }

    fn status(code: u16, body: &str) -> MockResponse {
        MockResponse::Success(Response::new(code, Bytes::from(body.to_string())))
    }

    /// Features endpoint accepts only `T2`.
    fn protect_features(mock: &MockHttpClient) {
        mock.set_handler(FEATURES, |request| match request.bearer_token() {
            Some("T2") => ok(r#"[{"id":1}]"#),
            _ => status(401, r#"{"message":"jwt expired"}"#),
        });
    }

    fn setup(
        mock: &MockHttpClient,
        creds: &InMemoryCredentials,
    ) -> (AuthTransport, Arc<RecordingHandler>) {
        let handler = Arc::new(RecordingHandler::default());
        let transport = AuthTransport::new(
            TransportConfig::new(BASE),
            Arc::new(mock.clone()),
            Arc::new(creds.clone()),
        )
        .with_session_expired_handler(handler.clone());
        (transport, handler)
    }

    #[tokio::test]
    async fn test_success_passes_through_with_bearer() {
        let mock = MockHttpClient::new();
        mock.set_response(FEATURES, ok("[]"));
        let creds = InMemoryCredentials::with_credentials(CredentialPair::new("T1", "R1"));
        let (transport, _) = setup(&mock, &creds);

        let response = transport.send(RequestSpec::get(FEATURES)).await.unwrap();

        assert_eq!(response.status, 200);
        let requests = mock.get_requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].bearer_token(), Some("T1"));
    }

    #[tokio::test]
    async fn test_non_401_errors_are_not_refreshed() {
        let mock = MockHttpClient::new();
        mock.set_response(FEATURES, status(403, "forbidden"));
        let creds = InMemoryCredentials::with_credentials(CredentialPair::new("T1", "R1"));
        let (transport, _) = setup(&mock, &creds);

        let response = transport.send(RequestSpec::get(FEATURES)).await.unwrap();

        assert_eq!(response.status, 403);
        assert_eq!(mock.request_count(REFRESH), 0);
    }

    #[tokio::test]
    async fn test_401_refreshes_and_replays_once() {
        let mock = MockHttpClient::new();
        protect_features(&mock);
        mock.set_response(REFRESH, ok(r#"{"accessToken":"T2","refreshToken":"R2"}"#));
        let creds = InMemoryCredentials::with_credentials(CredentialPair::new("T1", "R1"));
        let (transport, handler) = setup(&mock, &creds);

        let response = transport.send(RequestSpec::get(FEATURES)).await.unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(creds.get_credentials(), Some(CredentialPair::new("T2", "R2")));
        let tokens: Vec<_> = mock
            .requests_to(FEATURES)
            .iter()
            .map(|r| r.bearer_token().map(str::to_string))
            .collect();
        assert_eq!(tokens, vec![Some("T1".to_string()), Some("T2".to_string())]);
        assert!(handler.reasons.lock().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_401s_share_one_refresh() {
        let mock = MockHttpClient::new();
        protect_features(&mock);
        mock.set_response(REFRESH, ok(r#"{"accessToken":"T2","refreshToken":"R2"}"#));
        mock.set_delay(REFRESH, Duration::from_millis(50));
        let creds = InMemoryCredentials::with_credentials(CredentialPair::new("T1", "R1"));
        let (transport, _) = setup(&mock, &creds);

        let calls = (0..5).map(|_| transport.send(RequestSpec::get(FEATURES)));
        let results = futures::future::join_all(calls).await;

        for result in results {
            assert_eq!(result.unwrap().status, 200);
        }
        assert_eq!(mock.request_count(REFRESH), 1);
        let replays = mock
            .requests_to(FEATURES)
            .into_iter()
            .filter(|r| r.bearer_token() == Some("T2"))
            .count();
        assert_eq!(replays, 5);
        assert!(!transport.is_refreshing());
    }

    #[tokio::test]
    async fn test_refresh_failure_fans_out_and_clears_once() {
        let mock = MockHttpClient::new();
        protect_features(&mock);
        mock.set_response(REFRESH, status(401, r#"{"message":"refresh token revoked"}"#));
        mock.set_delay(REFRESH, Duration::from_millis(20));
        let creds = InMemoryCredentials::with_credentials(CredentialPair::new("T1", "R1"));
        let (transport, handler) = setup(&mock, &creds);

        let calls = (0..3).map(|_| transport.send(RequestSpec::get(FEATURES)));
        let results = futures::future::join_all(calls).await;

        for result in results {
            let err = result.unwrap_err();
            assert!(err.requires_reauth(), "unexpected error: {err}");
        }
        assert_eq!(mock.request_count(REFRESH), 1);
        assert_eq!(creds.clear_count(), 1);
        assert!(creds.get_credentials().is_none());
        assert_eq!(handler.reasons.lock().len(), 1);
        // no replay after a failed refresh
        assert_eq!(mock.request_count(FEATURES), 3);
    }

    #[tokio::test]
    async fn test_second_401_is_returned_without_third_attempt() {
        let mock = MockHttpClient::new();
        mock.set_response(FEATURES, status(401, "still no"));
        mock.set_response(REFRESH, ok(r#"{"accessToken":"T2","refreshToken":"R2"}"#));
        let creds = InMemoryCredentials::with_credentials(CredentialPair::new("T1", "R1"));
        let (transport, handler) = setup(&mock, &creds);

        let response = transport.send(RequestSpec::get(FEATURES)).await.unwrap();

        assert_eq!(response.status, 401);
        assert_eq!(mock.request_count(FEATURES), 2);
        assert_eq!(mock.request_count(REFRESH), 1);
        assert!(handler.reasons.lock().is_empty());
    }

    #[tokio::test]
    async fn test_excluded_paths_return_401_untouched() {
        let mock = MockHttpClient::new();
        let login = format!("{}/auth/login", BASE);
        mock.set_response(&login, status(401, r#"{"message":"bad credentials"}"#));
        let creds = InMemoryCredentials::with_credentials(CredentialPair::new("T1", "R1"));
        let (transport, _) = setup(&mock, &creds);

        let response = transport.send(RequestSpec::post(&login)).await.unwrap();

        assert_eq!(response.status, 401);
        assert_eq!(mock.request_count(REFRESH), 0);
        assert_eq!(creds.clear_count(), 0);
    }

    #[tokio::test]
    async fn test_fresh_episode_after_resolution() {
        let mock = MockHttpClient::new();
        mock.set_response(FEATURES, status(401, "expired"));
        mock.set_response(REFRESH, ok(r#"{"accessToken":"T2","refreshToken":"R2"}"#));
        let creds = InMemoryCredentials::with_credentials(CredentialPair::new("T1", "R1"));
        let (transport, _) = setup(&mock, &creds);

        transport.send(RequestSpec::get(FEATURES)).await.unwrap();
        transport.send(RequestSpec::get(FEATURES)).await.unwrap();

        assert_eq!(mock.request_count(REFRESH), 2);
        let refreshes = mock.requests_to(REFRESH);
        assert_eq!(refreshes[1].body.as_deref(), Some(r#"{"refreshToken":"R2"}"#));
    }

    #[tokio::test]
    async fn test_refresh_timeout_counts_as_failure() {
        let mock = MockHttpClient::new();
        protect_features(&mock);
        mock.set_response(REFRESH, ok(r#"{"accessToken":"T2","refreshToken":"R2"}"#));
        mock.set_delay(REFRESH, Duration::from_secs(5));
        let creds = InMemoryCredentials::with_credentials(CredentialPair::new("T1", "R1"));
        let handler = Arc::new(RecordingHandler::default());
        let transport = AuthTransport::new(
            TransportConfig::new(BASE).with_refresh_timeout(Some(Duration::from_millis(20))),
            Arc::new(mock.clone()),
            Arc::new(creds.clone()),
        )
        .with_session_expired_handler(handler.clone());

        let err = transport.send(RequestSpec::get(FEATURES)).await.unwrap_err();

        assert!(matches!(
            err,
            TransportError::Auth(AuthError::RefreshTimedOut { .. })
        ));
        assert!(creds.get_credentials().is_none());
        assert_eq!(handler.reasons.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_401_while_logged_out_expires_session() {
        let mock = MockHttpClient::new();
        protect_features(&mock);
        let creds = InMemoryCredentials::new();
        let (transport, handler) = setup(&mock, &creds);

        let err = transport.send(RequestSpec::get(FEATURES)).await.unwrap_err();

        assert!(matches!(err, TransportError::Auth(AuthError::NotAuthenticated)));
        assert!(mock.requests_to(FEATURES)[0].bearer_token().is_none());
        assert_eq!(mock.request_count(REFRESH), 0);
        assert_eq!(handler.reasons.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_get_json_decodes_and_maps_status() {
        let mock = MockHttpClient::new();
        mock.set_response(FEATURES, ok(r#"[{"id":1},{"id":2}]"#));
        let missing = format!("{}/features/9", BASE);
        mock.set_response(&missing, status(404, r#"{"message":"Feature not found"}"#));
        let creds = InMemoryCredentials::with_credentials(CredentialPair::new("T1", "R1"));
        let (transport, _) = setup(&mock, &creds);

        let features: Vec<serde_json::Value> = transport.get_json("/features").await.unwrap();
        assert_eq!(features.len(), 2);

        let err = transport
            .get_json::<serde_json::Value>("/features/9")
            .await
            .unwrap_err();
        match err {
            TransportError::Status { status, message } => {
                assert_eq!(status, 404);
                assert_eq!(message, "Feature not found");
            }
            other => panic!("expected status error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_login_stores_pair() {
        let mock = MockHttpClient::new();
        let login = format!("{}/auth/login", BASE);
        mock.set_response(
            &login,
            ok(r#"{"accessToken":"T1","refreshToken":"R1","user":{"id":7}}"#),
        );
        let creds = InMemoryCredentials::new();
        let (transport, _) = setup(&mock, &creds);

        let pair = transport.login("ada@example.com", "secret").await.unwrap();

        assert_eq!(pair, CredentialPair::new("T1", "R1"));
        assert_eq!(creds.get_credentials(), Some(pair));
        assert!(transport.is_authenticated().await.unwrap());
    }

    #[tokio::test]
    async fn test_rejected_login_is_auth_error() {
        let mock = MockHttpClient::new();
        let login = format!("{}/auth/login", BASE);
        mock.set_response(&login, status(401, r#"{"message":"Invalid credentials"}"#));
        let creds = InMemoryCredentials::new();
        let (transport, _) = setup(&mock, &creds);

        let err = transport.login("ada@example.com", "nope").await.unwrap_err();

        assert!(matches!(
            err,
            TransportError::Auth(AuthError::Rejected { status: 401, .. })
        ));
        assert!(creds.get_credentials().is_none());
    }

    #[tokio::test]
    async fn test_register_stores_pair() {
        let mock = MockHttpClient::new();
        let register = format!("{}/auth/register", BASE);
        mock.set_response(&register, ok(r#"{"accessToken":"T9","refreshToken":"R9"}"#));
        let creds = InMemoryCredentials::new();
        let (transport, _) = setup(&mock, &creds);

        let body = serde_json::json!({"email": "ada@example.com", "password": "secret", "name": "Ada"});
        transport.register(&body).await.unwrap();

        assert_eq!(creds.get_credentials(), Some(CredentialPair::new("T9", "R9")));
        let request = &mock.requests_to(&register)[0];
        assert_eq!(request.method, "POST");
        assert!(request.body.as_deref().unwrap().contains("\"name\":\"Ada\""));
    }

    #[tokio::test]
    async fn test_post_json_refreshes_and_replays_body() {
        let mock = MockHttpClient::new();
        protect_features(&mock);
        mock.set_response(REFRESH, ok(r#"{"accessToken":"T2","refreshToken":"R2"}"#));
        let creds = InMemoryCredentials::with_credentials(CredentialPair::new("T1", "R1"));
        let (transport, _) = setup(&mock, &creds);

        let created: Vec<serde_json::Value> = transport
            .post_json("/features", &serde_json::json!({"title": "Search"}))
            .await
            .unwrap();

        assert_eq!(created, vec![serde_json::json!({"id": 1})]);
        let bodies: Vec<_> = mock
            .requests_to(FEATURES)
            .into_iter()
            .map(|r| r.body)
            .collect();
        assert_eq!(
            bodies,
            vec![
                Some(r#"{"title":"Search"}"#.to_string()),
                Some(r#"{"title":"Search"}"#.to_string())
            ]
        );
    }

    #[tokio::test]
    async fn test_logout_clears_store() {
        let mock = MockHttpClient::new();
        let creds = InMemoryCredentials::with_credentials(CredentialPair::new("T1", "R1"));
        let (transport, _) = setup(&mock, &creds);

        transport.logout().await.unwrap();
        transport.logout().await.unwrap();

        assert!(!transport.is_authenticated().await.unwrap());
    }
}
