//! Transport configuration.
//!
//! Built with the builder pattern or read from the environment:
//!
//! | Variable | Meaning |
//! |----------|---------|
//! | `SPECLINK_API_URL` | API base URL |
//! | `SPECLINK_LOGIN_URL` | Page opened when the session expires |
//! | `SPECLINK_CREDENTIALS_PATH` | Credentials file location |
//! | `SPECLINK_REFRESH_TIMEOUT_SECS` | Refresh exchange timeout, `0` disables |
//! | `SPECLINK_STREAM_READ_TIMEOUT_SECS` | Idle stream read timeout, `0` disables |

use std::path::PathBuf;
use std::time::Duration;

use crate::error::TransportError;

/// Default API base URL.
pub const DEFAULT_API_URL: &str = "http://localhost:3000/api";

/// Credential refresh endpoint.
pub const REFRESH_PATH: &str = "/auth/refresh-token";

/// Login endpoint.
pub const LOGIN_PATH: &str = "/auth/login";

/// Registration endpoint.
pub const REGISTER_PATH: &str = "/auth/register";

const DEFAULT_REFRESH_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_STREAM_READ_TIMEOUT: Duration = Duration::from_secs(120);

/// Configuration shared by the coordinator and stream sessions.
///
/// # Example
///
/// ```ignore
/// use speclink::config::TransportConfig;
/// use std::time::Duration;
///
/// let config = TransportConfig::new("https://api.example.com")
///     .with_refresh_timeout(Some(Duration::from_secs(10)))
///     .with_stream_read_timeout(None);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct TransportConfig {
    /// Base URL every relative path is joined to
    pub base_url: String,
    /// Login surface opened when the session expires
    pub login_url: Option<String>,
    /// Credentials file override (default: `~/.speclink/credentials.json`)
    pub credentials_path: Option<PathBuf>,
    /// Path of the refresh exchange
    pub refresh_path: String,
    /// Paths whose 401 responses never trigger a refresh
    pub excluded_paths: Vec<String>,
    /// Upper bound for one refresh exchange; `None` relies on the transport
    pub refresh_timeout: Option<Duration>,
    /// Upper bound for waiting on the next stream chunk; `None` waits forever
    pub stream_read_timeout: Option<Duration>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self::new(DEFAULT_API_URL)
    }
}

impl TransportConfig {
    /// Create a configuration with default endpoints and timeouts.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            login_url: None,
            credentials_path: None,
            refresh_path: REFRESH_PATH.to_string(),
            excluded_paths: vec![
                REFRESH_PATH.to_string(),
                LOGIN_PATH.to_string(),
                REGISTER_PATH.to_string(),
            ],
            refresh_timeout: Some(DEFAULT_REFRESH_TIMEOUT),
            stream_read_timeout: Some(DEFAULT_STREAM_READ_TIMEOUT),
        }
    }

    /// Build a configuration from `SPECLINK_*` environment variables,
    /// falling back to defaults for unset ones.
    pub fn from_env() -> Result<Self, TransportError> {
        let base_url =
            std::env::var("SPECLINK_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());
        let mut config = Self::new(base_url);

        if let Ok(login_url) = std::env::var("SPECLINK_LOGIN_URL") {
            config.login_url = Some(login_url);
        }
        if let Ok(path) = std::env::var("SPECLINK_CREDENTIALS_PATH") {
            config.credentials_path = Some(PathBuf::from(path));
        }
        if let Some(timeout) = timeout_from_env("SPECLINK_REFRESH_TIMEOUT_SECS")? {
            config.refresh_timeout = timeout;
        }
        if let Some(timeout) = timeout_from_env("SPECLINK_STREAM_READ_TIMEOUT_SECS")? {
            config.stream_read_timeout = timeout;
        }

        Ok(config)
    }

    /// Set the login surface URL.
    pub fn with_login_url(mut self, url: impl Into<String>) -> Self {
        self.login_url = Some(url.into());
        self
    }

    /// Set the credentials file path.
    pub fn with_credentials_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.credentials_path = Some(path.into());
        self
    }

    /// Set the refresh timeout.
    pub fn with_refresh_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.refresh_timeout = timeout;
        self
    }

    /// Set the stream read timeout.
    pub fn with_stream_read_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.stream_read_timeout = timeout;
        self
    }

    /// Join a path onto the base URL. Absolute URLs pass through.
    pub fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Full URL of the refresh exchange.
    pub fn refresh_url(&self) -> String {
        self.url(&self.refresh_path)
    }

    /// Whether a 401 on `path` must be returned as-is instead of refreshed.
    ///
    /// `path` may carry the base URL's path prefix (`/api/auth/login`) or
    /// not (`/auth/login`); after that the match is exact.
    pub fn is_excluded(&self, path: &str) -> bool {
        let path = path.trim_end_matches('/');
        let relative = self
            .base_path()
            .and_then(|base| path.strip_prefix(base.as_str()).map(str::to_string))
            .filter(|rest| rest.is_empty() || rest.starts_with('/'))
            .unwrap_or_else(|| path.to_string());
        self.excluded_paths.iter().any(|excluded| {
            let excluded = excluded.trim_end_matches('/');
            relative == excluded || path == excluded
        })
    }

    /// Path component of the base URL without a trailing slash, if any.
    fn base_path(&self) -> Option<String> {
        let url = reqwest::Url::parse(&self.base_url).ok()?;
        let path = url.path().trim_end_matches('/');
        (!path.is_empty()).then(|| path.to_string())
    }
}

/// `Ok(None)` when unset, `Ok(Some(None))` for `0`.
fn timeout_from_env(var: &str) -> Result<Option<Option<Duration>>, TransportError> {
    let Ok(raw) = std::env::var(var) else {
        return Ok(None);
    };
    let secs: u64 = raw
        .trim()
        .parse()
        .map_err(|_| TransportError::Config(format!("{} must be a number of seconds, got {:?}", var, raw)))?;
    Ok(Some((secs > 0).then(|| Duration::from_secs(secs))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_env() {
        for var in [
            "SPECLINK_API_URL",
            "SPECLINK_LOGIN_URL",
            "SPECLINK_CREDENTIALS_PATH",
            "SPECLINK_REFRESH_TIMEOUT_SECS",
            "SPECLINK_STREAM_READ_TIMEOUT_SECS",
        ] {
            std::env::remove_var(var);
        }
    }

    #[test]
    fn test_defaults() {
        let config = TransportConfig::default();
        assert_eq!(config.base_url, DEFAULT_API_URL);
        assert_eq!(config.refresh_timeout, Some(Duration::from_secs(30)));
        assert_eq!(config.stream_read_timeout, Some(Duration::from_secs(120)));
        assert_eq!(config.refresh_url(), "http://localhost:3000/api/auth/refresh-token");
    }

    #[test]
    fn test_url_joining() {
        let config = TransportConfig::new("https://api.example.com/");
        assert_eq!(config.url("/features"), "https://api.example.com/features");
        assert_eq!(config.url("features/1"), "https://api.example.com/features/1");
        assert_eq!(config.url("https://other.example.com/x"), "https://other.example.com/x");
    }

    #[test]
    fn test_excluded_paths() {
        let config = TransportConfig::new("https://api.example.com/api");
        assert!(config.is_excluded("/api/auth/refresh-token"));
        assert!(config.is_excluded("/auth/login"));
        assert!(config.is_excluded("/api/auth/register/"));
        assert!(!config.is_excluded("/api/features"));
        assert!(!config.is_excluded("/api/auth/me"));
    }

    #[test]
    fn test_excluded_paths_match_whole_path() {
        let config = TransportConfig::new("https://api.example.com/api");
        assert!(!config.is_excluded("/api/features/x/auth/login"));
        assert!(!config.is_excluded("/features/auth/refresh-token"));
        assert!(!config.is_excluded("/apiv2/auth/login"));

        let root = TransportConfig::new("https://api.example.com");
        assert!(root.is_excluded("/auth/login"));
        assert!(!root.is_excluded("/v1/auth/login"));
    }

    #[test]
    #[serial]
    fn test_from_env_overrides() {
        clear_env();
        std::env::set_var("SPECLINK_API_URL", "https://staging.example.com");
        std::env::set_var("SPECLINK_REFRESH_TIMEOUT_SECS", "5");
        std::env::set_var("SPECLINK_STREAM_READ_TIMEOUT_SECS", "0");

        let config = TransportConfig::from_env().unwrap();
        assert_eq!(config.base_url, "https://staging.example.com");
        assert_eq!(config.refresh_timeout, Some(Duration::from_secs(5)));
        assert_eq!(config.stream_read_timeout, None);
        clear_env();
    }

    #[test]
    #[serial]
    fn test_from_env_rejects_garbage_timeout() {
        clear_env();
        std::env::set_var("SPECLINK_REFRESH_TIMEOUT_SECS", "soon");
        let result = TransportConfig::from_env();
        assert!(matches!(result, Err(TransportError::Config(_))));
        clear_env();
    }
}
