//! Session-expired handler that sends the user back to the login page.

use crate::traits::SessionExpiredHandler;

/// Opens the configured login URL in the system browser.
#[derive(Debug, Clone)]
pub struct BrowserLoginRedirect {
    login_url: String,
}

impl BrowserLoginRedirect {
    pub fn new(login_url: impl Into<String>) -> Self {
        Self {
            login_url: login_url.into(),
        }
    }

    pub fn login_url(&self) -> &str {
        &self.login_url
    }
}

impl SessionExpiredHandler for BrowserLoginRedirect {
    fn on_session_expired(&self, reason: &str) {
        tracing::warn!(reason = %reason, url = %self.login_url, "Session expired, opening login page");
        if let Err(e) = webbrowser::open(&self.login_url) {
            // headless environments have no browser; the URL is in the log
            tracing::error!(error = %e, "Failed to open browser");
        }
    }
}
