//! Outbound HTTP client shared by the verifiers.

use std::time::Duration;

use reqwest::StatusCode;
use tracing::debug;
use url::Url;
use warden_core::ProviderKind;

use crate::error::{IdentityError, IdentityResult};

/// Default per-call timeout.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
/// Largest per-call timeout accepted.
pub const MAX_TIMEOUT_SECS: u64 = 60;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Settings for outbound provider calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpSettings {
    timeout: Duration,
    user_agent: String,
}

impl HttpSettings {
    /// Create settings.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::InvalidConfiguration`] when `timeout_secs`
    /// is zero or above [`MAX_TIMEOUT_SECS`], or the user agent is empty.
    pub fn new(timeout_secs: u64, user_agent: impl Into<String>) -> IdentityResult<Self> {
        if !(1..=MAX_TIMEOUT_SECS).contains(&timeout_secs) {
            return Err(IdentityError::InvalidConfiguration(format!(
                "http timeout must be between 1 and {MAX_TIMEOUT_SECS} seconds, got {timeout_secs}"
            )));
        }
        let user_agent = user_agent.into();
        if user_agent.trim().is_empty() {
            return Err(IdentityError::InvalidConfiguration(
                "http user agent must not be empty".to_string(),
            ));
        }
        Ok(Self {
            timeout: Duration::from_secs(timeout_secs),
            user_agent,
        })
    }

    /// Per-call timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// User agent sent with every request.
    #[must_use]
    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// Build a client with these settings. Redirects are never followed.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::InvalidConfiguration`] if the TLS backend
    /// cannot be initialised.
    pub fn build_client(&self) -> IdentityResult<reqwest::Client> {
        reqwest::Client::builder()
            .timeout(self.timeout)
            .connect_timeout(CONNECT_TIMEOUT.min(self.timeout))
            .redirect(reqwest::redirect::Policy::none())
            .user_agent(self.user_agent.clone())
            .build()
            .map_err(|e| IdentityError::InvalidConfiguration(format!("failed to build HTTP client: {e}")))
    }
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: concat!("warden/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Parse a configured base URL, requiring http(s).
pub(crate) fn parse_base_url(field: &str, raw: &str) -> IdentityResult<Url> {
    let url = Url::parse(raw)
        .map_err(|e| IdentityError::InvalidConfiguration(format!("{field}: invalid URL '{raw}': {e}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(IdentityError::InvalidConfiguration(format!(
            "{field}: URL must use http or https, got '{}'",
            url.scheme()
        )));
    }
    Ok(url)
}

/// Append a path to a base URL without discarding the base's own path.
pub(crate) fn join(base: &Url, path: &str) -> String {
    format!(
        "{}/{}",
        base.as_str().trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Map a non-success status to an error. Response bodies are not read.
pub(crate) fn status_error(provider: ProviderKind, status: StatusCode, what: &str) -> IdentityError {
    debug!(provider = %provider, status = status.as_u16(), what, "Provider returned error status");
    if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
        IdentityError::unavailable(provider, format!("{what} returned {}", status.as_u16()))
    } else {
        IdentityError::rejected(provider, format!("{what} returned {}", status.as_u16()))
    }
}

/// Map a transport error to a sanitized, retryable failure.
pub(crate) fn transport_error(provider: ProviderKind, what: &str, err: &reqwest::Error) -> IdentityError {
    debug!(provider = %provider, what, error = %err, "Provider request failed");
    let reason = if err.is_timeout() {
        format!("{what} timed out")
    } else if err.is_connect() {
        format!("{what} unreachable")
    } else if err.is_decode() {
        return IdentityError::rejected(provider, format!("{what} returned an unexpected response"));
    } else {
        format!("{what} request failed")
    };
    IdentityError::unavailable(provider, reason)
}
