//! Repository-hosting OAuth verifier.
//!
//! An authorization code is exchanged for a user access token, or a user
//! access token is presented directly. The token is then used to read the
//! user's login, numeric id and (optionally) organization memberships.
//! Organization pages are followed through the `Link` header, at most
//! [`MAX_ORG_PAGES`] of them.

use std::fmt;

use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, LINK};
use serde::Deserialize;
use tracing::{debug, warn};
use url::Url;
use warden_core::{ClaimSet, ProviderKind};

use crate::error::{IdentityError, IdentityResult};
use crate::http::{self, HttpSettings};

/// Default OAuth endpoint base.
pub const DEFAULT_OAUTH_URL: &str = "https://github.com";
/// Default REST API base.
pub const DEFAULT_API_URL: &str = "https://api.github.com";

const PROVIDER: ProviderKind = ProviderKind::Github;
const API_ACCEPT: &str = "application/vnd.github+json";
const ORGS_PAGE_SIZE: usize = 100;
/// Upper bound on organization pages read per verification.
pub const MAX_ORG_PAGES: usize = 10;

/// OAuth application settings.
#[derive(Clone)]
pub struct GithubSettings {
    /// OAuth application client id.
    pub client_id: String,
    /// OAuth application client secret.
    pub client_secret: String,
    /// Base of the OAuth endpoints.
    pub oauth_url: String,
    /// Base of the REST API.
    pub api_url: String,
    /// Whether organization memberships are read.
    pub include_orgs: bool,
}

impl fmt::Debug for GithubSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GithubSettings")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("oauth_url", &self.oauth_url)
            .field("api_url", &self.api_url)
            .field("include_orgs", &self.include_orgs)
            .finish()
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    error: Option<String>,
}

#[derive(Deserialize)]
struct UserResponse {
    login: String,
    id: u64,
}

#[derive(Deserialize)]
struct OrgResponse {
    login: String,
}

/// Verifier for the `github` provider.
#[derive(Clone)]
pub struct GithubVerifier {
    client: reqwest::Client,
    client_id: String,
    client_secret: String,
    oauth_url: Url,
    api_url: Url,
    include_orgs: bool,
}

impl fmt::Debug for GithubVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GithubVerifier")
            .field("client_id", &self.client_id)
            .field("oauth_url", &self.oauth_url.as_str())
            .field("api_url", &self.api_url.as_str())
            .field("include_orgs", &self.include_orgs)
            .finish_non_exhaustive()
    }
}

impl GithubVerifier {
    /// Create a verifier.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::InvalidConfiguration`] if a URL is invalid,
    /// the client id is empty, or the HTTP client cannot be built.
    pub fn new(settings: GithubSettings, transport: &HttpSettings) -> IdentityResult<Self> {
        if settings.client_id.trim().is_empty() {
            return Err(IdentityError::InvalidConfiguration(
                "github.client_id must be set".to_string(),
            ));
        }
        Ok(Self {
            client: transport.build_client()?,
            oauth_url: http::parse_base_url("github.oauth_url", &settings.oauth_url)?,
            api_url: http::parse_base_url("github.api_url", &settings.api_url)?,
            client_id: settings.client_id,
            client_secret: settings.client_secret,
            include_orgs: settings.include_orgs,
        })
    }

    /// Exchange an authorization code and read the user's identity.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::Rejected`] when the code or token is refused
    /// and [`IdentityError::Unavailable`] on transport failures or 5xx.
    pub async fn verify_code(&self, code: &str) -> IdentityResult<ClaimSet> {
        let token = self.exchange_code(code).await?;
        self.verify_access_token(&token).await
    }

    /// Read the identity behind a user access token.
    ///
    /// # Errors
    ///
    /// As [`GithubVerifier::verify_code`].
    pub async fn verify_access_token(&self, token: &str) -> IdentityResult<ClaimSet> {
        let user: UserResponse = self.get_json(token, "user", "user lookup").await?;
        let mut builder = ClaimSet::builder(user.login.clone(), PROVIDER)
            .claim("login", user.login.clone())
            .claim("id", user.id);

        if self.include_orgs {
            builder = builder.claim("orgs", self.organizations(token).await?);
        }

        debug!(login = %user.login, "GitHub identity verified");
        Ok(builder.build())
    }

    async fn exchange_code(&self, code: &str) -> IdentityResult<String> {
        let url = http::join(&self.oauth_url, "login/oauth/access_token");
        debug!(url = %url, "Exchanging GitHub authorization code");

        let response = self
            .client
            .post(&url)
            .header(ACCEPT, "application/json")
            .json(&serde_json::json!({
                "client_id": self.client_id,
                "client_secret": self.client_secret,
                "code": code,
            }))
            .send()
            .await
            .map_err(|e| http::transport_error(PROVIDER, "token exchange", &e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(http::status_error(PROVIDER, status, "token exchange"));
        }

        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| http::transport_error(PROVIDER, "token exchange", &e))?;

        if let Some(error) = body.error {
            return Err(IdentityError::rejected(
                PROVIDER,
                format!("token exchange refused: {}", sanitize_error_code(&error)),
            ));
        }
        match body.access_token {
            Some(token) if !token.is_empty() => Ok(token),
            _ => Err(IdentityError::rejected(PROVIDER, "token exchange returned no access token")),
        }
    }

    async fn organizations(&self, token: &str) -> IdentityResult<Vec<String>> {
        const WHAT: &str = "organization lookup";
        let mut next = Some(http::join(&self.api_url, &format!("user/orgs?per_page={ORGS_PAGE_SIZE}")));
        let mut orgs = Vec::new();
        let mut pages = 0usize;

        while let Some(url) = next.take() {
            if pages >= MAX_ORG_PAGES {
                warn!(pages, orgs = orgs.len(), "Organization list truncated");
                break;
            }
            pages = pages.saturating_add(1);

            let response = self.send(token, &url, WHAT).await?;
            next = next_page(response.headers()).filter(|link| self.same_api_origin(link));
            let page: Vec<OrgResponse> = response
                .json()
                .await
                .map_err(|e| http::transport_error(PROVIDER, WHAT, &e))?;
            orgs.extend(page.into_iter().map(|o| o.login));
        }
        Ok(orgs)
    }

    /// The access token is only ever sent to the configured API origin.
    fn same_api_origin(&self, link: &str) -> bool {
        let same = Url::parse(link).is_ok_and(|url| url.origin() == self.api_url.origin());
        if !same {
            warn!(link = %link, "Ignoring pagination link to another origin");
        }
        same
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        token: &str,
        path: &str,
        what: &str,
    ) -> IdentityResult<T> {
        let url = http::join(&self.api_url, path);
        self.send(token, &url, what)
            .await?
            .json()
            .await
            .map_err(|e| http::transport_error(PROVIDER, what, &e))
    }

    async fn send(&self, token: &str, url: &str, what: &str) -> IdentityResult<reqwest::Response> {
        debug!(url = %url, "Querying GitHub API");

        let response = self
            .client
            .get(url)
            .header(ACCEPT, API_ACCEPT)
            .header(AUTHORIZATION, format!("Bearer {token}"))
            .send()
            .await
            .map_err(|e| http::transport_error(PROVIDER, what, &e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(http::status_error(PROVIDER, status, what));
        }
        Ok(response)
    }
}

/// Target of the `rel="next"` entry of a `Link` header.
fn next_page(headers: &HeaderMap) -> Option<String> {
    let link = headers.get(LINK)?.to_str().ok()?;
    link.split(',').find_map(|entry| {
        let (target, params) = entry.split_once(';')?;
        let is_next = params
            .split(';')
            .any(|param| matches!(param.trim(), "rel=\"next\"" | "rel=next"));
        let target = target.trim().strip_prefix('<')?.strip_suffix('>')?;
        is_next.then(|| target.to_string())
    })
}

/// OAuth error codes are short identifiers; anything else is replaced.
fn sanitize_error_code(code: &str) -> &str {
    let looks_like_code = !code.is_empty()
        && code.len() <= 64
        && code.chars().all(|c| c.is_ascii_lowercase() || c == '_');
    if looks_like_code { code } else { "unrecognized error" }
}
