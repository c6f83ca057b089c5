//! CI workflow identity tokens issued by the repository host.

use warden_core::{ClaimSet, ProviderKind};

use crate::error::{IdentityError, IdentityResult};
use crate::http::HttpSettings;
use crate::oidc::{OidcSettings, OidcVerifier};

/// Issuer of workflow identity tokens.
pub const GITHUB_ACTIONS_ISSUER: &str = "https://token.actions.githubusercontent.com";

/// Claim every accepted workflow token must carry.
pub const REPOSITORY_OWNER: &str = "repository_owner";

/// Verifier for the `github-oidc` provider.
#[derive(Debug)]
pub struct GithubOidcVerifier {
    inner: OidcVerifier,
}

impl GithubOidcVerifier {
    /// Create a verifier. `settings.extra_claims` and `required_claims`
    /// are honoured as for generic OIDC.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::InvalidConfiguration`] for unusable settings.
    pub fn new(settings: OidcSettings, transport: &HttpSettings) -> IdentityResult<Self> {
        Ok(Self {
            inner: OidcVerifier::for_provider(ProviderKind::GithubOidc, settings, transport)?,
        })
    }

    /// Verify a workflow token.
    ///
    /// # Errors
    ///
    /// As [`OidcVerifier::verify`], plus [`IdentityError::Rejected`] when
    /// the token lacks a `repository_owner`.
    pub async fn verify(&self, token: &str) -> IdentityResult<ClaimSet> {
        let claims = self.inner.verify(token).await?;
        match claims.get_str(REPOSITORY_OWNER) {
            Some(owner) if !owner.is_empty() => Ok(claims),
            _ => Err(IdentityError::rejected(
                ProviderKind::GithubOidc,
                "token has no repository_owner claim",
            )),
        }
    }
}
