//! The closed set of identity verifiers.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use warden_core::{ClaimSet, ProviderKind};

use crate::assertion::IdentityAssertion;
use crate::error::{IdentityError, IdentityResult};
use crate::github::GithubVerifier;
use crate::github_oidc::GithubOidcVerifier;
use crate::oidc::OidcVerifier;

/// Subject recorded for anonymous claim sets.
pub const ANONYMOUS_SUBJECT: &str = "anonymous";

/// One configured identity provider.
#[derive(Debug)]
pub enum IdentityVerifier {
    /// Repository-hosting OAuth.
    Github(GithubVerifier),
    /// Repository-hosting CI identity tokens.
    GithubOidc(GithubOidcVerifier),
    /// Generic OIDC issuer.
    Oidc(OidcVerifier),
    /// No identity; always succeeds with an empty claim set.
    Anonymous,
}

impl IdentityVerifier {
    /// Provider this verifier handles.
    #[must_use]
    pub fn kind(&self) -> ProviderKind {
        match self {
            Self::Github(_) => ProviderKind::Github,
            Self::GithubOidc(_) => ProviderKind::GithubOidc,
            Self::Oidc(_) => ProviderKind::Oidc,
            Self::Anonymous => ProviderKind::Anonymous,
        }
    }

    /// Verify an assertion under a deadline.
    ///
    /// The call is abandoned (and any outbound request dropped) when
    /// `timeout` elapses or `cancel` fires. It is never retried.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::MalformedAssertion`] for empty or oversized
    /// input, [`IdentityError::ProviderMismatch`] when the assertion belongs
    /// to another provider, [`IdentityError::Unavailable`] on timeout,
    /// [`IdentityError::Cancelled`] on cancellation, and whatever the
    /// provider-specific verification returns otherwise.
    pub async fn verify(
        &self,
        assertion: &IdentityAssertion,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> IdentityResult<ClaimSet> {
        let provider = self.kind();
        if assertion.provider() != provider {
            return Err(IdentityError::ProviderMismatch {
                assertion: assertion.provider(),
                verifier: provider,
            });
        }
        assertion.check_shape()?;

        let result = tokio::select! {
            biased;
            () = cancel.cancelled() => Err(IdentityError::Cancelled { provider }),
            outcome = tokio::time::timeout(timeout, self.dispatch(assertion)) => match outcome {
                Ok(result) => result,
                Err(_) => Err(IdentityError::unavailable(
                    provider,
                    format!("verification timed out after {}s", timeout.as_secs()),
                )),
            },
        };

        match &result {
            Ok(claims) => debug!(provider = %provider, subject = claims.subject(), "Identity verified"),
            Err(err) => warn!(provider = %provider, retryable = err.is_retryable(), error = %err, "Identity verification failed"),
        }
        result
    }

    async fn dispatch(&self, assertion: &IdentityAssertion) -> IdentityResult<ClaimSet> {
        match (self, assertion) {
            (Self::Github(github), IdentityAssertion::GithubCode { code }) => github.verify_code(code).await,
            (Self::Github(github), IdentityAssertion::GithubAccessToken { token }) => {
                github.verify_access_token(token).await
            },
            (Self::GithubOidc(actions), IdentityAssertion::GithubActionsToken { token }) => {
                actions.verify(token).await
            },
            (Self::Oidc(oidc), IdentityAssertion::OidcToken { token }) => oidc.verify(token).await,
            (Self::Anonymous, IdentityAssertion::Anonymous) => {
                Ok(ClaimSet::builder(ANONYMOUS_SUBJECT, ProviderKind::Anonymous).build())
            },
            _ => Err(IdentityError::ProviderMismatch {
                assertion: assertion.provider(),
                verifier: self.kind(),
            }),
        }
    }
}
