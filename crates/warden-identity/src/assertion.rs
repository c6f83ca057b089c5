//! Raw identity assertions presented by callers.

use std::fmt;

use warden_core::ProviderKind;

use crate::error::{IdentityError, IdentityResult};

/// Largest assertion accepted before any provider is contacted.
pub const MAX_ASSERTION_LEN: usize = 16 * 1024;

/// What a caller presents to obtain a credential.
///
/// `Debug` never prints the secret material.
#[derive(Clone, PartialEq, Eq)]
pub enum IdentityAssertion {
    /// OAuth authorization code for the repository-hosting provider.
    GithubCode {
        /// The authorization code.
        code: String,
    },
    /// User access token for the repository-hosting provider.
    GithubAccessToken {
        /// The access token.
        token: String,
    },
    /// CI identity token issued to a workflow run.
    GithubActionsToken {
        /// The signed JWT.
        token: String,
    },
    /// Identity token from the configured OIDC issuer.
    OidcToken {
        /// The signed JWT.
        token: String,
    },
    /// No identity presented.
    Anonymous,
}

impl IdentityAssertion {
    /// Provider that verifies this assertion.
    #[must_use]
    pub fn provider(&self) -> ProviderKind {
        match self {
            Self::GithubCode { .. } | Self::GithubAccessToken { .. } => ProviderKind::Github,
            Self::GithubActionsToken { .. } => ProviderKind::GithubOidc,
            Self::OidcToken { .. } => ProviderKind::Oidc,
            Self::Anonymous => ProviderKind::Anonymous,
        }
    }

    fn secret(&self) -> Option<(&'static str, &str)> {
        match self {
            Self::GithubCode { code } => Some(("code", code)),
            Self::GithubAccessToken { token }
            | Self::GithubActionsToken { token }
            | Self::OidcToken { token } => Some(("token", token)),
            Self::Anonymous => None,
        }
    }

    /// Reject empty, oversized or non-printable assertions.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::MalformedAssertion`].
    pub fn check_shape(&self) -> IdentityResult<()> {
        let Some((field, value)) = self.secret() else {
            return Ok(());
        };
        if value.trim().is_empty() {
            return Err(IdentityError::MalformedAssertion(format!("empty {field}")));
        }
        if value.len() > MAX_ASSERTION_LEN {
            return Err(IdentityError::MalformedAssertion(format!(
                "{field} longer than {MAX_ASSERTION_LEN} bytes"
            )));
        }
        if value.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(IdentityError::MalformedAssertion(format!(
                "{field} contains whitespace or control characters"
            )));
        }
        Ok(())
    }
}

impl fmt::Debug for IdentityAssertion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::GithubCode { .. } => "GithubCode",
            Self::GithubAccessToken { .. } => "GithubAccessToken",
            Self::GithubActionsToken { .. } => "GithubActionsToken",
            Self::OidcToken { .. } => "OidcToken",
            Self::Anonymous => return f.write_str("Anonymous"),
        };
        let field = self.secret().map_or("value", |(field, _)| field);
        f.debug_struct(name).field(field, &"[REDACTED]").finish()
    }
}
