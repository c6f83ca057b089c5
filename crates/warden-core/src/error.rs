//! Error taxonomy for the registry authentication core.
//!
//! Component crates carry their own error enums; the facade converts them
//! into [`AuthError`] so callers see one type with a stable status class.

use std::fmt;

use thiserror::Error;

use crate::types::ProviderKind;

/// HTTP-style status class a caller should map an [`AuthError`] onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusClass {
    /// 400: the request itself was malformed.
    BadRequest,
    /// 401: authentication failed.
    Unauthorized,
    /// 403: authenticated but not permitted.
    Forbidden,
    /// 500: the service is misconfigured or broken.
    Internal,
}

impl StatusClass {
    /// Numeric HTTP status code.
    #[must_use]
    pub const fn code(&self) -> u16 {
        match self {
            Self::BadRequest => 400,
            Self::Unauthorized => 401,
            Self::Forbidden => 403,
            Self::Internal => 500,
        }
    }
}

impl fmt::Display for StatusClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Errors surfaced by the authentication core.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    // Request errors
    /// Caller supplied a syntactically invalid argument (namespace, capability).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The identity assertion could not be interpreted at all.
    #[error("malformed assertion: {0}")]
    MalformedAssertion(String),

    // Authentication errors
    /// The identity provider rejected the assertion, or could not be reached.
    ///
    /// `reason` is sanitized and never contains provider response bodies.
    #[error("identity verification failed ({provider}): {reason}")]
    IdentityVerificationFailed {
        /// Provider that was consulted.
        provider: ProviderKind,
        /// Whether retrying the same assertion later might succeed.
        retryable: bool,
        /// Sanitized failure reason.
        reason: String,
    },

    /// Credential string has the wrong shape or an unparseable payload.
    #[error("malformed credential: {0}")]
    MalformedCredential(String),

    /// Credential signature did not verify against any trusted key.
    #[error("credential signature invalid")]
    SignatureInvalid,

    /// Credential is past its expiry.
    #[error("credential expired at {expired_at}")]
    CredentialExpired {
        /// Expiry instant, formatted.
        expired_at: String,
    },

    // Authorization errors
    /// No grant covers the requested capability and namespace.
    #[error("not authorized to {capability} in {namespace}")]
    AuthorizationDenied {
        /// Requested capability.
        capability: String,
        /// Requested namespace.
        namespace: String,
    },

    /// The requested provider is not enabled in this deployment.
    #[error("provider disabled: {0}")]
    ProviderDisabled(ProviderKind),

    // Service errors
    /// No usable signing key is configured.
    #[error("signing key unavailable: {0}")]
    SigningKeyUnavailable(String),

    /// Configuration failed to load or validate.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Internal error (programming error or broken invariant).
    #[error("internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// Status class for this error.
    #[must_use]
    pub const fn status_class(&self) -> StatusClass {
        match self {
            Self::InvalidInput(_) | Self::MalformedAssertion(_) => StatusClass::BadRequest,
            Self::IdentityVerificationFailed { .. }
            | Self::MalformedCredential(_)
            | Self::SignatureInvalid
            | Self::CredentialExpired { .. } => StatusClass::Unauthorized,
            Self::AuthorizationDenied { .. } | Self::ProviderDisabled(_) => StatusClass::Forbidden,
            Self::SigningKeyUnavailable(_) | Self::InvalidConfiguration(_) | Self::Internal(_) => {
                StatusClass::Internal
            },
        }
    }

    /// Whether the caller may retry the same request later.
    ///
    /// Only provider transport failures are retryable.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::IdentityVerificationFailed {
                retryable: true,
                ..
            }
        )
    }
}

/// Result type for authentication operations.
pub type AuthResult<T> = Result<T, AuthError>;
