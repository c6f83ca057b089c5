//! Identity verification errors.
//!
//! Reasons carried here are short, fixed phrases chosen by this crate.
//! Provider response bodies are never copied into them.

use thiserror::Error;
use warden_core::{AuthError, ProviderKind};

/// Errors raised while verifying an identity assertion.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentityError {
    /// The assertion is empty or oversized and was never sent anywhere.
    #[error("malformed assertion: {0}")]
    MalformedAssertion(String),

    /// The provider (or local token validation) rejected the assertion.
    #[error("{provider} rejected the assertion: {reason}")]
    Rejected {
        /// Provider that rejected it.
        provider: ProviderKind,
        /// Sanitized reason.
        reason: String,
    },

    /// The provider could not be reached, timed out or failed internally.
    #[error("{provider} unavailable: {reason}")]
    Unavailable {
        /// Provider that failed.
        provider: ProviderKind,
        /// Sanitized reason.
        reason: String,
    },

    /// Verification was cancelled by the caller.
    #[error("{provider} verification cancelled")]
    Cancelled {
        /// Provider being contacted.
        provider: ProviderKind,
    },

    /// The verifier settings are unusable.
    #[error("invalid identity provider configuration: {0}")]
    InvalidConfiguration(String),

    /// An assertion was routed to a verifier for another provider.
    #[error("{assertion} assertion routed to the {verifier} verifier")]
    ProviderMismatch {
        /// Provider the assertion belongs to.
        assertion: ProviderKind,
        /// Provider of the verifier that received it.
        verifier: ProviderKind,
    },
}

impl IdentityError {
    pub(crate) fn rejected(provider: ProviderKind, reason: impl Into<String>) -> Self {
        Self::Rejected {
            provider,
            reason: reason.into(),
        }
    }

    pub(crate) fn unavailable(provider: ProviderKind, reason: impl Into<String>) -> Self {
        Self::Unavailable {
            provider,
            reason: reason.into(),
        }
    }

    /// Whether retrying the same assertion later may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable { .. } | Self::Cancelled { .. })
    }

    /// Provider involved, when known.
    #[must_use]
    pub fn provider(&self) -> Option<ProviderKind> {
        match self {
            Self::Rejected { provider, .. }
            | Self::Unavailable { provider, .. }
            | Self::Cancelled { provider } => Some(*provider),
            Self::ProviderMismatch { verifier, .. } => Some(*verifier),
            Self::MalformedAssertion(_) | Self::InvalidConfiguration(_) => None,
        }
    }
}

impl From<IdentityError> for AuthError {
    fn from(err: IdentityError) -> Self {
        let retryable = err.is_retryable();
        match err {
            IdentityError::MalformedAssertion(reason) => Self::MalformedAssertion(reason),
            IdentityError::Rejected { provider, reason }
            | IdentityError::Unavailable { provider, reason } => {
                Self::IdentityVerificationFailed {
                    provider,
                    retryable,
                    reason,
                }
            },
            IdentityError::Cancelled { provider } => Self::IdentityVerificationFailed {
                provider,
                retryable,
                reason: "cancelled".to_string(),
            },
            IdentityError::InvalidConfiguration(reason) => Self::InvalidConfiguration(reason),
            err @ IdentityError::ProviderMismatch { .. } => Self::Internal(err.to_string()),
        }
    }
}

/// Result type for identity operations.
pub type IdentityResult<T> = Result<T, IdentityError>;
