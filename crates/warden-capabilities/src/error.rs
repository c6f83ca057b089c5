//! Credential and namespace error types.

use thiserror::Error;
use warden_core::{AuthError, Timestamp};

/// Errors that can occur while building, encoding, validating or using
/// credentials.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CapabilityError {
    /// A namespace string is not valid.
    #[error("invalid namespace '{namespace}': {reason}")]
    InvalidNamespace {
        /// The rejected namespace.
        namespace: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// A namespace pattern string is not valid.
    #[error("invalid namespace pattern '{pattern}': {reason}")]
    InvalidPattern {
        /// The rejected pattern.
        pattern: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// Requested credential lifetime is out of bounds.
    #[error("credential ttl must be between 1 and {max_secs} seconds, got {actual_secs}")]
    InvalidTtl {
        /// Requested TTL in seconds.
        actual_secs: i64,
        /// Upper bound in seconds.
        max_secs: i64,
    },

    /// A credential field is too large to encode.
    #[error("credential field '{field}' is too long ({len} bytes, max {max})")]
    FieldTooLong {
        /// Offending field.
        field: &'static str,
        /// Actual length in bytes.
        len: usize,
        /// Limit in bytes.
        max: usize,
    },

    /// The credential string or payload could not be decoded.
    #[error("malformed credential: {0}")]
    Malformed(String),

    /// No trusted key verifies the credential signature.
    #[error("credential signature invalid")]
    SignatureInvalid,

    /// The credential is past its expiry.
    #[error("credential expired at {expires_at}")]
    Expired {
        /// Expiry instant.
        expires_at: Timestamp,
    },

    /// No grant covers the requested capability in the namespace.
    #[error("not authorized to {capability} in {namespace}")]
    Denied {
        /// Requested capability.
        capability: String,
        /// Requested namespace.
        namespace: String,
    },
}

impl CapabilityError {
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        Self::Malformed(reason.into())
    }
}

impl From<CapabilityError> for AuthError {
    fn from(err: CapabilityError) -> Self {
        match err {
            CapabilityError::InvalidNamespace { .. }
            | CapabilityError::InvalidPattern { .. }
            | CapabilityError::FieldTooLong { .. } => {
                Self::InvalidInput(err.to_string())
            },
            CapabilityError::InvalidTtl { .. } => Self::InvalidConfiguration(err.to_string()),
            CapabilityError::Malformed(reason) => Self::MalformedCredential(reason),
            CapabilityError::SignatureInvalid => Self::SignatureInvalid,
            CapabilityError::Expired { expires_at } => Self::CredentialExpired {
                expired_at: expires_at.to_string(),
            },
            CapabilityError::Denied {
                capability,
                namespace,
            } => Self::AuthorizationDenied {
                capability,
                namespace,
            },
        }
    }
}

/// Result type for capability operations.
pub type CapabilityResult<T> = Result<T, CapabilityError>;

#[cfg(test)]
mod tests {
    use super::*;
    use warden_core::StatusClass;

    #[test]
    fn test_conversion_keeps_status_classes() {
        let denied: AuthError = CapabilityError::Denied {
            capability: "edit".into(),
            namespace: "acme/tool".into(),
        }
        .into();
        assert_eq!(denied.status_class(), StatusClass::Forbidden);

        let bad_sig: AuthError = CapabilityError::SignatureInvalid.into();
        assert_eq!(bad_sig, AuthError::SignatureInvalid);

        let bad_ns: AuthError = CapabilityError::InvalidNamespace {
            namespace: String::new(),
            reason: "namespace is empty",
        }
        .into();
        assert_eq!(bad_ns.status_class(), StatusClass::BadRequest);
    }
}
