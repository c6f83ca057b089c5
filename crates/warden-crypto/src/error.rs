//! Cryptographic error types.

use thiserror::Error;

/// Errors that can occur during key handling and signature checks.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Key material had the wrong length.
    #[error("invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength {
        /// Expected length in bytes.
        expected: usize,
        /// Actual length in bytes.
        actual: usize,
    },

    /// Signature had the wrong length.
    #[error("invalid signature length: expected {expected}, got {actual}")]
    InvalidSignatureLength {
        /// Expected length in bytes.
        expected: usize,
        /// Actual length in bytes.
        actual: usize,
    },

    /// Public key bytes are not a valid curve point.
    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),

    /// Signature did not verify.
    #[error("signature verification failed")]
    SignatureVerificationFailed,

    /// Input was not hex.
    #[error("invalid hex encoding")]
    InvalidHexEncoding,

    /// Input was not base64.
    #[error("invalid base64 encoding")]
    InvalidBase64Encoding,

    /// A key file could not be used.
    #[error("key file {path}: {reason}")]
    KeyFile {
        /// Offending path.
        path: String,
        /// What went wrong.
        reason: String,
    },
}

impl CryptoError {
    pub(crate) fn key_file(path: &std::path::Path, reason: impl Into<String>) -> Self {
        Self::KeyFile {
            path: path.display().to_string(),
            reason: reason.into(),
        }
    }
}

/// Result type for cryptographic operations.
pub type CryptoResult<T> = Result<T, CryptoError>;
