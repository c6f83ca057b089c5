//! BLAKE3 fingerprints.
//!
//! Credentials are bearer secrets, so logs and CLI output refer to them by a
//! domain-separated hash instead of the token itself.

use std::fmt;

const CREDENTIAL_FINGERPRINT_DOMAIN: &str = "warden 2025 credential fingerprint";

/// A BLAKE3 content hash (32 bytes).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentHash([u8; 32]);

impl ContentHash {
    /// Fingerprint of an encoded credential, safe to log.
    #[must_use]
    pub fn credential_fingerprint(token: &str) -> Self {
        let mut hasher = blake3::Hasher::new_derive_key(CREDENTIAL_FINGERPRINT_DOMAIN);
        hasher.update(token.as_bytes());
        Self(*hasher.finalize().as_bytes())
    }

    /// First 8 bytes as hex, for log lines.
    #[must_use]
    pub fn short_hex(&self) -> String {
        hex::encode(&self.0[..8])
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash({})", self.short_hex())
    }
}
