//! Trusted key ring for credential verification.
//!
//! Holds the issuer's current public key plus any previous keys still
//! accepted during a rotation window.

use crate::error::{CryptoError, CryptoResult};
use crate::keypair::PublicKey;
use crate::signature::Signature;

/// Key identifier (first 8 bytes of the public key).
pub type KeyId = [u8; 8];

/// An ordered set of trusted public keys.
///
/// Keys are tried in insertion order, so the current key should be added
/// first.
///
/// # Example
///
/// ```
/// use warden_crypto::{KeyPair, SignatureVerifier};
///
/// let current = KeyPair::generate();
/// let previous = KeyPair::generate();
/// let verifier = SignatureVerifier::with_keys([
///     current.export_public_key(),
///     previous.export_public_key(),
/// ]);
///
/// let old_signature = previous.sign(b"issued before rotation");
/// assert_eq!(
///     verifier.verify_any(b"issued before rotation", &old_signature).unwrap(),
///     previous.key_id()
/// );
/// ```
#[derive(Debug, Clone, Default)]
pub struct SignatureVerifier {
    trusted_keys: Vec<PublicKey>,
}

impl SignatureVerifier {
    /// Create an empty verifier.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a verifier trusting the given keys, in order.
    #[must_use]
    pub fn with_keys(keys: impl IntoIterator<Item = PublicKey>) -> Self {
        let mut verifier = Self::new();
        for key in keys {
            verifier.add_trusted_key(key);
        }
        verifier
    }

    /// Trust a key. Adding a key twice is a no-op.
    ///
    /// Returns the key ID.
    pub fn add_trusted_key(&mut self, key: PublicKey) -> KeyId {
        if !self.trusted_keys.contains(&key) {
            self.trusted_keys.push(key);
        }
        key.key_id()
    }

    /// Whether a key with this ID is trusted.
    #[must_use]
    pub fn is_trusted(&self, key_id: &KeyId) -> bool {
        self.trusted_keys.iter().any(|k| &k.key_id() == key_id)
    }

    /// Number of trusted keys.
    #[must_use]
    pub fn trusted_key_count(&self) -> usize {
        self.trusted_keys.len()
    }

    /// Trusted keys, in order.
    #[must_use]
    pub fn trusted_keys(&self) -> &[PublicKey] {
        &self.trusted_keys
    }

    /// Verify a signature against every trusted key.
    ///
    /// Returns the ID of the key that verified it.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::SignatureVerificationFailed`] if no trusted key
    /// verifies the signature (including when no keys are trusted).
    pub fn verify_any(&self, message: &[u8], signature: &Signature) -> CryptoResult<KeyId> {
        self.trusted_keys
            .iter()
            .find(|key| key.verify(message, signature).is_ok())
            .map(PublicKey::key_id)
            .ok_or(CryptoError::SignatureVerificationFailed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::KeyPair;

    #[test]
    fn test_verify_any_finds_signing_key() {
        let current = KeyPair::generate();
        let previous = KeyPair::generate();
        let verifier =
            SignatureVerifier::with_keys([current.export_public_key(), previous.export_public_key()]);

        let sig = current.sign(b"msg");
        assert_eq!(verifier.verify_any(b"msg", &sig).unwrap(), current.key_id());

        let sig = previous.sign(b"msg");
        assert_eq!(verifier.verify_any(b"msg", &sig).unwrap(), previous.key_id());
    }

    #[test]
    fn test_verify_any_untrusted() {
        let trusted = KeyPair::generate();
        let stranger = KeyPair::generate();
        let verifier = SignatureVerifier::with_keys([trusted.export_public_key()]);

        let sig = stranger.sign(b"msg");
        assert!(matches!(
            verifier.verify_any(b"msg", &sig),
            Err(CryptoError::SignatureVerificationFailed)
        ));
    }

    #[test]
    fn test_empty_verifier_rejects() {
        let keypair = KeyPair::generate();
        let sig = keypair.sign(b"msg");
        assert!(SignatureVerifier::new().verify_any(b"msg", &sig).is_err());
    }

    #[test]
    fn test_duplicate_keys_collapse() {
        let keypair = KeyPair::generate();
        let mut verifier = SignatureVerifier::new();
        let id1 = verifier.add_trusted_key(keypair.export_public_key());
        let id2 = verifier.add_trusted_key(keypair.export_public_key());

        assert_eq!(id1, id2);
        assert_eq!(verifier.trusted_key_count(), 1);
        assert!(verifier.is_trusted(&id1));
    }
}
