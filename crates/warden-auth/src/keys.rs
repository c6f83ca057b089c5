//! Signing key loading and the trusted key ring.

use warden_config::SigningSection;
use warden_core::{AuthError, AuthResult};
use warden_crypto::{KeyPair, PublicKey, SignatureVerifier};

/// Load the issuer key from an inline hex seed or a key file.
///
/// # Errors
///
/// Returns [`AuthError::SigningKeyUnavailable`] when no key is configured
/// or the configured key cannot be used. The error never contains key
/// material.
pub fn load_signing_key(signing: &SigningSection) -> AuthResult<KeyPair> {
    let inline = signing.private_key.trim();
    let file = signing.private_key_file.trim();

    let loaded = if !inline.is_empty() {
        KeyPair::from_hex_seed(inline)
    } else if !file.is_empty() {
        KeyPair::load_from_file(file)
    } else {
        return Err(AuthError::SigningKeyUnavailable(
            "no signing key configured; set signing.private_key_file or signing.private_key"
                .to_string(),
        ));
    };
    loaded.map_err(|e| AuthError::SigningKeyUnavailable(e.to_string()))
}

/// Build the ring of keys accepted for validation: the current key first,
/// then every retired key still configured.
///
/// # Errors
///
/// Returns [`AuthError::InvalidConfiguration`] if a previous key is not a
/// hex Ed25519 public key.
pub fn trusted_keys(current: &KeyPair, signing: &SigningSection) -> AuthResult<SignatureVerifier> {
    let mut verifier = SignatureVerifier::with_keys([current.export_public_key()]);
    for (index, hex) in signing.previous_public_keys.iter().enumerate() {
        let key = PublicKey::from_hex(hex.trim()).map_err(|e| {
            AuthError::InvalidConfiguration(format!("signing.previous_public_keys[{index}]: {e}"))
        })?;
        verifier.add_trusted_key(key);
    }
    Ok(verifier)
}
