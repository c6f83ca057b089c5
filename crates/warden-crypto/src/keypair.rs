//! Ed25519 signing keys for the credential issuer.
//!
//! The issuer key is supplied either inline as a hex-encoded 32-byte seed or
//! through a key file holding the same hex text (raw 32-byte files are also
//! accepted). Secret material is zeroized on drop and never printed.

use std::io::Write;
use std::path::Path;

use ed25519_dalek::{Signer, SigningKey, VerifyingKey};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::error::{CryptoError, CryptoResult};
use crate::signature::Signature;
use crate::verifier::KeyId;

/// Largest key file we are willing to read.
const MAX_KEY_FILE_BYTES: u64 = 4096;

/// An Ed25519 key pair with secure memory handling.
#[derive(ZeroizeOnDrop)]
pub struct KeyPair {
    #[zeroize(skip)]
    verifying_key: VerifyingKey,
    signing_key: SigningKey,
}

impl KeyPair {
    /// Generate a new random key pair.
    #[must_use]
    pub fn generate() -> Self {
        let signing_key = SigningKey::generate(&mut OsRng);
        let verifying_key = signing_key.verifying_key();
        Self {
            verifying_key,
            signing_key,
        }
    }

    /// Create from a 32-byte secret seed.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::InvalidKeyLength`] if the slice is not exactly 32 bytes.
    pub fn from_secret_key(bytes: &[u8]) -> CryptoResult<Self> {
        let mut secret: [u8; 32] = bytes.try_into().map_err(|_| CryptoError::InvalidKeyLength {
            expected: 32,
            actual: bytes.len(),
        })?;

        let signing_key = SigningKey::from_bytes(&secret);
        let verifying_key = signing_key.verifying_key();
        secret.zeroize();

        Ok(Self {
            verifying_key,
            signing_key,
        })
    }

    /// Create from a hex-encoded 32-byte seed. Surrounding whitespace is ignored.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::InvalidHexEncoding`] for non-hex input and
    /// [`CryptoError::InvalidKeyLength`] when the decoded seed is not 32 bytes.
    pub fn from_hex_seed(seed_hex: &str) -> CryptoResult<Self> {
        let bytes = Zeroizing::new(
            hex::decode(seed_hex.trim()).map_err(|_| CryptoError::InvalidHexEncoding)?,
        );
        Self::from_secret_key(&bytes)
    }

    /// Load a key from a file.
    ///
    /// The file may contain the hex seed (optionally followed by a newline)
    /// or exactly 32 raw bytes. Symlinks are refused.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::KeyFile`] when the file is missing, a symlink,
    /// or oversized, and the decoding errors of [`KeyPair::from_hex_seed`].
    pub fn load_from_file(path: impl AsRef<Path>) -> CryptoResult<Self> {
        let path = path.as_ref();

        let meta =
            std::fs::symlink_metadata(path).map_err(|e| CryptoError::key_file(path, e.to_string()))?;
        if meta.file_type().is_symlink() {
            return Err(CryptoError::key_file(path, "refusing to read key file: path is a symlink"));
        }
        if meta.len() > MAX_KEY_FILE_BYTES {
            return Err(CryptoError::key_file(path, "file too large to be a key"));
        }

        let bytes =
            Zeroizing::new(std::fs::read(path).map_err(|e| CryptoError::key_file(path, e.to_string()))?);
        if bytes.len() == 32 {
            return Self::from_secret_key(&bytes);
        }
        let text = std::str::from_utf8(&bytes).map_err(|_| CryptoError::InvalidHexEncoding)?;
        Self::from_hex_seed(text)
    }

    /// Write the hex seed to `path` with owner-only permissions.
    ///
    /// Refuses to replace an existing file unless `overwrite` is set. Parent
    /// directories are created as needed.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::KeyFile`] on any I/O failure or when the file
    /// already exists and `overwrite` is false.
    pub fn write_to_file(&self, path: impl AsRef<Path>, overwrite: bool) -> CryptoResult<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| CryptoError::key_file(path, e.to_string()))?;
        }

        let mut options = std::fs::OpenOptions::new();
        options.write(true);
        if overwrite {
            options.create(true).truncate(true);
        } else {
            options.create_new(true);
        }
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        let mut file = options.open(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::AlreadyExists {
                CryptoError::key_file(path, "already exists (use overwrite to replace it)")
            } else {
                CryptoError::key_file(path, e.to_string())
            }
        })?;

        let mut contents = self.secret_key_hex();
        contents.push('\n');
        file.write_all(contents.as_bytes())
            .map_err(|e| CryptoError::key_file(path, e.to_string()))?;
        Ok(())
    }

    /// Get the public key bytes (32 bytes).
    #[must_use]
    pub fn public_key_bytes(&self) -> &[u8; 32] {
        self.verifying_key.as_bytes()
    }

    /// Key ID: the first 8 bytes of the public key.
    #[must_use]
    pub fn key_id(&self) -> KeyId {
        self.export_public_key().key_id()
    }

    /// Key ID as hex.
    #[must_use]
    pub fn key_id_hex(&self) -> String {
        hex::encode(self.key_id())
    }

    /// Sign a message.
    #[must_use]
    pub fn sign(&self, message: &[u8]) -> Signature {
        Signature::from(self.signing_key.sign(message))
    }

    /// Verify a signature made by this key.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::SignatureVerificationFailed`] if verification fails.
    pub fn verify(&self, message: &[u8], signature: &Signature) -> CryptoResult<()> {
        signature.verify(message, self.public_key_bytes())
    }

    /// Export the public half.
    #[must_use]
    pub fn export_public_key(&self) -> PublicKey {
        PublicKey::from_bytes(*self.public_key_bytes())
    }

    /// Secret seed bytes. Sensitive; only for persisting the key.
    #[must_use]
    pub fn secret_key_bytes(&self) -> Zeroizing<[u8; 32]> {
        Zeroizing::new(self.signing_key.to_bytes())
    }

    /// Secret seed as hex. Sensitive; only for persisting the key.
    #[must_use]
    pub fn secret_key_hex(&self) -> Zeroizing<String> {
        Zeroizing::new(hex::encode(*self.secret_key_bytes()))
    }
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPair")
            .field("key_id", &self.key_id_hex())
            .finish_non_exhaustive()
    }
}

/// An Ed25519 public key.
///
/// Serializes as lower-case hex, the form used in configuration files.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PublicKey([u8; 32]);

impl PublicKey {
    /// Create from raw bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Try to create from a slice.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::InvalidKeyLength`] if the slice is not exactly 32 bytes.
    pub fn try_from_slice(slice: &[u8]) -> CryptoResult<Self> {
        let bytes: [u8; 32] = slice.try_into().map_err(|_| CryptoError::InvalidKeyLength {
            expected: 32,
            actual: slice.len(),
        })?;
        Ok(Self(bytes))
    }

    /// Raw bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Key ID: the first 8 bytes.
    #[must_use]
    pub fn key_id(&self) -> KeyId {
        let mut id = [0u8; 8];
        id.copy_from_slice(&self.0[..8]);
        id
    }

    /// Key ID as hex.
    #[must_use]
    pub fn key_id_hex(&self) -> String {
        hex::encode(self.key_id())
    }

    /// Encode as hex.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Decode from hex, ignoring surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not valid hex or not 32 bytes.
    pub fn from_hex(s: &str) -> CryptoResult<Self> {
        let bytes = hex::decode(s.trim()).map_err(|_| CryptoError::InvalidHexEncoding)?;
        Self::try_from_slice(&bytes)
    }

    /// Encode as unpadded base64url (the JWK `x` form).
    #[must_use]
    pub fn to_base64url(&self) -> String {
        use base64::Engine;
        base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(self.0)
    }

    /// Verify a signature against this key.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::SignatureVerificationFailed`] if verification fails.
    pub fn verify(&self, message: &[u8], signature: &Signature) -> CryptoResult<()> {
        signature.verify(message, &self.0)
    }
}

impl std::fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PublicKey({})", self.key_id_hex())
    }
}

impl std::fmt::Display for PublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl std::str::FromStr for PublicKey {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl Serialize for PublicKey {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for PublicKey {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

impl From<[u8; 32]> for PublicKey {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for PublicKey {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}
