//! Signed, time-boxed registry credentials.
//!
//! A credential embeds the subject, the provider that vouched for it and
//! the grants computed at issuance. The wire form is
//! `base64url(payload) "." base64url(signature)` without padding, where
//! `payload` is exactly the signed bytes. Validation verifies the signature
//! over the raw payload before parsing a single field of it.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::Duration;
use uuid::Uuid;
use warden_core::{Capability, CredentialId, ProviderKind, Timestamp};
use warden_crypto::{KeyId, KeyPair, Signature, SignatureVerifier};

use crate::error::{CapabilityError, CapabilityResult};
use crate::grant::{GrantSet, PermissionGrant};
use crate::namespace::NamespacePattern;

/// Version of the signed payload format.
/// Increment this when the payload layout changes.
pub const CREDENTIAL_FORMAT_VERSION: u8 = 0x01;

/// Default credential lifetime in seconds.
pub const DEFAULT_TTL_SECS: i64 = 300;

/// Longest lifetime any credential may have, in seconds.
pub const MAX_TTL_SECS: i64 = 3600;

/// Largest variable-length field (subject, pattern, provenance).
pub const MAX_FIELD_LEN: usize = 4096;

/// Largest number of grants in one credential.
pub const MAX_GRANTS: usize = 1024;

const SEPARATOR: char = '.';

/// Write a length-prefixed byte slice.
///
/// Format: 4-byte little-endian length followed by the data. Callers bound
/// lengths by [`MAX_FIELD_LEN`] before encoding.
#[allow(clippy::cast_possible_truncation)]
fn write_length_prefixed(data: &mut Vec<u8>, bytes: &[u8]) {
    data.extend_from_slice(&(bytes.len() as u32).to_le_bytes());
    data.extend_from_slice(bytes);
}

fn check_field(field: &'static str, value: &str) -> CapabilityResult<()> {
    if value.len() > MAX_FIELD_LEN {
        return Err(CapabilityError::FieldTooLong {
            field,
            len: value.len(),
            max: MAX_FIELD_LEN,
        });
    }
    Ok(())
}

/// A signed registry credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    /// Credential identifier, for audit correlation only.
    pub id: CredentialId,
    /// ID of the key that signed the credential.
    pub key_id: KeyId,
    /// Authenticated subject.
    pub subject: String,
    /// Provider that vouched for the subject.
    pub provider: ProviderKind,
    /// Grants computed at issuance.
    pub grants: GrantSet,
    /// Issuance instant (millisecond precision).
    pub issued_at: Timestamp,
    /// Expiry instant (millisecond precision).
    pub expires_at: Timestamp,
    signature: Signature,
}

impl Credential {
    /// Build and sign a credential.
    pub(crate) fn create(
        subject: String,
        provider: ProviderKind,
        grants: GrantSet,
        issued_at: Timestamp,
        expires_at: Timestamp,
        key: &KeyPair,
    ) -> CapabilityResult<Self> {
        check_field("subject", &subject)?;
        if grants.len() > MAX_GRANTS {
            return Err(CapabilityError::FieldTooLong {
                field: "grants",
                len: grants.len(),
                max: MAX_GRANTS,
            });
        }
        for grant in &grants {
            check_field("pattern", &grant.pattern.to_string())?;
            check_field("provenance", &grant.provenance)?;
        }

        let mut credential = Self {
            id: CredentialId::new(),
            key_id: key.key_id(),
            subject,
            provider,
            grants,
            issued_at: issued_at.truncate_to_millis(),
            expires_at: expires_at.truncate_to_millis(),
            signature: Signature::from_bytes([0u8; 64]),
        };
        credential.signature = key.sign(&credential.signing_data());
        Ok(credential)
    }

    /// The bytes covered by the signature.
    ///
    /// Format (v1):
    /// - 1 byte: version (0x01)
    /// - 16 bytes: credential ID (UUID)
    /// - 8 bytes: signing key ID
    /// - Length-prefixed subject
    /// - Length-prefixed provider tag
    /// - 4 bytes: number of grants (u32 LE)
    /// - For each grant: length-prefixed capability, pattern and provenance
    /// - 8 bytes: `issued_at` (i64 LE Unix milliseconds)
    /// - 8 bytes: `expires_at` (i64 LE Unix milliseconds)
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn signing_data(&self) -> Vec<u8> {
        let mut data = Vec::with_capacity(256);

        data.push(CREDENTIAL_FORMAT_VERSION);
        data.extend_from_slice(self.id.0.as_bytes());
        data.extend_from_slice(&self.key_id);
        write_length_prefixed(&mut data, self.subject.as_bytes());
        write_length_prefixed(&mut data, self.provider.as_str().as_bytes());

        data.extend_from_slice(&(self.grants.len() as u32).to_le_bytes());
        for grant in &self.grants {
            write_length_prefixed(&mut data, grant.capability.as_str().as_bytes());
            write_length_prefixed(&mut data, grant.pattern.to_string().as_bytes());
            write_length_prefixed(&mut data, grant.provenance.as_bytes());
        }

        data.extend_from_slice(&self.issued_at.as_millis().to_le_bytes());
        data.extend_from_slice(&self.expires_at.as_millis().to_le_bytes());

        data
    }

    /// The signature.
    #[must_use]
    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// Lifetime granted at issuance.
    #[must_use]
    pub fn lifetime(&self) -> Duration {
        self.expires_at.signed_duration_since(self.issued_at)
    }

    /// Whether the credential is expired at `now`. Expiry is strict: the
    /// credential is still valid at exactly `expires_at`.
    #[must_use]
    pub fn is_expired_at(&self, now: Timestamp) -> bool {
        now > self.expires_at
    }

    /// Encode to the compact wire form.
    #[must_use]
    pub fn encode(&self) -> String {
        let payload = URL_SAFE_NO_PAD.encode(self.signing_data());
        let signature = URL_SAFE_NO_PAD.encode(self.signature.as_bytes());
        format!("{payload}{SEPARATOR}{signature}")
    }

    /// Decode a wire-form credential, verifying its signature first.
    ///
    /// Does not check expiry. Returns the credential and the ID of the
    /// trusted key that verified it.
    ///
    /// # Errors
    ///
    /// - [`CapabilityError::Malformed`] if the token does not have the
    ///   `payload.signature` shape, either half is not unpadded base64url, or
    ///   the verified payload cannot be parsed
    /// - [`CapabilityError::SignatureInvalid`] if no trusted key verifies it
    pub fn decode(token: &str, verifier: &SignatureVerifier) -> CapabilityResult<(Self, KeyId)> {
        let (payload_b64, signature_b64) = token
            .trim()
            .split_once(SEPARATOR)
            .ok_or_else(|| CapabilityError::malformed("expected payload.signature"))?;

        let payload = URL_SAFE_NO_PAD
            .decode(payload_b64)
            .map_err(|_| CapabilityError::malformed("payload is not base64url"))?;
        let signature_bytes = URL_SAFE_NO_PAD
            .decode(signature_b64)
            .map_err(|_| CapabilityError::malformed("signature is not base64url"))?;
        let signature = Signature::try_from_slice(&signature_bytes)
            .map_err(|_| CapabilityError::malformed("signature has the wrong length"))?;

        let verified_by = verifier
            .verify_any(&payload, &signature)
            .map_err(|_| CapabilityError::SignatureInvalid)?;

        let credential = Self::parse_payload(&payload, signature)?;
        Ok((credential, verified_by))
    }

    fn parse_payload(payload: &[u8], signature: Signature) -> CapabilityResult<Self> {
        let mut reader = PayloadReader::new(payload);

        let version = reader.u8()?;
        if version != CREDENTIAL_FORMAT_VERSION {
            return Err(CapabilityError::malformed(format!(
                "unsupported format version {version}"
            )));
        }

        let id = CredentialId::from_uuid(Uuid::from_bytes(reader.array::<16>()?));
        let key_id: KeyId = reader.array::<8>()?;
        let subject = reader.string()?.to_string();
        let provider: ProviderKind = reader
            .string()?
            .parse()
            .map_err(|e| CapabilityError::malformed(format!("{e}")))?;

        let grant_count = usize::try_from(reader.u32()?)
            .map_err(|_| CapabilityError::malformed("grant count overflow"))?;
        if grant_count > MAX_GRANTS {
            return Err(CapabilityError::malformed("too many grants"));
        }
        let mut grants = GrantSet::new();
        for _ in 0..grant_count {
            let capability: Capability = reader
                .string()?
                .parse()
                .map_err(|e| CapabilityError::malformed(format!("{e}")))?;
            let pattern = NamespacePattern::parse(reader.string()?)
                .map_err(|e| CapabilityError::malformed(e.to_string()))?;
            let provenance = reader.string()?.to_string();
            grants.insert(PermissionGrant::new(capability, pattern, provenance));
        }

        let issued_at = reader.timestamp()?;
        let expires_at = reader.timestamp()?;
        reader.finish()?;

        let lifetime = expires_at.signed_duration_since(issued_at);
        if lifetime < Duration::zero() || lifetime > Duration::seconds(MAX_TTL_SECS) {
            return Err(CapabilityError::malformed("lifetime out of bounds"));
        }

        Ok(Self {
            id,
            key_id,
            subject,
            provider,
            grants,
            issued_at,
            expires_at,
            signature,
        })
    }
}

/// Cursor over a verified payload.
struct PayloadReader<'a> {
    buf: &'a [u8],
}

impl<'a> PayloadReader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    fn take(&mut self, n: usize) -> CapabilityResult<&'a [u8]> {
        if self.buf.len() < n {
            return Err(CapabilityError::malformed("payload truncated"));
        }
        let (head, tail) = self.buf.split_at(n);
        self.buf = tail;
        Ok(head)
    }

    fn array<const N: usize>(&mut self) -> CapabilityResult<[u8; N]> {
        let bytes = self.take(N)?;
        bytes
            .try_into()
            .map_err(|_| CapabilityError::malformed("payload truncated"))
    }

    fn u8(&mut self) -> CapabilityResult<u8> {
        Ok(self.array::<1>()?[0])
    }

    fn u32(&mut self) -> CapabilityResult<u32> {
        Ok(u32::from_le_bytes(self.array::<4>()?))
    }

    fn timestamp(&mut self) -> CapabilityResult<Timestamp> {
        let millis = i64::from_le_bytes(self.array::<8>()?);
        Timestamp::from_millis(millis).ok_or_else(|| CapabilityError::malformed("timestamp out of range"))
    }

    fn string(&mut self) -> CapabilityResult<&'a str> {
        let len = usize::try_from(self.u32()?)
            .map_err(|_| CapabilityError::malformed("field length overflow"))?;
        if len > MAX_FIELD_LEN {
            return Err(CapabilityError::malformed("field too long"));
        }
        let bytes = self.take(len)?;
        std::str::from_utf8(bytes).map_err(|_| CapabilityError::malformed("field is not UTF-8"))
    }

    fn finish(&self) -> CapabilityResult<()> {
        if self.buf.is_empty() {
            Ok(())
        } else {
            Err(CapabilityError::malformed("trailing bytes after payload"))
        }
    }
}
