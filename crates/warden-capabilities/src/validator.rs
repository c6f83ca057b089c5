//! Credential validation and authorization checks.
//!
//! Validation is stateless: a credential is accepted iff a trusted key
//! signed it and it has not expired. Authorization then answers
//! namespace/capability queries against the embedded grants.

use tracing::{debug, warn};
use warden_core::{Capability, CredentialId, ProviderKind, Timestamp};
use warden_crypto::{KeyId, SignatureVerifier};

use crate::credential::Credential;
use crate::error::{CapabilityError, CapabilityResult};
use crate::grant::{GrantSet, PermissionGrant};
use crate::namespace::{Namespace, NamespacePattern};

/// Provenance recorded on grants produced by the anonymous-mutation policy.
pub const ANONYMOUS_MUTATION_PROVENANCE: &str = "anonymous-mutation";

/// A credential whose signature and expiry have been checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedCredential {
    credential: Credential,
    verified_by: KeyId,
}

impl VerifiedCredential {
    /// Credential identifier.
    #[must_use]
    pub fn id(&self) -> CredentialId {
        self.credential.id
    }

    /// Authenticated subject.
    #[must_use]
    pub fn subject(&self) -> &str {
        &self.credential.subject
    }

    /// Provider that vouched for the subject.
    #[must_use]
    pub fn provider(&self) -> ProviderKind {
        self.credential.provider
    }

    /// Embedded grants.
    #[must_use]
    pub fn grants(&self) -> &GrantSet {
        &self.credential.grants
    }

    /// Issuance instant.
    #[must_use]
    pub fn issued_at(&self) -> Timestamp {
        self.credential.issued_at
    }

    /// Expiry instant.
    #[must_use]
    pub fn expires_at(&self) -> Timestamp {
        self.credential.expires_at
    }

    /// ID of the trusted key that verified the signature.
    #[must_use]
    pub fn verified_by(&self) -> KeyId {
        self.verified_by
    }

    /// The underlying credential.
    #[must_use]
    pub fn credential(&self) -> &Credential {
        &self.credential
    }
}

/// Validates wire-form credentials against a trusted key ring.
#[derive(Debug, Clone)]
pub struct CredentialValidator {
    verifier: SignatureVerifier,
}

impl CredentialValidator {
    /// Create a validator trusting the keys in `verifier`.
    #[must_use]
    pub fn new(verifier: SignatureVerifier) -> Self {
        Self { verifier }
    }

    /// Trusted keys.
    #[must_use]
    pub fn verifier(&self) -> &SignatureVerifier {
        &self.verifier
    }

    /// Validate a credential against the current time.
    ///
    /// # Errors
    ///
    /// See [`CredentialValidator::validate_at`].
    pub fn validate(&self, token: &str) -> CapabilityResult<VerifiedCredential> {
        self.validate_at(token, Timestamp::now())
    }

    /// Validate a credential as of `now`.
    ///
    /// Checks, in order: shape, signature against every trusted key, payload
    /// structure, then expiry. There is no clock-skew allowance.
    ///
    /// # Errors
    ///
    /// - [`CapabilityError::Malformed`] for a wrong shape or unparseable payload
    /// - [`CapabilityError::SignatureInvalid`] if no trusted key verifies it
    /// - [`CapabilityError::Expired`] if `now` is after the expiry
    pub fn validate_at(&self, token: &str, now: Timestamp) -> CapabilityResult<VerifiedCredential> {
        let (credential, verified_by) = Credential::decode(token, &self.verifier)?;

        if credential.is_expired_at(now) {
            debug!(credential_id = %credential.id, expires_at = %credential.expires_at, "Credential expired");
            return Err(CapabilityError::Expired {
                expires_at: credential.expires_at,
            });
        }

        Ok(VerifiedCredential {
            credential,
            verified_by,
        })
    }
}

/// Policy knobs applied on top of the embedded grants.
#[derive(Debug, Clone, Default)]
pub struct AuthorizationPolicy {
    /// Namespace reserved for anonymous publishing.
    pub anonymous_namespace: Option<Namespace>,
    /// Let any authenticated credential publish within the anonymous namespace.
    pub allow_anonymous_mutation: bool,
}

/// Answers namespace/capability queries for verified credentials.
#[derive(Debug, Clone, Default)]
pub struct Authorizer {
    policy: AuthorizationPolicy,
}

impl Authorizer {
    /// Create an authorizer with a policy.
    #[must_use]
    pub fn new(policy: AuthorizationPolicy) -> Self {
        Self { policy }
    }

    /// The policy in effect.
    #[must_use]
    pub fn policy(&self) -> &AuthorizationPolicy {
        &self.policy
    }

    /// Check that `credential` may exercise `capability` on `namespace`.
    ///
    /// Returns the grant that allowed the request.
    ///
    /// # Errors
    ///
    /// - [`CapabilityError::InvalidNamespace`] if `namespace` is not valid
    /// - [`CapabilityError::Denied`] if nothing authorizes the request
    pub fn authorize(
        &self,
        credential: &VerifiedCredential,
        namespace: &str,
        capability: Capability,
    ) -> CapabilityResult<PermissionGrant> {
        let namespace = Namespace::new(namespace)?;

        if let Some(grant) = credential.grants().find(&namespace, capability) {
            debug!(
                credential_id = %credential.id(),
                namespace = %namespace,
                capability = %capability,
                provenance = %grant.provenance,
                "Authorized"
            );
            return Ok(grant.clone());
        }

        if let Some(grant) = self.anonymous_mutation_grant(&namespace, capability) {
            debug!(
                credential_id = %credential.id(),
                namespace = %namespace,
                "Authorized by anonymous mutation policy"
            );
            return Ok(grant);
        }

        warn!(
            credential_id = %credential.id(),
            subject = %credential.subject(),
            namespace = %namespace,
            capability = %capability,
            "Authorization denied"
        );
        Err(CapabilityError::Denied {
            capability: capability.to_string(),
            namespace: namespace.to_string(),
        })
    }

    fn anonymous_mutation_grant(
        &self,
        namespace: &Namespace,
        capability: Capability,
    ) -> Option<PermissionGrant> {
        if !self.policy.allow_anonymous_mutation || capability != Capability::Publish {
            return None;
        }
        let prefix = self.policy.anonymous_namespace.as_ref()?;
        let grant = PermissionGrant::new(
            Capability::Publish,
            NamespacePattern::prefix(prefix.clone()),
            ANONYMOUS_MUTATION_PROVENANCE,
        );
        grant.authorizes(namespace, capability).then_some(grant)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Duration;
    use warden_crypto::KeyPair;

    use super::*;
    use crate::credential::MAX_TTL_SECS;
    use crate::issuer::CredentialIssuer;

    struct Fixture {
        key: Arc<KeyPair>,
        issuer: CredentialIssuer,
        validator: CredentialValidator,
    }

    fn fixture() -> Fixture {
        let key = Arc::new(KeyPair::generate());
        let issuer = CredentialIssuer::new(Arc::clone(&key), 300).unwrap();
        let validator =
            CredentialValidator::new(SignatureVerifier::with_keys([key.export_public_key()]));
        Fixture {
            key,
            issuer,
            validator,
        }
    }

    fn alice_grants() -> GrantSet {
        let pattern = NamespacePattern::parse("github/alice/*").unwrap();
        [
            PermissionGrant::new(Capability::Edit, pattern.clone(), "github:user:alice"),
            PermissionGrant::new(Capability::Publish, pattern, "github:user:alice"),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_round_trip() {
        let f = fixture();
        let grants = alice_grants();
        let token = f
            .issuer
            .issue("alice", ProviderKind::Github, grants.clone())
            .unwrap()
            .encode();

        let verified = f.validator.validate(&token).unwrap();
        assert_eq!(verified.subject(), "alice");
        assert_eq!(verified.provider(), ProviderKind::Github);
        assert_eq!(verified.grants(), &grants);
        assert_eq!(verified.verified_by(), f.key.key_id());
    }

    #[test]
    fn test_expiry_boundary() {
        let f = fixture();
        let issued_at = Timestamp::now_millis();
        let token = f
            .issuer
            .issue_at(issued_at, "alice", ProviderKind::Github, alice_grants())
            .unwrap()
            .encode();
        let expiry = issued_at.checked_add(Duration::seconds(300)).unwrap();

        let just_before = expiry.checked_sub(Duration::milliseconds(1)).unwrap();
        assert!(f.validator.validate_at(&token, just_before).is_ok());
        assert!(f.validator.validate_at(&token, expiry).is_ok());

        let just_after = expiry.checked_add(Duration::milliseconds(1)).unwrap();
        assert!(matches!(
            f.validator.validate_at(&token, just_after),
            Err(CapabilityError::Expired { expires_at }) if expires_at == expiry
        ));
    }

    #[test]
    fn test_every_payload_bit_flip_is_signature_invalid() {
        use base64::Engine;
        use base64::engine::general_purpose::URL_SAFE_NO_PAD;

        let f = fixture();
        let token = f
            .issuer
            .issue("alice", ProviderKind::Github, alice_grants())
            .unwrap()
            .encode();
        let (payload_b64, sig_b64) = token.split_once('.').unwrap();
        let payload = URL_SAFE_NO_PAD.decode(payload_b64).unwrap();
        let signature = URL_SAFE_NO_PAD.decode(sig_b64).unwrap();

        for byte in 0..payload.len() {
            for bit in 0..8 {
                let mut tampered = payload.clone();
                tampered[byte] ^= 1 << bit;
                let token = format!("{}.{}", URL_SAFE_NO_PAD.encode(&tampered), sig_b64);
                assert_eq!(
                    f.validator.validate(&token).unwrap_err(),
                    CapabilityError::SignatureInvalid,
                    "payload byte {byte} bit {bit}"
                );
            }
        }

        for byte in 0..signature.len() {
            let mut tampered = signature.clone();
            tampered[byte] ^= 0x80;
            let token = format!("{}.{}", payload_b64, URL_SAFE_NO_PAD.encode(&tampered));
            assert_eq!(
                f.validator.validate(&token).unwrap_err(),
                CapabilityError::SignatureInvalid,
                "signature byte {byte}"
            );
        }
    }

    #[test]
    fn test_rotated_key_still_validates() {
        let old_key = Arc::new(KeyPair::generate());
        let new_key = Arc::new(KeyPair::generate());
        let old_issuer = CredentialIssuer::new(Arc::clone(&old_key), MAX_TTL_SECS).unwrap();
        let token = old_issuer
            .issue("alice", ProviderKind::Github, GrantSet::new())
            .unwrap()
            .encode();

        let validator = CredentialValidator::new(SignatureVerifier::with_keys([
            new_key.export_public_key(),
            old_key.export_public_key(),
        ]));
        let verified = validator.validate(&token).unwrap();
        assert_eq!(verified.verified_by(), old_key.key_id());

        let strict = CredentialValidator::new(SignatureVerifier::with_keys([
            new_key.export_public_key(),
        ]));
        assert_eq!(
            strict.validate(&token).unwrap_err(),
            CapabilityError::SignatureInvalid
        );
    }

    #[test]
    fn test_authorize_github_scenario() {
        let f = fixture();
        let token = f
            .issuer
            .issue("alice", ProviderKind::Github, alice_grants())
            .unwrap()
            .encode();
        let verified = f.validator.validate(&token).unwrap();
        let authorizer = Authorizer::default();

        let grant = authorizer
            .authorize(&verified, "github/alice/cool-tool", Capability::Publish)
            .unwrap();
        assert_eq!(grant.provenance, "github:user:alice");

        assert!(matches!(
            authorizer.authorize(&verified, "github/bob/other-tool", Capability::Publish),
            Err(CapabilityError::Denied { .. })
        ));
        assert!(matches!(
            authorizer.authorize(&verified, "github/alice", Capability::Publish),
            Err(CapabilityError::Denied { .. })
        ));
    }

    #[test]
    fn test_authorize_rejects_invalid_namespace() {
        let f = fixture();
        let token = f
            .issuer
            .issue("alice", ProviderKind::Github, alice_grants())
            .unwrap()
            .encode();
        let verified = f.validator.validate(&token).unwrap();

        assert!(matches!(
            Authorizer::default().authorize(&verified, "github//alice", Capability::Edit),
            Err(CapabilityError::InvalidNamespace { .. })
        ));
    }

    #[test]
    fn test_anonymous_mutation_policy() {
        let f = fixture();
        let token = f
            .issuer
            .issue("bob", ProviderKind::Oidc, GrantSet::new())
            .unwrap()
            .encode();
        let verified = f.validator.validate(&token).unwrap();
        let anon_ns = Namespace::new("io.example.anonymous").unwrap();

        let closed = Authorizer::new(AuthorizationPolicy {
            anonymous_namespace: Some(anon_ns.clone()),
            allow_anonymous_mutation: false,
        });
        assert!(
            closed
                .authorize(&verified, "io.example.anonymous/tool", Capability::Publish)
                .is_err()
        );

        let open = Authorizer::new(AuthorizationPolicy {
            anonymous_namespace: Some(anon_ns),
            allow_anonymous_mutation: true,
        });
        let grant = open
            .authorize(&verified, "io.example.anonymous/tool", Capability::Publish)
            .unwrap();
        assert_eq!(grant.provenance, ANONYMOUS_MUTATION_PROVENANCE);

        // Only publish, and only inside the anonymous namespace.
        assert!(
            open.authorize(&verified, "io.example.anonymous/tool", Capability::Edit)
                .is_err()
        );
        assert!(
            open.authorize(&verified, "acme/tool", Capability::Publish)
                .is_err()
        );
    }

    /// Flip the unused low bits of the final base64url character so the
    /// text still decodes under a lenient decoder but is not canonical.
    fn non_canonical_tail(part: &str) -> String {
        const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-_";
        let (head, last) = part.split_at(part.len().saturating_sub(1));
        let index = ALPHABET.iter().position(|&c| c == last.as_bytes()[0]).unwrap();
        format!("{head}{}", char::from(ALPHABET[index | 1]))
    }

    #[test]
    fn test_damaged_wire_form_is_rejected() {
        let f = fixture();
        let token = f
            .issuer
            .issue("alice", ProviderKind::Github, alice_grants())
            .unwrap()
            .encode();
        let (payload, signature) = token.split_once('.').unwrap();

        let cases = [
            ("separator removed", format!("{payload}{signature}")),
            ("separator doubled", format!("{payload}..{signature}")),
            ("extra segment", format!("{token}.{signature}")),
            ("trailing garbage", format!("{token}!!")),
            ("one trailing character", format!("{token}A")),
            ("padded signature", format!("{token}==")),
            ("padded payload", format!("{payload}=.{signature}")),
            ("non-canonical signature", format!("{payload}.{}", non_canonical_tail(signature))),
            ("swapped parts", format!("{signature}.{payload}")),
            ("empty payload", format!(".{signature}")),
            ("empty signature", format!("{payload}.")),
            ("inner whitespace", format!("{payload} .{signature}")),
        ];

        for (name, damaged) in cases {
            let err = f.validator.validate(&damaged).unwrap_err();
            assert!(
                matches!(err, CapabilityError::Malformed(_) | CapabilityError::SignatureInvalid),
                "{name}: {err:?}"
            );
            assert!(
                matches!(
                    warden_core::AuthError::from(err),
                    warden_core::AuthError::MalformedCredential(_) | warden_core::AuthError::SignatureInvalid
                ),
                "{name}"
            );
        }
        assert!(f.validator.validate(&token).is_ok());
    }
}
