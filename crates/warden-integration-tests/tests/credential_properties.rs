//! Credential properties across the capability and auth layers: round
//! trips, strict expiry, tamper detection and signing key rotation.

mod common;

use std::sync::Arc;

use chrono::Duration;
use warden_auth::AuthService;
use warden_capabilities::prelude::*;
use warden_core::prelude::*;
use warden_crypto::prelude::*;

use common::{SIGNING_SEED, base_config};

fn grants() -> GrantSet {
    let mut grants = GrantSet::new();
    grants.insert(PermissionGrant::new(
        Capability::Publish,
        NamespacePattern::prefix(Namespace::new("github.com/alice").unwrap()),
        "github:user:alice",
    ));
    grants.insert(PermissionGrant::new(
        Capability::Edit,
        NamespacePattern::parse("corp/tools").unwrap(),
        "tools-edit",
    ));
    grants
}

fn issuer_and_validator() -> (CredentialIssuer, CredentialValidator) {
    let key = Arc::new(KeyPair::generate());
    let validator = CredentialValidator::new(SignatureVerifier::with_keys([key.export_public_key()]));
    (CredentialIssuer::new(key, 300).unwrap(), validator)
}

/// Replace the first character of the payload with another base64url
/// character.
fn tamper(token: &str) -> String {
    let replacement = if token.starts_with('A') { "B" } else { "A" };
    format!("{replacement}{}", &token[1..])
}

#[test]
fn test_round_trip_preserves_contents() {
    let (issuer, validator) = issuer_and_validator();
    let credential = issuer.issue("alice", ProviderKind::Github, grants()).unwrap();

    let verified = validator.validate(&credential.encode()).unwrap();
    assert_eq!(verified.credential(), &credential);
    assert_eq!(verified.subject(), "alice");
    assert_eq!(verified.provider(), ProviderKind::Github);
    assert_eq!(verified.grants().len(), 2);
    assert_eq!(verified.verified_by(), issuer.public_key().key_id());
}

#[test]
fn test_expiry_is_strict() {
    let (issuer, validator) = issuer_and_validator();
    let issued_at = Timestamp::now_millis();
    let credential = issuer
        .issue_at(issued_at, "alice", ProviderKind::Github, grants())
        .unwrap();
    let token = credential.encode();
    let expires_at = credential.expires_at;
    assert_eq!(expires_at, issued_at.checked_add(Duration::seconds(300)).unwrap());

    assert!(validator.validate_at(&token, issued_at).is_ok());
    assert!(validator.validate_at(&token, expires_at).is_ok());
    let after = expires_at.checked_add(Duration::milliseconds(1)).unwrap();
    assert!(matches!(
        validator.validate_at(&token, after),
        Err(CapabilityError::Expired { expires_at: at }) if at == expires_at
    ));

    let err = AuthError::from(validator.validate_at(&token, after).unwrap_err());
    assert_eq!(err.status_class(), StatusClass::Unauthorized);
}

#[test]
fn test_tampering_is_detected() {
    let (issuer, validator) = issuer_and_validator();
    let token = issuer
        .issue("alice", ProviderKind::Github, grants())
        .unwrap()
        .encode();
    assert!(matches!(
        validator.validate(&tamper(&token)),
        Err(CapabilityError::SignatureInvalid)
    ));

    // A payload spliced onto another credential's signature.
    let other = issuer
        .issue("mallory", ProviderKind::Github, grants())
        .unwrap()
        .encode();
    let (payload, _) = token.split_once('.').unwrap();
    let (_, signature) = other.split_once('.').unwrap();
    assert!(matches!(
        validator.validate(&format!("{payload}.{signature}")),
        Err(CapabilityError::SignatureInvalid)
    ));

    for garbage in ["", "no-separator", "a.b.c", "!!!.???"] {
        assert!(
            matches!(validator.validate(garbage), Err(CapabilityError::Malformed(_))),
            "{garbage:?} should be malformed"
        );
    }
}

#[test]
fn test_untrusted_key_is_rejected() {
    let (issuer, _) = issuer_and_validator();
    let (_, stranger_validator) = issuer_and_validator();
    let token = issuer
        .issue("alice", ProviderKind::Github, grants())
        .unwrap()
        .encode();
    assert!(matches!(
        stranger_validator.validate(&token),
        Err(CapabilityError::SignatureInvalid)
    ));
}

#[test]
fn test_namespace_matching() {
    let (issuer, validator) = issuer_and_validator();
    let token = issuer
        .issue("alice", ProviderKind::Github, grants())
        .unwrap()
        .encode();
    let verified = validator.validate(&token).unwrap();
    let authorizer = Authorizer::new(AuthorizationPolicy::default());

    let allowed = [
        ("github.com/alice/cli", Capability::Publish),
        ("github.com/alice/cli/nested", Capability::Publish),
        ("corp/tools", Capability::Edit),
    ];
    for (namespace, capability) in allowed {
        assert!(
            authorizer.authorize(&verified, namespace, capability).is_ok(),
            "{capability} on {namespace}"
        );
    }

    let denied = [
        ("github.com/alice", Capability::Publish),
        ("github.com/alice/cli", Capability::Edit),
        ("github.com/alicex/cli", Capability::Publish),
        ("corp/tools/x", Capability::Edit),
    ];
    for (namespace, capability) in denied {
        assert!(
            matches!(
                authorizer.authorize(&verified, namespace, capability),
                Err(CapabilityError::Denied { .. })
            ),
            "{capability} on {namespace}"
        );
    }

    for invalid in ["", "/leading", "trailing/", "a//b", "has space", "star/*"] {
        assert!(
            matches!(
                authorizer.authorize(&verified, invalid, Capability::Publish),
                Err(CapabilityError::InvalidNamespace { .. })
            ),
            "{invalid:?} should be invalid"
        );
    }
}

#[tokio::test]
async fn test_rotated_key_still_validates() {
    let mut old = base_config();
    old.anonymous.enabled = true;
    old.anonymous.namespace = "sandbox".to_string();
    let old_service = AuthService::from_config(&old).unwrap();
    let token = old_service.issue_anonymous().await.unwrap().into_token();

    let new_key = KeyPair::generate();
    let old_public = KeyPair::from_hex_seed(SIGNING_SEED)
        .unwrap()
        .export_public_key()
        .to_hex();

    let mut rotated = old.clone();
    rotated.signing.private_key = new_key.secret_key_hex().to_string();
    let without_previous = AuthService::from_config(&rotated).unwrap();
    assert!(matches!(
        without_previous.validate(&token),
        Err(AuthError::SignatureInvalid)
    ));

    rotated.signing.previous_public_keys = vec![old_public];
    let with_previous = AuthService::from_config(&rotated).unwrap();
    let verified = with_previous.validate(&token).unwrap();
    assert_eq!(verified.provider(), ProviderKind::Anonymous);
    assert!(with_previous
        .authorize(&token, "sandbox/demo", Capability::Publish)
        .is_ok());

    // New credentials are signed by the new key only.
    let fresh = with_previous.issue_anonymous().await.unwrap();
    assert_eq!(fresh.credential().key_id, new_key.key_id());
    assert!(old_service.validate(fresh.token()).is_err());
}
