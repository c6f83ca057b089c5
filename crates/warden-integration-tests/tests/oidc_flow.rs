//! End-to-end issuance for OIDC identities: permission rules over token
//! claims, admission requirements and CI workload tokens.

mod common;

use serde_json::{Value, json};
use warden_auth::prelude::*;
use warden_capabilities::ANONYMOUS_MUTATION_PROVENANCE;
use warden_config::Config;
use warden_core::{Capability, ProviderKind};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{TokenSigner, base_config, mount_jwks, now_secs};

const RULES: &str = r#"[
    {
        "id": "admins-edit-all",
        "capability": "edit",
        "namespace": "*",
        "checks": [{ "claim": "groups", "op": "contains", "value": "admins" }]
    },
    {
        "id": "team-publish",
        "capability": "publish",
        "namespace": "corp/{groups}/*",
        "checks": [{ "claim": "email", "op": "matches", "value": "*@corp.example" }]
    },
    {
        "id": "publishers",
        "capability": "publish",
        "namespace": "shared/*",
        "checks": [{ "claim": "realm_access.roles", "op": "contains", "value": "publisher" }]
    }
]"#;

fn issuer(server: &MockServer) -> String {
    format!("{}/realms/corp", server.uri())
}

fn oidc_config(server: &MockServer) -> Config {
    let mut config = base_config();
    config.oidc.enabled = true;
    config.oidc.issuer = issuer(server);
    config.oidc.client_id = "warden".to_string();
    config.oidc.jwks_url = format!("{}/jwks", server.uri());
    config.oidc.extra_claims = vec!["realm_access.roles".to_string()];
    config.oidc.rules_json = RULES.to_string();
    config
}

fn claims(server: &MockServer, sub: &str, extra: &Value) -> Value {
    let mut claims = json!({
        "iss": issuer(server),
        "aud": "warden",
        "sub": sub,
        "iat": now_secs(),
        "exp": now_secs() + 300,
    });
    if let (Some(target), Some(source)) = (claims.as_object_mut(), extra.as_object()) {
        target.extend(source.clone());
    }
    claims
}

async fn issue(service: &AuthService, token: String) -> AuthResult<IssuedCredential> {
    service
        .issue_credential(&IdentityAssertion::OidcToken { token })
        .await
}

fn patterns(issued: &IssuedCredential) -> Vec<String> {
    let mut patterns: Vec<String> = issued
        .credential()
        .grants
        .iter()
        .map(|grant| format!("{}:{}", grant.capability, grant.pattern))
        .collect();
    patterns.sort();
    patterns
}

#[tokio::test]
async fn test_rules_grant_by_claims() {
    let server = MockServer::start().await;
    let signer = TokenSigner::new("corp-1");
    mount_jwks(&server, &signer).await;
    let service = AuthService::from_config(&oidc_config(&server)).unwrap();

    let token = signer.sign(&claims(
        &server,
        "u-1001",
        &json!({
            "email": "dana@corp.example",
            "groups": ["admins", "tools"],
            "realm_access": { "roles": ["publisher"] },
        }),
    ));
    let issued = issue(&service, token).await.unwrap();
    assert_eq!(issued.credential().subject, "u-1001");
    assert_eq!(issued.credential().provider, ProviderKind::Oidc);
    assert_eq!(
        patterns(&issued),
        [
            "edit:*",
            "publish:corp/admins/*",
            "publish:corp/tools/*",
            "publish:shared/*",
        ]
    );

    let grant = service
        .authorize(issued.token(), "anything/at/all", Capability::Edit)
        .unwrap();
    assert_eq!(grant.provenance, "admins-edit-all");
    let grant = service
        .authorize(issued.token(), "corp/tools/linter", Capability::Publish)
        .unwrap();
    assert_eq!(grant.provenance, "team-publish");
    assert!(service
        .authorize(issued.token(), "elsewhere/pkg", Capability::Publish)
        .is_err());
}

#[tokio::test]
async fn test_unmatched_user_gets_no_grants() {
    let server = MockServer::start().await;
    let signer = TokenSigner::new("corp-1");
    mount_jwks(&server, &signer).await;
    let service = AuthService::from_config(&oidc_config(&server)).unwrap();

    let token = signer.sign(&claims(
        &server,
        "u-2002",
        &json!({ "email": "eve@elsewhere.example", "groups": ["web"] }),
    ));
    let issued = issue(&service, token).await.unwrap();
    assert!(issued.credential().grants.is_empty());
    assert!(matches!(
        service.authorize(issued.token(), "corp/web/site", Capability::Publish),
        Err(AuthError::AuthorizationDenied { .. })
    ));
}

#[tokio::test]
async fn test_anonymous_mutation_applies_to_any_credential() {
    let server = MockServer::start().await;
    let signer = TokenSigner::new("corp-1");
    mount_jwks(&server, &signer).await;
    let mut config = oidc_config(&server);
    config.anonymous.namespace = "io.example.sandbox".to_string();
    config.anonymous.allow_mutation = true;
    let service = AuthService::from_config(&config).unwrap();

    let token = signer.sign(&claims(&server, "u-2002", &json!({})));
    let issued = issue(&service, token).await.unwrap();
    assert!(issued.credential().grants.is_empty());

    let grant = service
        .authorize(issued.token(), "io.example.sandbox/demo", Capability::Publish)
        .unwrap();
    assert_eq!(grant.provenance, ANONYMOUS_MUTATION_PROVENANCE);
    assert!(service
        .authorize(issued.token(), "io.example.sandbox/demo", Capability::Edit)
        .is_err());
    assert!(service
        .authorize(issued.token(), "io.example.other/demo", Capability::Publish)
        .is_err());
}

#[tokio::test]
async fn test_invalid_tokens_are_unauthorized() {
    let server = MockServer::start().await;
    let signer = TokenSigner::new("corp-1");
    mount_jwks(&server, &signer).await;
    let service = AuthService::from_config(&oidc_config(&server)).unwrap();

    let expired = claims(&server, "u-1", &json!({ "exp": now_secs() - 600 }));
    let wrong_audience = claims(&server, "u-1", &json!({ "aud": "someone-else" }));
    let wrong_issuer = claims(&server, "u-1", &json!({ "iss": "https://evil.example" }));
    let not_yet_valid = claims(&server, "u-1", &json!({ "nbf": now_secs() + 600 }));
    let stranger = TokenSigner::new("corp-1").sign(&claims(&server, "u-1", &json!({})));

    for token in [
        signer.sign(&expired),
        signer.sign(&wrong_audience),
        signer.sign(&wrong_issuer),
        signer.sign(&not_yet_valid),
        stranger,
    ] {
        let err = issue(&service, token).await.unwrap_err();
        assert_eq!(err.status_class(), StatusClass::Unauthorized, "{err}");
        assert!(!err.is_retryable());
    }
}

#[tokio::test]
async fn test_required_claims_gate_admission() {
    let server = MockServer::start().await;
    let signer = TokenSigner::new("corp-1");
    mount_jwks(&server, &signer).await;
    let mut config = oidc_config(&server);
    let alternative = json!({ "email_verified": true });
    config.oidc.required_claims = vec![alternative.as_object().cloned().unwrap()];
    let service = AuthService::from_config(&config).unwrap();

    let verified = signer.sign(&claims(&server, "u-1", &json!({ "email_verified": true })));
    assert!(issue(&service, verified).await.is_ok());

    let unverified = signer.sign(&claims(&server, "u-1", &json!({ "email_verified": false })));
    let err = issue(&service, unverified).await.unwrap_err();
    assert_eq!(err.status_class(), StatusClass::Unauthorized);
}

#[tokio::test]
async fn test_key_set_outage_is_retryable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/jwks"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    let signer = TokenSigner::new("corp-1");
    let service = AuthService::from_config(&oidc_config(&server)).unwrap();

    let token = signer.sign(&claims(&server, "u-1", &json!({})));
    let err = issue(&service, token).await.unwrap_err();
    assert!(matches!(
        err,
        AuthError::IdentityVerificationFailed {
            provider: ProviderKind::Oidc,
            retryable: true,
            ..
        }
    ));
}

#[tokio::test]
async fn test_ci_token_grants_owner_publish() {
    let server = MockServer::start().await;
    let signer = TokenSigner::new("actions-1");
    mount_jwks(&server, &signer).await;

    let mut config = base_config();
    config.github_oidc.enabled = true;
    config.github_oidc.issuer = server.uri();
    config.github_oidc.audience = "warden".to_string();
    config.github_oidc.jwks_url = format!("{}/jwks", server.uri());
    let service = AuthService::from_config(&config).unwrap();

    let token = signer.sign(&json!({
        "iss": server.uri(),
        "aud": "warden",
        "sub": "repo:acme/tool:ref:refs/heads/main",
        "repository": "acme/tool",
        "repository_owner": "acme",
        "iat": now_secs(),
        "exp": now_secs() + 300,
    }));
    let issued = service
        .issue_credential(&IdentityAssertion::GithubActionsToken { token })
        .await
        .unwrap();
    assert_eq!(issued.credential().provider, ProviderKind::GithubOidc);
    assert_eq!(patterns(&issued), ["publish:github.com/acme/*"]);

    assert!(service
        .authorize(issued.token(), "github.com/acme/tool", Capability::Publish)
        .is_ok());
    assert!(service
        .authorize(issued.token(), "github.com/acme/tool", Capability::Edit)
        .is_err());
}
