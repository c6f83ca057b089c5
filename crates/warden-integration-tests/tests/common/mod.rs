//! Shared fixtures for integration tests: a signing key, mock identity
//! providers and an identity token signer.

#![allow(dead_code)]

use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde_json::{Value, json};
use warden_config::Config;
use warden_crypto::KeyPair;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Hex seed of the service signing key used throughout the tests.
pub const SIGNING_SEED: &str = "9d61b19deffd5a60ba844af492ec2cc44449c5697b326919703bac031cae7f60";

/// PKCS#8 v1 prefix for a raw Ed25519 seed.
const ED25519_PKCS8_PREFIX: [u8; 16] = [
    0x30, 0x2e, 0x02, 0x01, 0x00, 0x30, 0x05, 0x06, 0x03, 0x2b, 0x65, 0x70, 0x04, 0x22, 0x04, 0x20,
];

/// A config with only the signing key set.
pub fn base_config() -> Config {
    let mut config = Config::default();
    config.signing.private_key = SIGNING_SEED.to_string();
    config
}

/// Unix seconds now.
pub fn now_secs() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Signs identity tokens as a mock OIDC issuer.
pub struct TokenSigner {
    kid: String,
    keypair: KeyPair,
}

impl TokenSigner {
    pub fn new(kid: &str) -> Self {
        Self {
            kid: kid.to_string(),
            keypair: KeyPair::generate(),
        }
    }

    /// The public key as a JWK.
    pub fn jwk(&self) -> Value {
        json!({
            "kty": "OKP",
            "crv": "Ed25519",
            "x": self.keypair.export_public_key().to_base64url(),
            "kid": self.kid,
            "alg": "EdDSA",
            "use": "sig",
        })
    }

    pub fn sign(&self, claims: &Value) -> String {
        let mut der = ED25519_PKCS8_PREFIX.to_vec();
        der.extend_from_slice(&*self.keypair.secret_key_bytes());
        let mut header = Header::new(Algorithm::EdDSA);
        header.kid = Some(self.kid.clone());
        jsonwebtoken::encode(&header, claims, &EncodingKey::from_ed_der(&der)).unwrap()
    }
}

/// Serve `/jwks` with the signer's key.
pub async fn mount_jwks(server: &MockServer, signer: &TokenSigner) {
    Mock::given(method("GET"))
        .and(path("/jwks"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"keys": [signer.jwk()]})))
        .mount(server)
        .await;
}

/// Serve the OAuth code exchange and the user and organization lookups.
pub async fn mount_github(server: &MockServer, login: &str, orgs: &[&str]) {
    Mock::given(method("POST"))
        .and(path("/login/oauth/access_token"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"access_token": "gho_exchanged", "token_type": "bearer"})),
        )
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/user"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"login": login, "id": 4242})))
        .mount(server)
        .await;
    let orgs: Vec<Value> = orgs.iter().map(|org| json!({"login": org})).collect();
    Mock::given(method("GET"))
        .and(path("/user/orgs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(orgs))
        .mount(server)
        .await;
}
