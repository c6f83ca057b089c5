//! Token signing helpers for unit tests.

use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde_json::Value;
use warden_crypto::KeyPair;

/// PKCS#8 v1 prefix for a raw Ed25519 seed.
const ED25519_PKCS8_PREFIX: [u8; 16] = [
    0x30, 0x2e, 0x02, 0x01, 0x00, 0x30, 0x05, 0x06, 0x03, 0x2b, 0x65, 0x70, 0x04, 0x22, 0x04, 0x20,
];

pub(crate) fn jwk_json(x: &str, kid: &str) -> Value {
    serde_json::json!({
        "kty": "OKP",
        "crv": "Ed25519",
        "x": x,
        "kid": kid,
        "alg": "EdDSA",
        "use": "sig",
    })
}

pub(crate) struct TestSigner {
    kid: String,
    keypair: KeyPair,
}

impl TestSigner {
    pub(crate) fn new(kid: &str) -> Self {
        Self {
            kid: kid.to_string(),
            keypair: KeyPair::generate(),
        }
    }

    pub(crate) fn public_key_b64(&self) -> String {
        self.keypair.export_public_key().to_base64url()
    }

    pub(crate) fn jwk(&self) -> Value {
        jwk_json(&self.public_key_b64(), &self.kid)
    }

    fn encoding_key(&self) -> EncodingKey {
        let mut der = ED25519_PKCS8_PREFIX.to_vec();
        der.extend_from_slice(&*self.keypair.secret_key_bytes());
        EncodingKey::from_ed_der(&der)
    }

    pub(crate) fn sign(&self, claims: &Value) -> String {
        let mut header = Header::new(Algorithm::EdDSA);
        header.kid = Some(self.kid.clone());
        jsonwebtoken::encode(&header, claims, &self.encoding_key()).unwrap()
    }
}

/// A token signed with a shared secret.
pub(crate) fn sign_hs256(kid: &str, claims: &Value) -> String {
    let mut header = Header::new(Algorithm::HS256);
    header.kid = Some(kid.to_string());
    jsonwebtoken::encode(&header, claims, &EncodingKey::from_secret(b"shared-secret")).unwrap()
}

pub(crate) fn now_secs() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map_or(0, |d| i64::try_from(d.as_secs()).unwrap_or(i64::MAX))
}
