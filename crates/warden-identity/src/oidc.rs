//! OpenID Connect identity token verification.
//!
//! Tokens are checked locally: signature against the issuer's published
//! keys, then `iss`, `aud`, `exp` and `nbf`. The only network traffic is
//! the key set fetch.

use std::time::Duration;

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode, decode_header};
use serde_json::{Map, Value};
use tracing::debug;
use warden_core::{ClaimSet, ProviderKind};

use crate::error::{IdentityError, IdentityResult};
use crate::http::{self, HttpSettings};
use crate::jwks::{JwksCache, JwksSource};

/// Default clock skew tolerance in seconds.
pub const DEFAULT_CLOCK_SKEW_SECS: u64 = 60;
/// Default key set refresh interval in seconds.
pub const DEFAULT_JWKS_REFRESH_SECS: u64 = 3600;
/// Default minimum spacing between forced key set refreshes in seconds.
pub const DEFAULT_JWKS_MIN_REFRESH_SECS: u64 = 60;

const REQUIRED_SPEC_CLAIMS: [&str; 4] = ["exp", "iss", "aud", "sub"];

/// Settings for one OIDC issuer.
#[derive(Debug, Clone, PartialEq)]
pub struct OidcSettings {
    /// Expected `iss`; also the discovery base.
    pub issuer: String,
    /// Expected `aud` (the client id).
    pub audience: String,
    /// Key set URL, bypassing discovery.
    pub jwks_url: Option<String>,
    /// Dotted paths flattened into top-level claims.
    pub extra_claims: Vec<String>,
    /// Alternatives; a token must match every pair of at least one.
    pub required_claims: Vec<Map<String, Value>>,
    /// Tolerance applied to `exp` and `nbf`.
    pub clock_skew_secs: u64,
    /// Age after which the key set is refetched.
    pub jwks_refresh_secs: u64,
    /// Minimum age before an unknown `kid` may force a refetch.
    pub jwks_min_refresh_secs: u64,
}

impl OidcSettings {
    /// Settings with defaults for everything but issuer and audience.
    #[must_use]
    pub fn new(issuer: impl Into<String>, audience: impl Into<String>) -> Self {
        Self {
            issuer: issuer.into(),
            audience: audience.into(),
            jwks_url: None,
            extra_claims: Vec::new(),
            required_claims: Vec::new(),
            clock_skew_secs: DEFAULT_CLOCK_SKEW_SECS,
            jwks_refresh_secs: DEFAULT_JWKS_REFRESH_SECS,
            jwks_min_refresh_secs: DEFAULT_JWKS_MIN_REFRESH_SECS,
        }
    }
}

/// Verifier for signed identity tokens from one issuer.
#[derive(Debug)]
pub struct OidcVerifier {
    provider: ProviderKind,
    issuer: String,
    audience: String,
    extra_claims: Vec<String>,
    required_claims: Vec<Map<String, Value>>,
    clock_skew_secs: u64,
    jwks: JwksCache,
}

impl OidcVerifier {
    /// Create a verifier for the generic `oidc` provider.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::InvalidConfiguration`] when the issuer,
    /// audience or key set URL is unusable.
    pub fn new(settings: OidcSettings, transport: &HttpSettings) -> IdentityResult<Self> {
        Self::for_provider(ProviderKind::Oidc, settings, transport)
    }

    pub(crate) fn for_provider(
        provider: ProviderKind,
        settings: OidcSettings,
        transport: &HttpSettings,
    ) -> IdentityResult<Self> {
        let section = match provider {
            ProviderKind::GithubOidc => "github_oidc",
            _ => "oidc",
        };
        let issuer_url = http::parse_base_url(&format!("{section}.issuer"), &settings.issuer)?;
        if settings.audience.trim().is_empty() {
            return Err(IdentityError::InvalidConfiguration(format!(
                "{section}: audience must be set"
            )));
        }
        if settings.jwks_refresh_secs == 0 {
            return Err(IdentityError::InvalidConfiguration(format!(
                "{section}.jwks_refresh_secs must be positive"
            )));
        }
        let source = match settings.jwks_url.as_deref().filter(|u| !u.is_empty()) {
            Some(url) => JwksSource::Direct(http::parse_base_url(&format!("{section}.jwks_url"), url)?),
            None => JwksSource::Discovery { issuer: issuer_url },
        };

        Ok(Self {
            provider,
            jwks: JwksCache::new(
                provider,
                transport.build_client()?,
                source,
                Duration::from_secs(settings.jwks_refresh_secs),
                Duration::from_secs(settings.jwks_min_refresh_secs),
            ),
            issuer: settings.issuer,
            audience: settings.audience,
            extra_claims: settings.extra_claims,
            required_claims: settings.required_claims,
            clock_skew_secs: settings.clock_skew_secs,
        })
    }

    /// Expected issuer.
    #[must_use]
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// The key cache backing this verifier.
    #[must_use]
    pub fn jwks(&self) -> &JwksCache {
        &self.jwks
    }

    /// Verify a token and normalize its claims.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::Rejected`] for any invalid, expired or
    /// unadmitted token and [`IdentityError::Unavailable`] when the key set
    /// cannot be fetched.
    pub async fn verify(&self, token: &str) -> IdentityResult<ClaimSet> {
        let header = decode_header(token).map_err(|_| self.rejected("malformed token"))?;
        if matches!(header.alg, Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512) {
            return Err(self.rejected(format!("algorithm {:?} not accepted", header.alg)));
        }

        let jwk = self.jwks.key_for(header.kid.as_deref()).await?;
        if let Some(key_alg) = &jwk.common.key_algorithm {
            if format!("{key_alg:?}") != format!("{:?}", header.alg) {
                return Err(self.rejected("token algorithm does not match the signing key"));
            }
        }
        let key = DecodingKey::from_jwk(&jwk).map_err(|_| self.rejected("signing key unusable"))?;

        let mut validation = Validation::new(header.alg);
        validation.set_issuer(&[&self.issuer]);
        validation.set_audience(&[&self.audience]);
        validation.set_required_spec_claims(&REQUIRED_SPEC_CLAIMS);
        validation.leeway = self.clock_skew_secs;
        validation.validate_nbf = true;

        let data = decode::<Map<String, Value>>(token, &key, &validation)
            .map_err(|e| self.rejected(describe(e.kind())))?;

        self.check_required_claims(&data.claims)?;
        self.claim_set(&data.claims)
    }

    fn check_required_claims(&self, claims: &Map<String, Value>) -> IdentityResult<()> {
        if self.required_claims.is_empty() {
            return Ok(());
        }
        let admitted = self.required_claims.iter().any(|alternative| {
            alternative
                .iter()
                .all(|(path, expected)| lookup_path(claims, path) == Some(expected))
        });
        if admitted {
            Ok(())
        } else {
            Err(self.rejected("token does not carry the required claims"))
        }
    }

    fn claim_set(&self, claims: &Map<String, Value>) -> IdentityResult<ClaimSet> {
        let Some(subject) = claims.get("sub").and_then(Value::as_str).filter(|s| !s.is_empty()) else {
            return Err(self.rejected("token has no subject"));
        };

        let mut builder = ClaimSet::builder(subject, self.provider);
        for (name, value) in claims {
            if !builder.insert_json(name.clone(), value) {
                debug!(provider = %self.provider, claim = %name, "Dropping claim that is not representable");
            }
        }
        for path in &self.extra_claims {
            match lookup_path(claims, path) {
                Some(value) => {
                    if !builder.insert_json(path.clone(), value) {
                        debug!(provider = %self.provider, claim = %path, "Extra claim is not representable");
                    }
                },
                None => debug!(provider = %self.provider, claim = %path, "Extra claim absent"),
            }
        }
        Ok(builder.build())
    }

    fn rejected(&self, reason: impl Into<String>) -> IdentityError {
        IdentityError::rejected(self.provider, reason)
    }
}

/// Walk a dotted path (`realm_access.roles`) through nested objects.
fn lookup_path<'a>(claims: &'a Map<String, Value>, path: &str) -> Option<&'a Value> {
    if let Some(value) = claims.get(path) {
        return Some(value);
    }
    let mut segments = path.split('.');
    let mut current = claims.get(segments.next()?)?;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

fn describe(kind: &ErrorKind) -> String {
    match kind {
        ErrorKind::ExpiredSignature => "token expired".to_string(),
        ErrorKind::ImmatureSignature => "token not yet valid".to_string(),
        ErrorKind::InvalidIssuer => "issuer mismatch".to_string(),
        ErrorKind::InvalidAudience => "audience mismatch".to_string(),
        ErrorKind::InvalidSignature => "signature invalid".to_string(),
        ErrorKind::InvalidAlgorithm => "algorithm mismatch".to_string(),
        ErrorKind::MissingRequiredClaim(claim) => format!("missing required claim '{claim}'"),
        _ => "malformed token".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{TestSigner, now_secs, sign_hs256};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const ISSUER: &str = "https://id.example.com/realms/corp";
    const AUDIENCE: &str = "warden";

    async fn setup(signer: &TestSigner, configure: impl FnOnce(&mut OidcSettings)) -> (MockServer, OidcVerifier) {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/jwks"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"keys": [signer.jwk()]})))
            .mount(&server)
            .await;

        let mut settings = OidcSettings::new(ISSUER, AUDIENCE);
        settings.jwks_url = Some(format!("{}/jwks", server.uri()));
        configure(&mut settings);
        let verifier = OidcVerifier::new(settings, &HttpSettings::default()).unwrap();
        (server, verifier)
    }

    fn claims(extra: Value) -> Value {
        let now = now_secs();
        let mut base = serde_json::json!({
            "iss": ISSUER,
            "aud": AUDIENCE,
            "sub": "user-1",
            "iat": now,
            "exp": now + 300,
        });
        if let (Some(base_map), Value::Object(extra)) = (base.as_object_mut(), extra) {
            base_map.extend(extra);
        }
        base
    }

    #[tokio::test]
    async fn test_valid_token_claims() {
        let signer = TestSigner::new("k1");
        let (_server, verifier) = setup(&signer, |s| {
            s.extra_claims = vec!["realm_access.roles".into(), "profile.missing".into()];
        })
        .await;

        let token = signer.sign(&claims(serde_json::json!({
            "groups": ["admins", "dev"],
            "email_verified": true,
            "realm_access": {"roles": ["publisher"]},
            "nothing": null,
        })));
        let set = verifier.verify(&token).await.unwrap();

        assert_eq!(set.subject(), "user-1");
        assert_eq!(set.provider(), ProviderKind::Oidc);
        assert_eq!(set.get_list("groups"), Some(&["admins".to_string(), "dev".to_string()][..]));
        assert_eq!(set.get_list("realm_access.roles"), Some(&["publisher".to_string()][..]));
        assert!(!set.contains("realm_access"));
        assert!(!set.contains("nothing"));
        assert!(!set.contains("profile.missing"));
        assert_eq!(set.get_str("iss"), Some(ISSUER));
    }

    #[tokio::test]
    async fn test_expiry_and_skew() {
        let signer = TestSigner::new("k1");
        let (_server, verifier) = setup(&signer, |s| s.clock_skew_secs = 60).await;
        let now = now_secs();

        let within_skew = signer.sign(&claims(serde_json::json!({"exp": now - 30})));
        assert!(verifier.verify(&within_skew).await.is_ok());

        let expired = signer.sign(&claims(serde_json::json!({"exp": now - 600})));
        let err = verifier.verify(&expired).await.unwrap_err();
        assert!(!err.is_retryable());
        assert!(err.to_string().contains("token expired"));

        let early = signer.sign(&claims(serde_json::json!({"nbf": now + 600})));
        assert!(verifier.verify(&early).await.unwrap_err().to_string().contains("not yet valid"));
    }

    #[tokio::test]
    async fn test_issuer_and_audience_checked() {
        let signer = TestSigner::new("k1");
        let (_server, verifier) = setup(&signer, |_| {}).await;

        let wrong_aud = signer.sign(&claims(serde_json::json!({"aud": "someone-else"})));
        assert!(verifier.verify(&wrong_aud).await.unwrap_err().to_string().contains("audience"));

        let wrong_iss = signer.sign(&claims(serde_json::json!({"iss": "https://evil.example.com"})));
        assert!(verifier.verify(&wrong_iss).await.unwrap_err().to_string().contains("issuer"));
    }

    #[tokio::test]
    async fn test_symmetric_algorithm_rejected_before_key_fetch() {
        let signer = TestSigner::new("k1");
        let (server, verifier) = setup(&signer, |_| {}).await;

        let token = sign_hs256("k1", &claims(serde_json::json!({})));
        let err = verifier.verify(&token).await.unwrap_err();
        assert!(matches!(err, IdentityError::Rejected { .. }));
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_foreign_signature_rejected() {
        let trusted = TestSigner::new("k1");
        let (_server, verifier) = setup(&trusted, |_| {}).await;

        let forger = TestSigner::new("k1");
        let token = forger.sign(&claims(serde_json::json!({})));
        let err = verifier.verify(&token).await.unwrap_err();
        assert!(err.to_string().contains("signature invalid"));
    }

    #[tokio::test]
    async fn test_garbage_is_permanent() {
        let signer = TestSigner::new("k1");
        let (_server, verifier) = setup(&signer, |_| {}).await;
        let err = verifier.verify("not-a-jwt").await.unwrap_err();
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_required_claims_alternatives() {
        let signer = TestSigner::new("k1");
        let (_server, verifier) = setup(&signer, |s| {
            s.required_claims = vec![
                serde_json::from_str(r#"{"hd": "example.com", "email_verified": true}"#).unwrap(),
                serde_json::from_str(r#"{"realm_access.roles": ["publisher"]}"#).unwrap(),
            ];
        })
        .await;

        let first = signer.sign(&claims(serde_json::json!({"hd": "example.com", "email_verified": true})));
        assert!(verifier.verify(&first).await.is_ok());

        let second = signer.sign(&claims(serde_json::json!({"realm_access": {"roles": ["publisher"]}})));
        assert!(verifier.verify(&second).await.is_ok());

        let partial = signer.sign(&claims(serde_json::json!({"hd": "example.com", "email_verified": false})));
        let err = verifier.verify(&partial).await.unwrap_err();
        assert!(!err.is_retryable());
        assert!(err.to_string().contains("required claims"));
    }

    #[test]
    fn test_lookup_path() {
        let claims: Map<String, Value> =
            serde_json::from_str(r#"{"a": {"b": {"c": 1}}, "x.y": "literal"}"#).unwrap();
        assert_eq!(lookup_path(&claims, "a.b.c"), Some(&serde_json::json!(1)));
        assert_eq!(lookup_path(&claims, "x.y"), Some(&serde_json::json!("literal")));
        assert_eq!(lookup_path(&claims, "a.z"), None);
    }

    #[test]
    fn test_invalid_settings() {
        let http = HttpSettings::default();
        assert!(OidcVerifier::new(OidcSettings::new("not a url", AUDIENCE), &http).is_err());
        assert!(OidcVerifier::new(OidcSettings::new(ISSUER, " "), &http).is_err());
        let mut settings = OidcSettings::new(ISSUER, AUDIENCE);
        settings.jwks_refresh_secs = 0;
        assert!(OidcVerifier::new(settings, &http).is_err());
    }
}
