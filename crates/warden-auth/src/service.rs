//! The authentication facade.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{Instrument, info, warn};
use warden_capabilities::{
    AuthorizationPolicy, Authorizer, Credential, CredentialIssuer, CredentialValidator, GrantSet,
    Namespace, PermissionGrant, VerifiedCredential,
};
use warden_config::{Config, GithubOidcSection, GithubSection, OidcSection};
use warden_core::{AuthError, AuthResult, Capability, ClaimSet, ProviderKind};
use warden_crypto::{ContentHash, PublicKey};
use warden_identity::{
    GithubOidcVerifier, GithubSettings, GithubVerifier, HttpSettings, IdentityAssertion,
    IdentityVerifier, OidcSettings, OidcVerifier,
};
use warden_policy::{RuleEvaluator, RuleSet};
use warden_telemetry::{RequestContext, RequestGuard};

use crate::flow::{FlowState, IssuanceFlow};
use crate::keys;

const COMPONENT: &str = "auth";

/// A freshly issued credential and its wire form.
#[derive(Debug, Clone)]
pub struct IssuedCredential {
    token: String,
    credential: Credential,
}

impl IssuedCredential {
    /// The encoded credential handed to the caller.
    #[must_use]
    pub fn token(&self) -> &str {
        &self.token
    }

    /// The decoded credential.
    #[must_use]
    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    /// Consume into the encoded credential.
    #[must_use]
    pub fn into_token(self) -> String {
        self.token
    }
}

/// Issues and checks credentials for every enabled identity provider.
///
/// Built once from a validated [`Config`] and never mutated afterwards;
/// share it behind an [`Arc`] across request handlers.
#[derive(Debug)]
pub struct AuthService {
    verifiers: HashMap<ProviderKind, IdentityVerifier>,
    evaluator: RuleEvaluator,
    issuer: CredentialIssuer,
    validator: CredentialValidator,
    authorizer: Authorizer,
    verify_timeout: Duration,
}

impl AuthService {
    /// Build the service from configuration.
    ///
    /// # Errors
    ///
    /// - [`AuthError::InvalidConfiguration`] if the configuration does not
    ///   validate, a rule does not compile, or a provider is unusable
    /// - [`AuthError::SigningKeyUnavailable`] if no usable signing key is
    ///   configured
    pub fn from_config(config: &Config) -> AuthResult<Self> {
        warden_config::validate::validate(config)?;

        let key = Arc::new(keys::load_signing_key(&config.signing)?);
        let validator = CredentialValidator::new(keys::trusted_keys(&key, &config.signing)?);
        let ttl = i64::try_from(config.credentials.ttl_secs).map_err(|_| {
            AuthError::InvalidConfiguration("credentials.ttl_secs is out of range".to_string())
        })?;
        let issuer = CredentialIssuer::new(Arc::clone(&key), ttl)?;

        let transport = HttpSettings::new(config.http.timeout_secs, config.http.user_agent.clone())?;
        let verifiers = build_verifiers(config, &transport)?;

        let anonymous_namespace = if config.anonymous.namespace.is_empty() {
            None
        } else {
            Some(Namespace::new(config.anonymous.namespace.as_str())?)
        };
        let rules = RuleSet::compile(&config.oidc.rule_specs()?)?;
        let evaluator = RuleEvaluator::new(
            &config.github.namespace_template,
            &config.github_oidc.namespace_template,
            rules,
            anonymous_namespace.clone(),
        )?;
        let authorizer = Authorizer::new(AuthorizationPolicy {
            anonymous_namespace,
            allow_anonymous_mutation: config.anonymous.allow_mutation,
        });

        let mut enabled: Vec<&str> = verifiers.keys().map(ProviderKind::as_str).collect();
        enabled.sort_unstable();
        info!(
            key_id = %key.key_id_hex(),
            trusted_keys = validator.verifier().trusted_key_count(),
            providers = ?enabled,
            oidc_rules = evaluator.oidc_rules().len(),
            ttl_secs = ttl,
            "Auth service ready"
        );

        Ok(Self {
            verifiers,
            evaluator,
            issuer,
            validator,
            authorizer,
            verify_timeout: transport.timeout(),
        })
    }

    /// Providers accepting assertions, in no particular order.
    pub fn enabled_providers(&self) -> impl Iterator<Item = ProviderKind> + '_ {
        self.verifiers.keys().copied()
    }

    /// Whether assertions for `provider` are accepted.
    #[must_use]
    pub fn is_enabled(&self, provider: ProviderKind) -> bool {
        self.verifiers.contains_key(&provider)
    }

    /// Public half of the current signing key.
    #[must_use]
    pub fn public_key(&self) -> PublicKey {
        self.issuer.public_key()
    }

    /// The credential validator, for callers that cache verified credentials.
    #[must_use]
    pub fn validator(&self) -> &CredentialValidator {
        &self.validator
    }

    /// Grants a claim set would receive, without issuing anything.
    #[must_use]
    pub fn evaluate(&self, claims: &ClaimSet) -> GrantSet {
        self.evaluator.evaluate(claims)
    }

    /// Verify an assertion and issue a credential for it.
    ///
    /// # Errors
    ///
    /// - [`AuthError::ProviderDisabled`] when the assertion's provider is
    ///   not enabled
    /// - [`AuthError::MalformedAssertion`] for empty or oversized input
    /// - [`AuthError::IdentityVerificationFailed`] when the provider rejects
    ///   the assertion or cannot be reached in time
    pub async fn issue_credential(&self, assertion: &IdentityAssertion) -> AuthResult<IssuedCredential> {
        self.issue_credential_with_cancel(assertion, &CancellationToken::new()).await
    }

    /// As [`AuthService::issue_credential`], abandoning verification when
    /// `cancel` fires.
    ///
    /// # Errors
    ///
    /// See [`AuthService::issue_credential`]; cancellation surfaces as a
    /// retryable [`AuthError::IdentityVerificationFailed`].
    pub async fn issue_credential_with_cancel(
        &self,
        assertion: &IdentityAssertion,
        cancel: &CancellationToken,
    ) -> AuthResult<IssuedCredential> {
        let provider = assertion.provider();
        let ctx = RequestContext::new(COMPONENT)
            .with_operation("issue_credential")
            .with_provider(provider);
        self.run_issuance(assertion, cancel, &ctx)
            .instrument(ctx.span())
            .await
    }

    /// Issue an anonymous credential.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::ProviderDisabled`] unless anonymous credentials
    /// are enabled.
    pub async fn issue_anonymous(&self) -> AuthResult<IssuedCredential> {
        self.issue_credential(&IdentityAssertion::Anonymous).await
    }

    async fn run_issuance(
        &self,
        assertion: &IdentityAssertion,
        cancel: &CancellationToken,
        ctx: &RequestContext,
    ) -> AuthResult<IssuedCredential> {
        let provider = assertion.provider();
        let mut flow = IssuanceFlow::new(provider);

        let Some(verifier) = self.verifiers.get(&provider) else {
            warn!(provider = %provider, "Assertion for a disabled provider");
            return Err(flow.reject(AuthError::ProviderDisabled(provider)));
        };

        flow.advance(FlowState::Verifying)?;
        let verification = ctx.child("identity").with_operation("verify");
        let claims = match verifier
            .verify(assertion, self.verify_timeout, cancel)
            .instrument(verification.span())
            .await
        {
            Ok(claims) => claims,
            Err(e) => return Err(flow.reject(e.into())),
        };
        flow.advance(FlowState::Verified)?;

        let grants = self.evaluator.evaluate(&claims);
        flow.advance(FlowState::GrantsComputed)?;

        let grant_count = grants.len();
        let credential = match self.issuer.issue(claims.subject(), claims.provider(), grants) {
            Ok(credential) => credential,
            Err(e) => return Err(flow.reject(e.into())),
        };
        let token = credential.encode();
        flow.advance(FlowState::CredentialIssued)?;

        info!(
            subject = %claims.subject(),
            provider = %provider,
            grants = grant_count,
            credential_id = %credential.id,
            fingerprint = %ContentHash::credential_fingerprint(&token).short_hex(),
            expires_at = %credential.expires_at,
            elapsed_ms = ctx.elapsed_ms(),
            "Credential issued"
        );
        Ok(IssuedCredential { token, credential })
    }

    /// Verify a credential's signature and expiry.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::MalformedCredential`],
    /// [`AuthError::SignatureInvalid`] or [`AuthError::CredentialExpired`].
    pub fn validate(&self, token: &str) -> AuthResult<VerifiedCredential> {
        self.validator.validate(token).map_err(|e| {
            warn!(
                fingerprint = %ContentHash::credential_fingerprint(token).short_hex(),
                error = %e,
                "Credential rejected"
            );
            AuthError::from(e)
        })
    }

    /// Validate `token` and check it may exercise `capability` on
    /// `namespace`. Returns the grant that allowed the request.
    ///
    /// # Errors
    ///
    /// Any [`AuthService::validate`] error, [`AuthError::InvalidInput`] for
    /// an invalid namespace, or [`AuthError::AuthorizationDenied`].
    pub fn authorize(
        &self,
        token: &str,
        namespace: &str,
        capability: Capability,
    ) -> AuthResult<PermissionGrant> {
        let _guard = RequestGuard::new(RequestContext::new(COMPONENT).with_operation("authorize"));
        let credential = self.validate(token)?;
        self.authorize_verified(&credential, namespace, capability)
    }

    /// Authorization for an already validated credential.
    ///
    /// # Errors
    ///
    /// [`AuthError::InvalidInput`] for an invalid namespace, or
    /// [`AuthError::AuthorizationDenied`].
    pub fn authorize_verified(
        &self,
        credential: &VerifiedCredential,
        namespace: &str,
        capability: Capability,
    ) -> AuthResult<PermissionGrant> {
        self.authorizer
            .authorize(credential, namespace, capability)
            .map_err(AuthError::from)
    }
}

fn build_verifiers(
    config: &Config,
    transport: &HttpSettings,
) -> AuthResult<HashMap<ProviderKind, IdentityVerifier>> {
    let mut verifiers = HashMap::new();
    if config.github.enabled {
        verifiers.insert(ProviderKind::Github, github_verifier(&config.github, transport)?);
    }
    if config.github_oidc.enabled {
        verifiers.insert(
            ProviderKind::GithubOidc,
            github_oidc_verifier(&config.github_oidc, transport)?,
        );
    }
    if config.oidc.enabled {
        verifiers.insert(ProviderKind::Oidc, oidc_verifier(&config.oidc, transport)?);
    }
    if config.anonymous.enabled {
        verifiers.insert(ProviderKind::Anonymous, IdentityVerifier::Anonymous);
    }
    Ok(verifiers)
}

fn github_verifier(section: &GithubSection, transport: &HttpSettings) -> AuthResult<IdentityVerifier> {
    let settings = GithubSettings {
        client_id: section.client_id.clone(),
        client_secret: section.client_secret.clone(),
        oauth_url: section.oauth_url.clone(),
        api_url: section.api_url.clone(),
        include_orgs: section.include_orgs,
    };
    Ok(IdentityVerifier::Github(GithubVerifier::new(settings, transport)?))
}

fn github_oidc_verifier(
    section: &GithubOidcSection,
    transport: &HttpSettings,
) -> AuthResult<IdentityVerifier> {
    let mut settings = OidcSettings::new(section.issuer.clone(), section.audience.clone());
    settings.jwks_url = non_empty(&section.jwks_url);
    Ok(IdentityVerifier::GithubOidc(GithubOidcVerifier::new(settings, transport)?))
}

fn oidc_verifier(section: &OidcSection, transport: &HttpSettings) -> AuthResult<IdentityVerifier> {
    let settings = OidcSettings {
        issuer: section.issuer.clone(),
        audience: section.client_id.clone(),
        jwks_url: non_empty(&section.jwks_url),
        extra_claims: section.extra_claims.clone(),
        required_claims: section.required_claims.clone(),
        clock_skew_secs: section.clock_skew_secs,
        jwks_refresh_secs: section.jwks_refresh_secs,
        jwks_min_refresh_secs: section.jwks_min_refresh_secs,
    };
    Ok(IdentityVerifier::Oidc(OidcVerifier::new(settings, transport)?))
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
