//! Configuration types.
//!
//! Every section implements [`Default`] with the same values as the embedded
//! `defaults.toml`, so a bare `[section]` header yields a usable section.
//! Optional strings use the empty string for "unset" so that every key has a
//! typed default for environment overrides.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use warden_core::Capability;
use warden_policy::{RuleConfigResult, RuleSpec};

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Credential lifetime.
    pub credentials: CredentialsSection,
    /// Signing key material.
    pub signing: SigningSection,
    /// Outbound provider calls.
    pub http: HttpSection,
    /// Repository-hosting OAuth provider.
    pub github: GithubSection,
    /// Repository-hosting CI identity tokens.
    pub github_oidc: GithubOidcSection,
    /// Generic OIDC issuer and permission rules.
    pub oidc: OidcSection,
    /// Anonymous credentials.
    pub anonymous: AnonymousSection,
    /// Log level, format and directives.
    pub logging: LoggingSection,
}

// ---------------------------------------------------------------------------
// CredentialsSection
// ---------------------------------------------------------------------------

/// Credential issuance settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialsSection {
    /// Lifetime of issued credentials in seconds (1..=3600).
    pub ttl_secs: u64,
}

impl Default for CredentialsSection {
    fn default() -> Self {
        Self { ttl_secs: 300 }
    }
}

// ---------------------------------------------------------------------------
// SigningSection
// ---------------------------------------------------------------------------

/// Ed25519 signing key material.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SigningSection {
    /// Hex-encoded 32-byte seed. Prefer `private_key_file` or `${VAR}`.
    #[serde(skip_serializing)]
    pub private_key: String,
    /// Path to a key file (raw 32 bytes or hex).
    pub private_key_file: String,
    /// Hex public keys of retired signing keys still accepted for
    /// validation.
    pub previous_public_keys: Vec<String>,
}

impl SigningSection {
    /// Whether any signing key source is configured.
    #[must_use]
    pub fn has_key(&self) -> bool {
        !self.private_key.trim().is_empty() || !self.private_key_file.trim().is_empty()
    }
}

impl std::fmt::Debug for SigningSection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningSection")
            .field("has_private_key", &!self.private_key.is_empty())
            .field("private_key_file", &self.private_key_file)
            .field("previous_public_keys", &self.previous_public_keys)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// HttpSection
// ---------------------------------------------------------------------------

/// Outbound HTTP settings shared by every provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpSection {
    /// Per-call timeout in seconds (1..=60).
    pub timeout_secs: u64,
    /// User agent sent to providers.
    pub user_agent: String,
}

impl Default for HttpSection {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            user_agent: "warden".to_owned(),
        }
    }
}

// ---------------------------------------------------------------------------
// GithubSection
// ---------------------------------------------------------------------------

/// Repository-hosting OAuth application.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GithubSection {
    /// Accept `github` assertions.
    pub enabled: bool,
    /// OAuth client id.
    pub client_id: String,
    /// OAuth client secret.
    #[serde(skip_serializing)]
    pub client_secret: String,
    /// Base of the OAuth endpoints.
    pub oauth_url: String,
    /// Base of the REST API.
    pub api_url: String,
    /// Owner template; `{owner}` is the login or organization.
    pub namespace_template: String,
    /// Grant organization namespaces as well as the user's own. At most
    /// ten pages of 100 memberships are read.
    pub include_orgs: bool,
}

impl Default for GithubSection {
    fn default() -> Self {
        Self {
            enabled: false,
            client_id: String::new(),
            client_secret: String::new(),
            oauth_url: "https://github.com".to_owned(),
            api_url: "https://api.github.com".to_owned(),
            namespace_template: "github.com/{owner}".to_owned(),
            include_orgs: true,
        }
    }
}

impl std::fmt::Debug for GithubSection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GithubSection")
            .field("enabled", &self.enabled)
            .field("client_id", &self.client_id)
            .field("has_client_secret", &!self.client_secret.is_empty())
            .field("oauth_url", &self.oauth_url)
            .field("api_url", &self.api_url)
            .field("namespace_template", &self.namespace_template)
            .field("include_orgs", &self.include_orgs)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// GithubOidcSection
// ---------------------------------------------------------------------------

/// Repository-hosting CI identity tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GithubOidcSection {
    /// Accept `github-oidc` assertions.
    pub enabled: bool,
    /// Expected token issuer.
    pub issuer: String,
    /// Expected token audience.
    pub audience: String,
    /// Key set URL; empty means discovery.
    pub jwks_url: String,
    /// Owner template; `{owner}` is the `repository_owner` claim.
    pub namespace_template: String,
}

impl Default for GithubOidcSection {
    fn default() -> Self {
        Self {
            enabled: false,
            issuer: "https://token.actions.githubusercontent.com".to_owned(),
            audience: String::new(),
            jwks_url: String::new(),
            namespace_template: "github.com/{owner}".to_owned(),
        }
    }
}

// ---------------------------------------------------------------------------
// OidcSection
// ---------------------------------------------------------------------------

/// Generic OIDC issuer and its permission rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OidcSection {
    /// Accept `oidc` assertions.
    pub enabled: bool,
    /// Expected issuer (and discovery base).
    pub issuer: String,
    /// Client id, checked against `aud`.
    pub client_id: String,
    /// Key set URL; empty means discovery.
    pub jwks_url: String,
    /// Dotted claim paths flattened into top-level claims
    /// (e.g. `realm_access.roles`).
    pub extra_claims: Vec<String>,
    /// Alternatives of claim/value pairs; a token must match one.
    pub required_claims: Vec<Map<String, Value>>,
    /// Permission rules (`[[oidc.rules]]`).
    pub rules: Vec<RuleSpec>,
    /// Additional rules as a JSON array.
    pub rules_json: String,
    /// Comma-separated patterns granted `edit` to every admitted token.
    pub edit_permissions: String,
    /// Comma-separated patterns granted `publish` to every admitted token.
    pub publish_permissions: String,
    /// Tolerance for `exp` and `nbf`.
    pub clock_skew_secs: u64,
    /// Key set refresh interval.
    pub jwks_refresh_secs: u64,
    /// Minimum spacing of refreshes forced by an unknown `kid`.
    pub jwks_min_refresh_secs: u64,
}

impl Default for OidcSection {
    fn default() -> Self {
        Self {
            enabled: false,
            issuer: String::new(),
            client_id: String::new(),
            jwks_url: String::new(),
            extra_claims: Vec::new(),
            required_claims: Vec::new(),
            rules: Vec::new(),
            rules_json: String::new(),
            edit_permissions: String::new(),
            publish_permissions: String::new(),
            clock_skew_secs: 60,
            jwks_refresh_secs: 3600,
            jwks_min_refresh_secs: 60,
        }
    }
}

impl OidcSection {
    /// Every configured rule in evaluation order: `rules`, then
    /// `rules_json`, then the flat `edit_permissions` and
    /// `publish_permissions` lists.
    ///
    /// # Errors
    ///
    /// Returns a [`warden_policy::RuleConfigError`] if `rules_json` is not
    /// a valid rule array.
    pub fn rule_specs(&self) -> RuleConfigResult<Vec<RuleSpec>> {
        let mut specs = self.rules.clone();
        if !self.rules_json.trim().is_empty() {
            specs.extend(RuleSpec::parse_json(&self.rules_json)?);
        }
        for (capability, list) in [
            (Capability::Edit, &self.edit_permissions),
            (Capability::Publish, &self.publish_permissions),
        ] {
            let patterns = list.split(',').map(str::trim).filter(|p| !p.is_empty());
            for (index, pattern) in patterns.enumerate() {
                specs.push(RuleSpec::legacy(capability, index.saturating_add(1), pattern));
            }
        }
        Ok(specs)
    }
}

// ---------------------------------------------------------------------------
// AnonymousSection
// ---------------------------------------------------------------------------

/// Anonymous credentials and anonymous mutation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnonymousSection {
    /// Issue credentials without an identity.
    pub enabled: bool,
    /// Namespace granted to anonymous credentials (`publish` on `ns/*`).
    pub namespace: String,
    /// Let any authenticated credential publish within `namespace`.
    pub allow_mutation: bool,
}

// ---------------------------------------------------------------------------
// LoggingSection
// ---------------------------------------------------------------------------

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Global level (`trace`, `debug`, `info`, `warn`, `error`).
    pub level: String,
    /// Output format: `pretty`, `compact`, `json` or `full`.
    pub format: String,
    /// Extra filter directives (e.g. `["warden_identity=debug"]`).
    pub directives: Vec<String>,
    /// Where logs go: `stdout`, `stderr` or `file`.
    pub target: String,
    /// Log directory when `target = "file"`.
    pub directory: String,
    /// File rotation: `daily`, `hourly` or `never`.
    pub rotation: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            format: "compact".to_owned(),
            directives: Vec::new(),
            target: "stderr".to_owned(),
            directory: String::new(),
            rotation: "daily".to_owned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signing_debug_redacts_key() {
        let signing = SigningSection {
            private_key: "9d61b19deffd5a60ba844af492ec2cc44449c5697b326919703bac031cae7f60".to_owned(),
            ..SigningSection::default()
        };
        let debug = format!("{signing:?}");
        assert!(!debug.contains("9d61b1"));
        assert!(debug.contains("has_private_key: true"));
    }

    #[test]
    fn test_github_secret_never_serialized() {
        let github = GithubSection {
            client_secret: "hunter2".to_owned(),
            ..GithubSection::default()
        };
        assert!(!format!("{github:?}").contains("hunter2"));
        let toml = toml::to_string(&github).unwrap();
        assert!(!toml.contains("hunter2"));
        assert!(!toml.contains("client_secret"));
    }

    #[test]
    fn test_rule_specs_order_and_legacy_ids() {
        let oidc = OidcSection {
            rules_json: r#"[{"id": "from-json", "capability": "edit", "namespace": "*"}]"#.to_owned(),
            edit_permissions: "corp/*".to_owned(),
            publish_permissions: "corp/*, , team/*".to_owned(),
            ..OidcSection::default()
        };
        let ids: Vec<String> = oidc.rule_specs().unwrap().into_iter().map(|s| s.id).collect();
        assert_eq!(ids, ["from-json", "legacy-edit-1", "legacy-publish-1", "legacy-publish-2"]);
    }

    #[test]
    fn test_rule_specs_bad_json() {
        let oidc = OidcSection {
            rules_json: "[{".to_owned(),
            ..OidcSection::default()
        };
        assert!(oidc.rule_specs().is_err());
    }
}
