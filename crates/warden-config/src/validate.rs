//! Post-merge configuration validation.
//!
//! Everything that can be checked without network access is checked here,
//! so a bad rule or template aborts startup instead of failing a request.

use url::Url;
use warden_capabilities::{MAX_TTL_SECS, Namespace};
use warden_crypto::PublicKey;
use warden_policy::{NamespaceTemplate, RuleSet};

use crate::error::{ConfigError, ConfigResult};
use crate::types::{
    AnonymousSection, Config, CredentialsSection, GithubOidcSection, GithubSection, HttpSection,
    LoggingSection, OidcSection, SigningSection,
};

/// Largest accepted per-call timeout.
const MAX_HTTP_TIMEOUT_SECS: u64 = 60;

/// Largest accepted clock skew tolerance.
const MAX_CLOCK_SKEW_SECS: u64 = 300;

/// Validate a fully merged and deserialized configuration.
///
/// # Errors
///
/// Returns the first [`ConfigError::ValidationError`] found.
pub fn validate(config: &Config) -> ConfigResult<()> {
    validate_credentials(&config.credentials)?;
    validate_signing(&config.signing)?;
    validate_http(&config.http)?;
    validate_github(&config.github)?;
    validate_github_oidc(&config.github_oidc)?;
    validate_oidc(&config.oidc)?;
    validate_anonymous(&config.anonymous)?;
    validate_logging(&config.logging)?;
    Ok(())
}

fn validate_credentials(c: &CredentialsSection) -> ConfigResult<()> {
    let max = u64::try_from(MAX_TTL_SECS).unwrap_or(u64::MAX);
    if c.ttl_secs == 0 || c.ttl_secs > max {
        return Err(ConfigError::invalid(
            "credentials.ttl_secs",
            format!("must be between 1 and {max}, got {}", c.ttl_secs),
        ));
    }
    Ok(())
}

fn validate_signing(s: &SigningSection) -> ConfigResult<()> {
    if !s.private_key.trim().is_empty() && !s.private_key_file.trim().is_empty() {
        return Err(ConfigError::invalid(
            "signing",
            "set either private_key or private_key_file, not both",
        ));
    }
    for (index, key) in s.previous_public_keys.iter().enumerate() {
        PublicKey::from_hex(key).map_err(|e| {
            ConfigError::invalid(format!("signing.previous_public_keys[{index}]"), e.to_string())
        })?;
    }
    Ok(())
}

fn validate_http(h: &HttpSection) -> ConfigResult<()> {
    if h.timeout_secs == 0 || h.timeout_secs > MAX_HTTP_TIMEOUT_SECS {
        return Err(ConfigError::invalid(
            "http.timeout_secs",
            format!("must be between 1 and {MAX_HTTP_TIMEOUT_SECS}, got {}", h.timeout_secs),
        ));
    }
    if h.user_agent.trim().is_empty() {
        return Err(ConfigError::invalid("http.user_agent", "must not be empty"));
    }
    Ok(())
}

fn validate_github(g: &GithubSection) -> ConfigResult<()> {
    validate_owner_template("github.namespace_template", &g.namespace_template)?;
    if !g.enabled {
        return Ok(());
    }
    require("github.client_id", &g.client_id)?;
    require("github.client_secret", &g.client_secret)?;
    validate_url("github.oauth_url", &g.oauth_url)?;
    validate_url("github.api_url", &g.api_url)
}

fn validate_github_oidc(g: &GithubOidcSection) -> ConfigResult<()> {
    validate_owner_template("github_oidc.namespace_template", &g.namespace_template)?;
    if !g.enabled {
        return Ok(());
    }
    validate_url("github_oidc.issuer", &g.issuer)?;
    require("github_oidc.audience", &g.audience)?;
    if !g.jwks_url.is_empty() {
        validate_url("github_oidc.jwks_url", &g.jwks_url)?;
    }
    Ok(())
}

fn validate_oidc(o: &OidcSection) -> ConfigResult<()> {
    // Rules compile even while the provider is disabled.
    let specs = o
        .rule_specs()
        .map_err(|e| ConfigError::invalid("oidc.rules_json", e.to_string()))?;
    RuleSet::compile(&specs).map_err(|e| ConfigError::invalid("oidc.rules", e.to_string()))?;

    if o.clock_skew_secs > MAX_CLOCK_SKEW_SECS {
        return Err(ConfigError::invalid(
            "oidc.clock_skew_secs",
            format!("must be at most {MAX_CLOCK_SKEW_SECS}, got {}", o.clock_skew_secs),
        ));
    }
    if o.jwks_refresh_secs == 0 {
        return Err(ConfigError::invalid("oidc.jwks_refresh_secs", "must be positive"));
    }
    if o.jwks_min_refresh_secs > o.jwks_refresh_secs {
        return Err(ConfigError::invalid(
            "oidc.jwks_min_refresh_secs",
            "must not exceed jwks_refresh_secs",
        ));
    }
    for (index, alternative) in o.required_claims.iter().enumerate() {
        if alternative.is_empty() {
            return Err(ConfigError::invalid(
                format!("oidc.required_claims[{index}]"),
                "an empty alternative would admit every token",
            ));
        }
    }

    if !o.enabled {
        return Ok(());
    }
    validate_url("oidc.issuer", &o.issuer)?;
    require("oidc.client_id", &o.client_id)?;
    if !o.jwks_url.is_empty() {
        validate_url("oidc.jwks_url", &o.jwks_url)?;
    }
    Ok(())
}

fn validate_anonymous(a: &AnonymousSection) -> ConfigResult<()> {
    if a.namespace.is_empty() {
        if a.enabled || a.allow_mutation {
            return Err(ConfigError::invalid(
                "anonymous.namespace",
                "required when anonymous credentials or anonymous mutation are enabled",
            ));
        }
        return Ok(());
    }
    Namespace::new(a.namespace.as_str())
        .map(|_| ())
        .map_err(|e| ConfigError::invalid("anonymous.namespace", e.to_string()))
}

fn validate_logging(l: &LoggingSection) -> ConfigResult<()> {
    if !matches!(l.level.as_str(), "trace" | "debug" | "info" | "warn" | "error") {
        return Err(ConfigError::invalid(
            "logging.level",
            format!("unknown level '{}'; expected trace, debug, info, warn or error", l.level),
        ));
    }
    if !matches!(l.format.as_str(), "pretty" | "compact" | "json" | "full") {
        return Err(ConfigError::invalid(
            "logging.format",
            format!("unknown format '{}'; expected pretty, compact, json or full", l.format),
        ));
    }
    match l.target.as_str() {
        "stdout" | "stderr" => {},
        "file" if l.directory.trim().is_empty() => {
            return Err(ConfigError::invalid("logging.directory", "required when target is 'file'"));
        },
        "file" => {},
        other => {
            return Err(ConfigError::invalid(
                "logging.target",
                format!("unknown target '{other}'; expected stdout, stderr or file"),
            ));
        },
    }
    if !matches!(l.rotation.as_str(), "daily" | "hourly" | "never") {
        return Err(ConfigError::invalid(
            "logging.rotation",
            format!("unknown rotation '{}'; expected daily, hourly or never", l.rotation),
        ));
    }
    Ok(())
}

fn validate_owner_template(field: &str, template: &str) -> ConfigResult<()> {
    NamespaceTemplate::parse_owner(template)
        .map(|_| ())
        .map_err(|e| ConfigError::invalid(field, e.to_string()))
}

fn validate_url(field: &str, raw: &str) -> ConfigResult<()> {
    let url = Url::parse(raw).map_err(|e| ConfigError::invalid(field, format!("invalid URL '{raw}': {e}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::invalid(field, "URL must use http or https"));
    }
    Ok(())
}

fn require(field: &str, value: &str) -> ConfigResult<()> {
    if value.trim().is_empty() {
        return Err(ConfigError::invalid(field, "must be set when the provider is enabled"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field_of(result: ConfigResult<()>) -> String {
        match result {
            Err(ConfigError::ValidationError { field, .. }) => field,
            other => panic!("expected a validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_defaults_are_valid() {
        assert!(validate(&Config::default()).is_ok());
    }

    #[test]
    fn test_ttl_bounds() {
        let mut config = Config::default();
        config.credentials.ttl_secs = 0;
        assert_eq!(field_of(validate(&config)), "credentials.ttl_secs");
        config.credentials.ttl_secs = 3600;
        assert!(validate(&config).is_ok());
        config.credentials.ttl_secs = 3601;
        assert_eq!(field_of(validate(&config)), "credentials.ttl_secs");
    }

    #[test]
    fn test_signing_sources_exclusive() {
        let mut config = Config::default();
        config.signing.private_key = "00".repeat(32);
        config.signing.private_key_file = "/etc/warden/key".to_owned();
        assert_eq!(field_of(validate(&config)), "signing");
    }

    #[test]
    fn test_previous_keys_must_be_hex_keys() {
        let mut config = Config::default();
        config.signing.previous_public_keys = vec!["zz".to_owned()];
        assert_eq!(field_of(validate(&config)), "signing.previous_public_keys[0]");
    }

    #[test]
    fn test_enabled_github_requires_credentials() {
        let mut config = Config::default();
        config.github.enabled = true;
        assert_eq!(field_of(validate(&config)), "github.client_id");
        config.github.client_id = "id".to_owned();
        config.github.client_secret = "secret".to_owned();
        assert!(validate(&config).is_ok());
        config.github.namespace_template = "github.com/{repo}".to_owned();
        assert_eq!(field_of(validate(&config)), "github.namespace_template");
    }

    #[test]
    fn test_bad_rules_rejected() {
        let mut config = Config::default();
        config.oidc.rules_json = r#"[{"id": "x", "capability": "delete", "namespace": "*"}]"#.to_owned();
        assert_eq!(field_of(validate(&config)), "oidc.rules");

        let mut config = Config::default();
        config.oidc.rules_json = "not json".to_owned();
        assert_eq!(field_of(validate(&config)), "oidc.rules_json");

        let mut config = Config::default();
        config.oidc.publish_permissions = "acme*".to_owned();
        assert_eq!(field_of(validate(&config)), "oidc.rules");
    }

    #[test]
    fn test_anonymous_namespace() {
        let mut config = Config::default();
        config.anonymous.allow_mutation = true;
        assert_eq!(field_of(validate(&config)), "anonymous.namespace");
        config.anonymous.namespace = "io.example.anonymous".to_owned();
        assert!(validate(&config).is_ok());
        config.anonymous.namespace = "bad ns".to_owned();
        assert_eq!(field_of(validate(&config)), "anonymous.namespace");
    }

    #[test]
    fn test_logging_values() {
        let mut config = Config::default();
        config.logging.format = "xml".to_owned();
        assert_eq!(field_of(validate(&config)), "logging.format");
    }

    #[test]
    fn test_logging_file_target() {
        let mut config = Config::default();
        config.logging.target = "file".to_owned();
        assert_eq!(field_of(validate(&config)), "logging.directory");

        config.logging.directory = "/var/log/warden".to_owned();
        assert!(validate(&config).is_ok());

        config.logging.rotation = "weekly".to_owned();
        assert_eq!(field_of(validate(&config)), "logging.rotation");

        config.logging.rotation = "never".to_owned();
        config.logging.target = "syslog".to_owned();
        assert_eq!(field_of(validate(&config)), "logging.target");
    }
}
