//! Claim set to grant set evaluation.
//!
//! Evaluation is a pure function of the claim set and the configuration
//! loaded at startup. It never fails: a claim set that earns nothing gets
//! an empty grant set.

use tracing::{debug, warn};
use warden_capabilities::{GrantSet, Namespace, NamespacePattern, PermissionGrant};
use warden_core::{Capability, ClaimSet, ProviderKind};

use crate::error::RuleConfigResult;
use crate::rule::RuleSet;
use crate::template::NamespaceTemplate;

/// Default owner template for the repository-hosting provider.
pub const DEFAULT_GITHUB_TEMPLATE: &str = "github.com/{owner}";

/// Claim carrying the repository owner in CI identity tokens.
pub const REPOSITORY_OWNER_CLAIM: &str = "repository_owner";

/// Maps verified claim sets to grants.
#[derive(Debug, Clone)]
pub struct RuleEvaluator {
    github_template: NamespaceTemplate,
    github_oidc_template: NamespaceTemplate,
    oidc_rules: RuleSet,
    anonymous_namespace: Option<Namespace>,
}

impl RuleEvaluator {
    /// Create an evaluator.
    ///
    /// # Errors
    ///
    /// Returns a [`crate::RuleConfigError::InvalidTemplate`] if either owner
    /// template is invalid.
    pub fn new(
        github_template: &str,
        github_oidc_template: &str,
        oidc_rules: RuleSet,
        anonymous_namespace: Option<Namespace>,
    ) -> RuleConfigResult<Self> {
        Ok(Self {
            github_template: NamespaceTemplate::parse_owner(github_template)?,
            github_oidc_template: NamespaceTemplate::parse_owner(github_oidc_template)?,
            oidc_rules,
            anonymous_namespace,
        })
    }

    /// OIDC rules in effect.
    #[must_use]
    pub fn oidc_rules(&self) -> &RuleSet {
        &self.oidc_rules
    }

    /// Compute grants for a claim set.
    #[must_use]
    pub fn evaluate(&self, claims: &ClaimSet) -> GrantSet {
        let grants = match claims.provider() {
            ProviderKind::Github => self.github_grants(claims),
            ProviderKind::GithubOidc => self.github_oidc_grants(claims),
            ProviderKind::Oidc => self.oidc_grants(claims),
            ProviderKind::Anonymous => self.anonymous_grants(),
        };
        debug!(
            subject = claims.subject(),
            provider = %claims.provider(),
            grants = grants.len(),
            "Evaluated permission rules"
        );
        grants
    }

    fn github_grants(&self, claims: &ClaimSet) -> GrantSet {
        let mut grants = GrantSet::new();

        let Some(login) = claims.get_str("login") else {
            warn!(subject = claims.subject(), "GitHub claim set has no login");
            return grants;
        };

        let orgs = claims.get_list("orgs").unwrap_or_default();
        let owners = std::iter::once((login, format!("github:user:{login}")))
            .chain(orgs.iter().map(|org| (org.as_str(), format!("github:org:{org}"))));

        for (owner, provenance) in owners {
            let Some(prefix) = self.github_template.render_owner(owner) else {
                continue;
            };
            for capability in [Capability::Edit, Capability::Publish] {
                grants.insert(PermissionGrant::new(
                    capability,
                    NamespacePattern::prefix(prefix.clone()),
                    provenance.clone(),
                ));
            }
        }
        grants
    }

    fn github_oidc_grants(&self, claims: &ClaimSet) -> GrantSet {
        let mut grants = GrantSet::new();
        let Some(owner) = claims.get_str(REPOSITORY_OWNER_CLAIM) else {
            warn!(subject = claims.subject(), "CI token has no repository_owner claim");
            return grants;
        };
        if let Some(prefix) = self.github_oidc_template.render_owner(owner) {
            grants.insert(PermissionGrant::new(
                Capability::Publish,
                NamespacePattern::prefix(prefix),
                format!("github-oidc:owner:{owner}"),
            ));
        }
        grants
    }

    fn oidc_grants(&self, claims: &ClaimSet) -> GrantSet {
        let mut grants = GrantSet::new();
        for rule in self.oidc_rules.rules() {
            let produced = rule.grants(claims);
            if !produced.is_empty() {
                debug!(rule = rule.id(), grants = produced.len(), "Rule matched");
            }
            grants.extend(produced);
        }
        grants
    }

    fn anonymous_grants(&self) -> GrantSet {
        self.anonymous_namespace
            .iter()
            .map(|ns| {
                PermissionGrant::new(
                    Capability::Publish,
                    NamespacePattern::prefix(ns.clone()),
                    "anonymous",
                )
            })
            .collect()
    }
}
