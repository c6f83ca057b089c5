//! Declarative permission rules for OIDC claim sets.
//!
//! A rule is a conjunction of claim checks plus a capability and namespace
//! template. Rules are loaded once at startup from TOML or JSON; every
//! satisfied rule contributes its grants.
//!
//! ```json
//! [
//!   {
//!     "id": "admins-edit-all",
//!     "capability": "edit",
//!     "namespace": "*",
//!     "checks": [{ "claim": "groups", "op": "contains", "value": "admins" }]
//!   }
//! ]
//! ```

use std::collections::HashSet;

use globset::{Glob, GlobMatcher};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use warden_capabilities::PermissionGrant;
use warden_core::{Capability, ClaimSet, ClaimValue};

use crate::error::{RuleConfigError, RuleConfigResult};
use crate::template::NamespaceTemplate;

/// Raw rule as written in configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleSpec {
    /// Unique rule id, used as grant provenance.
    pub id: String,
    /// Capability granted when the rule holds.
    pub capability: String,
    /// Namespace pattern template.
    pub namespace: String,
    /// Checks that must all hold. Empty means the rule always holds.
    #[serde(default)]
    pub checks: Vec<CheckSpec>,
}

/// Raw claim check as written in configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CheckSpec {
    /// Claim name (dotted names refer to flattened claims).
    pub claim: String,
    /// Operator: `equals`, `contains` or `matches`.
    pub op: String,
    /// Operand.
    pub value: Value,
}

impl RuleSpec {
    /// A check-free rule granting `capability` on a fixed `pattern`, as
    /// produced from the flat `edit_permissions`/`publish_permissions` lists.
    ///
    /// `index` is 1-based.
    #[must_use]
    pub fn legacy(capability: Capability, index: usize, pattern: &str) -> Self {
        Self {
            id: format!("legacy-{capability}-{index}"),
            capability: capability.to_string(),
            namespace: pattern.to_string(),
            checks: Vec::new(),
        }
    }

    /// Parse a JSON array of rules.
    ///
    /// # Errors
    ///
    /// Returns [`RuleConfigError::InvalidJson`] if the text is not a JSON
    /// array of rule objects.
    pub fn parse_json(text: &str) -> RuleConfigResult<Vec<Self>> {
        serde_json::from_str(text).map_err(|e| RuleConfigError::InvalidJson(e.to_string()))
    }
}

/// A compiled claim check.
#[derive(Debug, Clone)]
pub enum ClaimCheck {
    /// Claim equals a scalar value.
    Equals {
        /// Claim name.
        claim: String,
        /// Expected value (string, number or bool).
        value: ClaimValue,
    },
    /// List claim contains the value, or string claim equals it.
    Contains {
        /// Claim name.
        claim: String,
        /// Expected element.
        value: String,
    },
    /// String claim, or any element of a list claim, matches a glob.
    Matches {
        /// Claim name.
        claim: String,
        /// Glob source.
        pattern: String,
        /// Compiled glob.
        matcher: GlobMatcher,
    },
}

impl ClaimCheck {
    fn compile(rule: &str, spec: &CheckSpec) -> RuleConfigResult<Self> {
        let invalid = |reason: &str| RuleConfigError::InvalidCheck {
            rule: rule.to_string(),
            reason: format!("check on '{}': {reason}", spec.claim),
        };
        if spec.claim.is_empty() {
            return Err(invalid("empty claim name"));
        }
        let claim = spec.claim.clone();

        match spec.op.as_str() {
            "equals" => {
                let value = match &spec.value {
                    Value::String(_) | Value::Number(_) | Value::Bool(_) => {
                        ClaimValue::from_json(&spec.value)
                            .ok_or_else(|| invalid("unsupported value"))?
                    },
                    _ => return Err(invalid("equals needs a string, number or bool value")),
                };
                Ok(Self::Equals { claim, value })
            },
            "contains" => {
                let value = spec
                    .value
                    .as_str()
                    .ok_or_else(|| invalid("contains needs a string value"))?
                    .to_string();
                Ok(Self::Contains { claim, value })
            },
            "matches" => {
                let pattern = spec
                    .value
                    .as_str()
                    .ok_or_else(|| invalid("matches needs a glob string"))?
                    .to_string();
                let matcher = Glob::new(&pattern)
                    .map_err(|e| RuleConfigError::InvalidGlob {
                        rule: rule.to_string(),
                        pattern: pattern.clone(),
                        reason: e.kind().to_string(),
                    })?
                    .compile_matcher();
                Ok(Self::Matches {
                    claim,
                    pattern,
                    matcher,
                })
            },
            other => Err(RuleConfigError::UnknownOperator {
                rule: rule.to_string(),
                value: other.to_string(),
            }),
        }
    }

    /// Claim the check reads.
    #[must_use]
    pub fn claim(&self) -> &str {
        match self {
            Self::Equals { claim, .. } | Self::Contains { claim, .. } | Self::Matches { claim, .. } => {
                claim
            },
        }
    }

    /// Whether the check holds for `claims`. A missing claim never holds.
    #[must_use]
    pub fn holds(&self, claims: &ClaimSet) -> bool {
        let Some(actual) = claims.get(self.claim()) else {
            return false;
        };
        match self {
            Self::Equals { value, .. } => scalar_equals(actual, value),
            Self::Contains { value, .. } => match actual {
                ClaimValue::List(items) => items.iter().any(|item| item == value),
                ClaimValue::String(s) => s == value,
                ClaimValue::Number(_) | ClaimValue::Bool(_) => false,
            },
            Self::Matches { matcher, .. } => match actual {
                ClaimValue::String(s) => matcher.is_match(s),
                ClaimValue::List(items) => items.iter().any(|item| matcher.is_match(item)),
                ClaimValue::Number(_) | ClaimValue::Bool(_) => false,
            },
        }
    }
}

#[allow(clippy::float_cmp)]
fn scalar_equals(actual: &ClaimValue, expected: &ClaimValue) -> bool {
    match (actual, expected) {
        (ClaimValue::String(a), ClaimValue::String(e)) => a == e,
        (ClaimValue::Bool(a), ClaimValue::Bool(e)) => a == e,
        (ClaimValue::Number(a), ClaimValue::Number(e)) => {
            a == e || matches!((a.as_f64(), e.as_f64()), (Some(x), Some(y)) if x == y)
        },
        (ClaimValue::List(items), ClaimValue::String(e)) => items.len() == 1 && &items[0] == e,
        _ => false,
    }
}

/// A compiled permission rule.
#[derive(Debug, Clone)]
pub struct PermissionRule {
    id: String,
    checks: Vec<ClaimCheck>,
    capability: Capability,
    template: NamespaceTemplate,
}

impl PermissionRule {
    /// Compile a rule spec.
    ///
    /// # Errors
    ///
    /// Returns the [`RuleConfigError`] describing the first problem found.
    pub fn compile(spec: &RuleSpec) -> RuleConfigResult<Self> {
        let capability = spec
            .capability
            .parse::<Capability>()
            .map_err(|_| RuleConfigError::UnknownCapability {
                rule: spec.id.clone(),
                value: spec.capability.clone(),
            })?;
        let checks = spec
            .checks
            .iter()
            .map(|check| ClaimCheck::compile(&spec.id, check))
            .collect::<RuleConfigResult<Vec<_>>>()?;
        let template = NamespaceTemplate::parse_pattern(&spec.namespace)?;

        Ok(Self {
            id: spec.id.clone(),
            checks,
            capability,
            template,
        })
    }

    /// Rule id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Capability granted.
    #[must_use]
    pub fn capability(&self) -> Capability {
        self.capability
    }

    /// Namespace template.
    #[must_use]
    pub fn template(&self) -> &NamespaceTemplate {
        &self.template
    }

    /// Compiled checks.
    #[must_use]
    pub fn checks(&self) -> &[ClaimCheck] {
        &self.checks
    }

    /// Whether every check holds.
    #[must_use]
    pub fn admits(&self, claims: &ClaimSet) -> bool {
        self.checks.iter().all(|check| check.holds(claims))
    }

    /// Grants this rule yields for `claims` (empty if it does not hold).
    #[must_use]
    pub fn grants(&self, claims: &ClaimSet) -> Vec<PermissionGrant> {
        if !self.admits(claims) {
            return Vec::new();
        }
        self.template
            .render_claims(claims)
            .into_iter()
            .map(|pattern| PermissionGrant::new(self.capability, pattern, self.id.clone()))
            .collect()
    }
}

/// An ordered, validated collection of rules.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<PermissionRule>,
}

impl RuleSet {
    /// An empty rule set.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Compile rule specs, rejecting empty and duplicate ids.
    ///
    /// # Errors
    ///
    /// Returns the first [`RuleConfigError`] encountered.
    pub fn compile(specs: &[RuleSpec]) -> RuleConfigResult<Self> {
        let mut seen = HashSet::new();
        let mut rules = Vec::with_capacity(specs.len());
        for (index, spec) in specs.iter().enumerate() {
            if spec.id.trim().is_empty() {
                return Err(RuleConfigError::EmptyRuleId { index });
            }
            if !seen.insert(spec.id.as_str()) {
                return Err(RuleConfigError::DuplicateRuleId(spec.id.clone()));
            }
            rules.push(PermissionRule::compile(spec)?);
        }
        Ok(Self { rules })
    }

    /// Parse and compile a JSON rule array.
    ///
    /// # Errors
    ///
    /// Returns [`RuleConfigError::InvalidJson`] or any compile error.
    pub fn from_json(text: &str) -> RuleConfigResult<Self> {
        Self::compile(&RuleSpec::parse_json(text)?)
    }

    /// Rules in order.
    #[must_use]
    pub fn rules(&self) -> &[PermissionRule] {
        &self.rules
    }

    /// Number of rules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether there are no rules.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use warden_core::ProviderKind;

    fn claims() -> ClaimSet {
        ClaimSet::builder("user-1", ProviderKind::Oidc)
            .claim("groups", vec!["admins".to_string(), "dev-team".to_string()])
            .claim("email", "ops@example.com")
            .claim("email_verified", true)
            .claim("level", 3_i64)
            .claim("single", vec!["solo".to_string()])
            .build()
    }

    fn check(claim: &str, op: &str, value: Value) -> ClaimCheck {
        ClaimCheck::compile(
            "t",
            &CheckSpec {
                claim: claim.into(),
                op: op.into(),
                value,
            },
        )
        .unwrap()
    }

    #[test]
    fn test_equals() {
        let c = claims();
        assert!(check("email", "equals", "ops@example.com".into()).holds(&c));
        assert!(!check("email", "equals", "x@example.com".into()).holds(&c));
        assert!(check("email_verified", "equals", true.into()).holds(&c));
        assert!(check("level", "equals", serde_json::json!(3.0)).holds(&c));
        assert!(check("single", "equals", "solo".into()).holds(&c));
        assert!(!check("groups", "equals", "admins".into()).holds(&c));
        assert!(!check("absent", "equals", "x".into()).holds(&c));
    }

    #[test]
    fn test_contains() {
        let c = claims();
        assert!(check("groups", "contains", "admins".into()).holds(&c));
        assert!(!check("groups", "contains", "users".into()).holds(&c));
        assert!(check("email", "contains", "ops@example.com".into()).holds(&c));
        assert!(!check("level", "contains", "3".into()).holds(&c));
    }

    #[test]
    fn test_matches() {
        let c = claims();
        assert!(check("email", "matches", "*@example.com".into()).holds(&c));
        assert!(check("groups", "matches", "dev-*".into()).holds(&c));
        assert!(!check("groups", "matches", "ops-*".into()).holds(&c));
    }

    #[test]
    fn test_compile_errors() {
        let base = RuleSpec {
            id: "r".into(),
            capability: "edit".into(),
            namespace: "*".into(),
            checks: Vec::new(),
        };

        let mut bad_cap = base.clone();
        bad_cap.capability = "admin".into();
        assert!(matches!(
            PermissionRule::compile(&bad_cap),
            Err(RuleConfigError::UnknownCapability { .. })
        ));

        let mut bad_op = base.clone();
        bad_op.checks.push(CheckSpec {
            claim: "groups".into(),
            op: "startswith".into(),
            value: "a".into(),
        });
        assert!(matches!(
            PermissionRule::compile(&bad_op),
            Err(RuleConfigError::UnknownOperator { .. })
        ));

        let mut bad_glob = base.clone();
        bad_glob.checks.push(CheckSpec {
            claim: "email".into(),
            op: "matches".into(),
            value: "[unclosed".into(),
        });
        assert!(matches!(
            PermissionRule::compile(&bad_glob),
            Err(RuleConfigError::InvalidGlob { .. })
        ));

        let mut bad_value = base.clone();
        bad_value.checks.push(CheckSpec {
            claim: "groups".into(),
            op: "contains".into(),
            value: serde_json::json!(["a"]),
        });
        assert!(matches!(
            PermissionRule::compile(&bad_value),
            Err(RuleConfigError::InvalidCheck { .. })
        ));

        let mut bad_template = base;
        bad_template.namespace = "acme*".into();
        assert!(matches!(
            PermissionRule::compile(&bad_template),
            Err(RuleConfigError::InvalidTemplate { .. })
        ));
    }

    #[test]
    fn test_rule_set_rejects_duplicates_and_empty_ids() {
        let json = r#"[
            {"id": "a", "capability": "edit", "namespace": "*"},
            {"id": "a", "capability": "publish", "namespace": "*"}
        ]"#;
        assert_eq!(
            RuleSet::from_json(json).unwrap_err(),
            RuleConfigError::DuplicateRuleId("a".into())
        );

        let json = r#"[{"id": " ", "capability": "edit", "namespace": "*"}]"#;
        assert!(matches!(
            RuleSet::from_json(json),
            Err(RuleConfigError::EmptyRuleId { index: 0 })
        ));
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(
            RuleSet::from_json("{not json"),
            Err(RuleConfigError::InvalidJson(_))
        ));
        assert!(matches!(
            RuleSet::from_json(r#"[{"id": "a", "capability": "edit", "namespace": "*", "extra": 1}]"#),
            Err(RuleConfigError::InvalidJson(_))
        ));
    }

    #[test]
    fn test_rules_from_toml() {
        #[derive(Deserialize)]
        struct Doc {
            rules: Vec<RuleSpec>,
        }

        let doc: Doc = toml::from_str(
            r#"
            [[rules]]
            id = "team-publish"
            capability = "publish"
            namespace = "corp/{groups}/*"
            checks = [{ claim = "email", op = "matches", value = "*@example.com" }]
            "#,
        )
        .unwrap();
        let set = RuleSet::compile(&doc.rules).unwrap();
        let grants = set.rules()[0].grants(&claims());
        let patterns: Vec<String> = grants.iter().map(|g| g.pattern.to_string()).collect();
        assert_eq!(patterns, ["corp/admins/*", "corp/dev-team/*"]);
        assert!(grants.iter().all(|g| g.provenance == "team-publish"));
    }

    #[test]
    fn test_legacy_spec() {
        let spec = RuleSpec::legacy(Capability::Publish, 2, "acme/*");
        assert_eq!(spec.id, "legacy-publish-2");
        let rule = PermissionRule::compile(&spec).unwrap();
        assert!(rule.admits(&claims()));
        assert_eq!(rule.grants(&claims())[0].pattern.to_string(), "acme/*");
    }
}
