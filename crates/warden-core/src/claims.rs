//! Claim sets: the normalized output of identity verification.
//!
//! Every verifier, whatever its provider, produces a [`ClaimSet`]. Claim
//! values are restricted to a small tagged union so rule checks can match on
//! them exhaustively.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::{ProviderKind, Timestamp};

/// A single claim value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ClaimValue {
    /// A string claim.
    String(String),
    /// A numeric claim. Integers keep their integer display.
    Number(serde_json::Number),
    /// A boolean claim.
    Bool(bool),
    /// An ordered list of strings.
    List(Vec<String>),
}

impl ClaimValue {
    /// Convert a JSON value into a claim value.
    ///
    /// Returns `None` for `null`, objects, and arrays that contain anything
    /// other than strings.
    #[must_use]
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(Self::String(s.clone())),
            Value::Number(n) => Some(Self::Number(n.clone())),
            Value::Bool(b) => Some(Self::Bool(*b)),
            Value::Array(items) => items
                .iter()
                .map(|item| item.as_str().map(str::to_string))
                .collect::<Option<Vec<_>>>()
                .map(Self::List),
            Value::Null | Value::Object(_) => None,
        }
    }

    /// Convert back into JSON.
    #[must_use]
    pub fn to_json(&self) -> Value {
        match self {
            Self::String(s) => Value::String(s.clone()),
            Self::Number(n) => Value::Number(n.clone()),
            Self::Bool(b) => Value::Bool(*b),
            Self::List(items) => Value::Array(items.iter().cloned().map(Value::String).collect()),
        }
    }

    /// Borrow as a string, if this is a string claim.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Borrow as a list, if this is a list claim.
    #[must_use]
    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    /// Numeric value as `f64`, if this is a number claim.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => n.as_f64(),
            _ => None,
        }
    }

    /// Short name of the variant, for logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::String(_) => "string",
            Self::Number(_) => "number",
            Self::Bool(_) => "bool",
            Self::List(_) => "list",
        }
    }
}

impl fmt::Display for ClaimValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => f.write_str(s),
            Self::Number(n) => write!(f, "{n}"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::List(items) => write!(f, "[{}]", items.join(", ")),
        }
    }
}

impl From<&str> for ClaimValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for ClaimValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<bool> for ClaimValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for ClaimValue {
    fn from(value: i64) -> Self {
        Self::Number(value.into())
    }
}

impl From<u64> for ClaimValue {
    fn from(value: u64) -> Self {
        Self::Number(value.into())
    }
}

impl From<Vec<String>> for ClaimValue {
    fn from(value: Vec<String>) -> Self {
        Self::List(value)
    }
}

/// Normalized claims produced by verifying one identity assertion.
///
/// Immutable once built; construct through [`ClaimSet::builder`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimSet {
    subject: String,
    provider: ProviderKind,
    issued_at: Timestamp,
    claims: BTreeMap<String, ClaimValue>,
}

impl ClaimSet {
    /// Start building a claim set for `subject` vouched for by `provider`.
    #[must_use]
    pub fn builder(subject: impl Into<String>, provider: ProviderKind) -> ClaimSetBuilder {
        ClaimSetBuilder {
            subject: subject.into(),
            provider,
            issued_at: None,
            claims: BTreeMap::new(),
        }
    }

    /// Subject identifier.
    #[must_use]
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Provider that produced these claims.
    #[must_use]
    pub fn provider(&self) -> ProviderKind {
        self.provider
    }

    /// When the claims were produced.
    #[must_use]
    pub fn issued_at(&self) -> Timestamp {
        self.issued_at
    }

    /// Look up a claim by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ClaimValue> {
        self.claims.get(name)
    }

    /// Look up a string claim.
    #[must_use]
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(ClaimValue::as_str)
    }

    /// Look up a list claim.
    #[must_use]
    pub fn get_list(&self, name: &str) -> Option<&[String]> {
        self.get(name).and_then(ClaimValue::as_list)
    }

    /// Whether a claim is present.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.claims.contains_key(name)
    }

    /// Iterate claims in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ClaimValue)> {
        self.claims.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of claims.
    #[must_use]
    pub fn len(&self) -> usize {
        self.claims.len()
    }

    /// Whether there are no claims.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.claims.is_empty()
    }
}

/// Builder for [`ClaimSet`].
#[derive(Debug)]
pub struct ClaimSetBuilder {
    subject: String,
    provider: ProviderKind,
    issued_at: Option<Timestamp>,
    claims: BTreeMap<String, ClaimValue>,
}

impl ClaimSetBuilder {
    /// Set the issued-at instant (defaults to now).
    #[must_use]
    pub fn issued_at(mut self, at: Timestamp) -> Self {
        self.issued_at = Some(at);
        self
    }

    /// Insert a claim, replacing any previous value with the same name.
    #[must_use]
    pub fn claim(mut self, name: impl Into<String>, value: impl Into<ClaimValue>) -> Self {
        self.claims.insert(name.into(), value.into());
        self
    }

    /// Insert a JSON claim if it is representable; returns whether it was kept.
    pub fn insert_json(&mut self, name: impl Into<String>, value: &Value) -> bool {
        match ClaimValue::from_json(value) {
            Some(v) => {
                self.claims.insert(name.into(), v);
                true
            },
            None => false,
        }
    }

    /// Finish building.
    #[must_use]
    pub fn build(self) -> ClaimSet {
        ClaimSet {
            subject: self.subject,
            provider: self.provider,
            issued_at: self.issued_at.unwrap_or_else(Timestamp::now_millis),
            claims: self.claims,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_json_representable() {
        assert_eq!(
            ClaimValue::from_json(&json!("alice")),
            Some(ClaimValue::String("alice".into()))
        );
        assert_eq!(ClaimValue::from_json(&json!(true)), Some(ClaimValue::Bool(true)));
        assert_eq!(
            ClaimValue::from_json(&json!(["a", "b"])),
            Some(ClaimValue::List(vec!["a".into(), "b".into()]))
        );
        let n = ClaimValue::from_json(&json!(42)).unwrap();
        assert_eq!(n.to_string(), "42");
        assert_eq!(n.as_f64(), Some(42.0));
    }

    #[test]
    fn test_from_json_unrepresentable() {
        assert!(ClaimValue::from_json(&json!(null)).is_none());
        assert!(ClaimValue::from_json(&json!({"a": 1})).is_none());
        assert!(ClaimValue::from_json(&json!(["a", 1])).is_none());
    }

    #[test]
    fn test_claim_set_builder() {
        let mut builder = ClaimSet::builder("alice", ProviderKind::Github)
            .claim("login", "alice")
            .claim("id", 7_i64)
            .claim("orgs", vec!["acme".to_string()]);
        assert!(!builder.insert_json("profile", &json!({"x": 1})));
        let claims = builder.build();

        assert_eq!(claims.subject(), "alice");
        assert_eq!(claims.provider(), ProviderKind::Github);
        assert_eq!(claims.get_str("login"), Some("alice"));
        assert_eq!(claims.get_list("orgs").unwrap(), ["acme".to_string()]);
        assert!(!claims.contains("profile"));
        assert_eq!(claims.len(), 3);
    }

    #[test]
    fn test_untagged_serde() {
        let v: ClaimValue = serde_json::from_str("[\"x\"]").unwrap();
        assert_eq!(v, ClaimValue::List(vec!["x".into()]));
        assert_eq!(serde_json::to_string(&ClaimValue::Bool(false)).unwrap(), "false");
    }
}
