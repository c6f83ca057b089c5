//! Namespaces and namespace patterns.
//!
//! A namespace is a `/`-segmented name such as `github.com/alice/tool`.
//! Patterns are deliberately narrower than globs: a pattern is a literal
//! namespace, the global `*`, or `prefix/*` where the wildcard is a whole
//! trailing segment. Matching is segment-aware, so `acme/*` never matches
//! `acme2/tool`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{CapabilityError, CapabilityResult};

/// Separator between namespace segments.
pub const SEPARATOR: char = '/';

const WILDCARD: char = '*';

/// Reason a single segment is not acceptable, or `None` if it is.
fn segment_problem(segment: &str) -> Option<&'static str> {
    if segment.is_empty() {
        return Some("empty segment");
    }
    for c in segment.chars() {
        if c == WILDCARD {
            return Some("wildcard not allowed in a namespace");
        }
        if c.is_whitespace() {
            return Some("whitespace not allowed");
        }
        if c.is_control() {
            return Some("control character not allowed");
        }
    }
    None
}

/// Whether `value` can stand alone as one namespace segment.
///
/// Used when substituting identity-derived values into namespace templates:
/// a value containing `/` would silently widen the resulting namespace.
#[must_use]
pub fn is_valid_segment(value: &str) -> bool {
    !value.contains(SEPARATOR) && segment_problem(value).is_none()
}

/// A validated namespace.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Namespace(String);

impl Namespace {
    /// Validate and wrap a namespace string.
    ///
    /// # Errors
    ///
    /// Returns [`CapabilityError::InvalidNamespace`] if the string is empty,
    /// has an empty segment, or contains whitespace, control characters or `*`.
    pub fn new(value: impl Into<String>) -> CapabilityResult<Self> {
        let value = value.into();
        if value.is_empty() {
            return Err(CapabilityError::InvalidNamespace {
                namespace: value,
                reason: "namespace is empty",
            });
        }
        if let Some(reason) = value.split(SEPARATOR).find_map(segment_problem) {
            return Err(CapabilityError::InvalidNamespace {
                namespace: value,
                reason,
            });
        }
        Ok(Self(value))
    }

    /// The namespace string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Iterate over segments.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split(SEPARATOR)
    }

    /// Whether `other` lies strictly beneath this namespace.
    #[must_use]
    pub fn is_strict_parent_of(&self, other: &Namespace) -> bool {
        other
            .0
            .strip_prefix(self.0.as_str())
            .and_then(|rest| rest.strip_prefix(SEPARATOR))
            .is_some_and(|rest| !rest.is_empty())
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Namespace {
    type Err = CapabilityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for Namespace {
    type Error = CapabilityError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Namespace> for String {
    fn from(ns: Namespace) -> Self {
        ns.0
    }
}

impl AsRef<str> for Namespace {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A pattern over namespaces.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum NamespacePattern {
    /// Exactly one namespace.
    Exact(Namespace),
    /// Every namespace strictly beneath the prefix (`prefix/*`).
    Prefix(Namespace),
    /// Every namespace (`*`).
    Global,
}

impl NamespacePattern {
    /// Parse a pattern.
    ///
    /// # Errors
    ///
    /// Returns [`CapabilityError::InvalidPattern`] for partial-segment or
    /// interior wildcards (`acme*`, `a/*/b`, `*/x`), empty segments, and any
    /// character a namespace may not contain.
    pub fn parse(pattern: &str) -> CapabilityResult<Self> {
        if pattern == "*" {
            return Ok(Self::Global);
        }

        let (body, is_prefix) = match pattern.strip_suffix("/*") {
            Some(prefix) => (prefix, true),
            None => (pattern, false),
        };

        if body.contains(WILDCARD) {
            return Err(CapabilityError::InvalidPattern {
                pattern: pattern.to_string(),
                reason: "wildcard must be the whole final segment",
            });
        }

        let namespace = Namespace::new(body).map_err(|err| match err {
            CapabilityError::InvalidNamespace { reason, .. } => CapabilityError::InvalidPattern {
                pattern: pattern.to_string(),
                reason,
            },
            other => other,
        })?;

        Ok(if is_prefix {
            Self::Prefix(namespace)
        } else {
            Self::Exact(namespace)
        })
    }

    /// Pattern matching everything beneath `prefix`.
    #[must_use]
    pub fn prefix(prefix: Namespace) -> Self {
        Self::Prefix(prefix)
    }

    /// Whether this pattern authorizes `namespace`.
    #[must_use]
    pub fn matches(&self, namespace: &Namespace) -> bool {
        match self {
            Self::Exact(ns) => ns == namespace,
            Self::Prefix(prefix) => prefix.is_strict_parent_of(namespace),
            Self::Global => true,
        }
    }

    /// Whether this is the global pattern.
    #[must_use]
    pub fn is_global(&self) -> bool {
        matches!(self, Self::Global)
    }
}

impl fmt::Display for NamespacePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(ns) => write!(f, "{ns}"),
            Self::Prefix(ns) => write!(f, "{ns}/*"),
            Self::Global => f.write_str("*"),
        }
    }
}

impl FromStr for NamespacePattern {
    type Err = CapabilityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for NamespacePattern {
    type Error = CapabilityError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<NamespacePattern> for String {
    fn from(pattern: NamespacePattern) -> Self {
        pattern.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ns(s: &str) -> Namespace {
        Namespace::new(s).unwrap()
    }

    #[test]
    fn test_namespace_validation() {
        assert!(Namespace::new("acme").is_ok());
        assert!(Namespace::new("github.com/alice/cool-tool").is_ok());

        for bad in ["", "/acme", "acme/", "a//b", "ac me", "acme\t", "acme\u{7}", "acme*", "*"] {
            assert!(
                matches!(Namespace::new(bad), Err(CapabilityError::InvalidNamespace { .. })),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_segment_validation() {
        assert!(is_valid_segment("alice"));
        assert!(is_valid_segment("my-org.io"));
        assert!(!is_valid_segment("a/b"));
        assert!(!is_valid_segment(""));
        assert!(!is_valid_segment("a*"));
        assert!(!is_valid_segment("a b"));
    }

    #[test]
    fn test_prefix_pattern_is_segment_aware() {
        let pattern = NamespacePattern::parse("acme/*").unwrap();
        assert!(pattern.matches(&ns("acme/tool")));
        assert!(pattern.matches(&ns("acme/sub/tool")));
        assert!(!pattern.matches(&ns("acme2/tool")));
        assert!(!pattern.matches(&ns("acme")));
    }

    #[test]
    fn test_exact_and_global_patterns() {
        let exact = NamespacePattern::parse("acme/tool").unwrap();
        assert!(exact.matches(&ns("acme/tool")));
        assert!(!exact.matches(&ns("acme/tool/x")));
        assert!(!exact.matches(&ns("acme")));

        let global = NamespacePattern::parse("*").unwrap();
        assert!(global.is_global());
        assert!(global.matches(&ns("anything/at/all")));
    }

    #[test]
    fn test_rejected_patterns() {
        for bad in ["acme*", "a/*/b", "a/b*", "*/x", "", "a//*", "/*", "**", "a/**", " a/*"] {
            assert!(
                matches!(
                    NamespacePattern::parse(bad),
                    Err(CapabilityError::InvalidPattern { .. })
                ),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_display_matches_input() {
        for input in ["*", "acme/*", "acme/tool", "github.com/alice/*"] {
            assert_eq!(NamespacePattern::parse(input).unwrap().to_string(), input);
        }
    }

    #[test]
    fn test_serde_validates() {
        let pattern: NamespacePattern = serde_json::from_str("\"acme/*\"").unwrap();
        assert_eq!(pattern, NamespacePattern::Prefix(ns("acme")));
        assert!(serde_json::from_str::<NamespacePattern>("\"acme*\"").is_err());
        assert!(serde_json::from_str::<Namespace>("\"a//b\"").is_err());
    }
}
