//! Permission grants and grant sets.

use serde::{Deserialize, Serialize};
use std::fmt;
use warden_core::Capability;

use crate::namespace::{Namespace, NamespacePattern};

/// A capability bound to a namespace pattern.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PermissionGrant {
    /// Capability granted.
    pub capability: Capability,
    /// Namespaces the capability applies to.
    pub pattern: NamespacePattern,
    /// What produced the grant: a rule id or a synthesized id such as
    /// `github:user:alice`.
    pub provenance: String,
}

impl PermissionGrant {
    /// Create a grant.
    #[must_use]
    pub fn new(capability: Capability, pattern: NamespacePattern, provenance: impl Into<String>) -> Self {
        Self {
            capability,
            pattern,
            provenance: provenance.into(),
        }
    }

    /// Whether this grant covers `capability` on `namespace`.
    #[must_use]
    pub fn authorizes(&self, namespace: &Namespace, capability: Capability) -> bool {
        self.capability == capability && self.pattern.matches(namespace)
    }
}

impl fmt::Display for PermissionGrant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} on {} ({})", self.capability, self.pattern, self.provenance)
    }
}

/// An ordered set of grants, de-duplicated on (capability, pattern).
///
/// When two grants share a capability and pattern, the first one inserted
/// is kept along with its provenance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GrantSet {
    grants: Vec<PermissionGrant>,
}

impl GrantSet {
    /// Create an empty grant set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a grant. Returns `false` if an equivalent grant was already present.
    pub fn insert(&mut self, grant: PermissionGrant) -> bool {
        let duplicate = self
            .grants
            .iter()
            .any(|g| g.capability == grant.capability && g.pattern == grant.pattern);
        if duplicate {
            return false;
        }
        self.grants.push(grant);
        true
    }

    /// First grant covering `capability` on `namespace`.
    #[must_use]
    pub fn find(&self, namespace: &Namespace, capability: Capability) -> Option<&PermissionGrant> {
        self.grants.iter().find(|g| g.authorizes(namespace, capability))
    }

    /// Iterate grants in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, PermissionGrant> {
        self.grants.iter()
    }

    /// Number of grants.
    #[must_use]
    pub fn len(&self) -> usize {
        self.grants.len()
    }

    /// Whether there are no grants.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.grants.is_empty()
    }

    /// Grants as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[PermissionGrant] {
        &self.grants
    }
}

impl Extend<PermissionGrant> for GrantSet {
    fn extend<I: IntoIterator<Item = PermissionGrant>>(&mut self, iter: I) {
        for grant in iter {
            self.insert(grant);
        }
    }
}

impl FromIterator<PermissionGrant> for GrantSet {
    fn from_iter<I: IntoIterator<Item = PermissionGrant>>(iter: I) -> Self {
        let mut set = Self::new();
        set.extend(iter);
        set
    }
}

impl IntoIterator for GrantSet {
    type Item = PermissionGrant;
    type IntoIter = std::vec::IntoIter<PermissionGrant>;

    fn into_iter(self) -> Self::IntoIter {
        self.grants.into_iter()
    }
}

impl<'a> IntoIterator for &'a GrantSet {
    type Item = &'a PermissionGrant;
    type IntoIter = std::slice::Iter<'a, PermissionGrant>;

    fn into_iter(self) -> Self::IntoIter {
        self.grants.iter()
    }
}
