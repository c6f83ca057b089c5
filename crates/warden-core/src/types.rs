//! Common types used throughout Warden.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// Unique identifier for an issued credential.
///
/// Only used for audit correlation; validation never looks it up anywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CredentialId(pub Uuid);

impl CredentialId {
    /// Create a new random credential ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a credential ID from a UUID.
    #[must_use]
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for CredentialId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CredentialId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "credential:{}", self.0)
    }
}

/// Timestamp wrapper for consistent handling throughout Warden.
///
/// Credentials carry timestamps at millisecond precision, so values that
/// cross the wire should be produced with [`Timestamp::now_millis`] or
/// [`Timestamp::truncate_to_millis`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(pub DateTime<Utc>);

impl Timestamp {
    /// Get the current timestamp.
    #[must_use]
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Get the current timestamp truncated to whole milliseconds.
    #[must_use]
    pub fn now_millis() -> Self {
        Self::now().truncate_to_millis()
    }

    /// Create a timestamp from a `DateTime<Utc>`.
    #[must_use]
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    /// Create a timestamp from Unix milliseconds.
    ///
    /// Returns `None` when the value is out of chrono's representable range.
    #[must_use]
    pub fn from_millis(millis: i64) -> Option<Self> {
        Utc.timestamp_millis_opt(millis).single().map(Self)
    }

    /// Create a timestamp from Unix seconds.
    #[must_use]
    pub fn from_secs(secs: i64) -> Option<Self> {
        Utc.timestamp_opt(secs, 0).single().map(Self)
    }

    /// Unix milliseconds.
    #[must_use]
    pub fn as_millis(&self) -> i64 {
        self.0.timestamp_millis()
    }

    /// Drop any sub-millisecond precision.
    #[must_use]
    pub fn truncate_to_millis(self) -> Self {
        Self::from_millis(self.as_millis()).unwrap_or(self)
    }

    /// Add a duration, returning `None` on overflow.
    #[must_use]
    pub fn checked_add(&self, duration: chrono::Duration) -> Option<Self> {
        self.0.checked_add_signed(duration).map(Self)
    }

    /// Subtract a duration, returning `None` on overflow.
    #[must_use]
    pub fn checked_sub(&self, duration: chrono::Duration) -> Option<Self> {
        self.0.checked_sub_signed(duration).map(Self)
    }

    /// Signed duration `self - earlier`.
    #[must_use]
    pub fn signed_duration_since(&self, earlier: Self) -> chrono::Duration {
        self.0.signed_duration_since(earlier.0)
    }

    /// Check if this timestamp is in the past.
    #[must_use]
    pub fn is_past(&self) -> bool {
        self.0 < Utc::now()
    }

    /// Get the inner `DateTime<Utc>`.
    #[must_use]
    pub fn into_inner(self) -> DateTime<Utc> {
        self.0
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Self::now()
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%dT%H:%M:%S%.3fZ"))
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }
}

impl From<Timestamp> for DateTime<Utc> {
    fn from(ts: Timestamp) -> Self {
        ts.0
    }
}

/// Error returned when parsing a closed enum from a string fails.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} '{value}'")]
pub struct ParseKindError {
    /// What was being parsed (e.g. `capability`).
    pub kind: &'static str,
    /// The rejected input.
    pub value: String,
}

/// A named mutation right over registry entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Edit existing entries (status changes, metadata updates).
    Edit,
    /// Publish new entries or versions.
    Publish,
}

impl Capability {
    /// All capabilities, in canonical order.
    pub const ALL: [Self; 2] = [Self::Edit, Self::Publish];

    /// Canonical lower-case name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Edit => "edit",
            Self::Publish => "publish",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Capability {
    type Err = ParseKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "edit" => Ok(Self::Edit),
            "publish" => Ok(Self::Publish),
            other => Err(ParseKindError {
                kind: "capability",
                value: other.to_string(),
            }),
        }
    }
}

/// The identity provider that vouched for a subject.
///
/// This is a deliberate allow-list: adding a provider means adding a
/// variant here and a matching verifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProviderKind {
    /// Repository-hosting OAuth (authorization code or user access token).
    Github,
    /// Repository-hosting CI identity tokens (OIDC).
    GithubOidc,
    /// Generic OpenID Connect provider.
    Oidc,
    /// No identity presented.
    Anonymous,
}

impl ProviderKind {
    /// Canonical wire name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Github => "github",
            Self::GithubOidc => "github-oidc",
            Self::Oidc => "oidc",
            Self::Anonymous => "anonymous",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = ParseKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "github" => Ok(Self::Github),
            "github-oidc" => Ok(Self::GithubOidc),
            "oidc" => Ok(Self::Oidc),
            "anonymous" => Ok(Self::Anonymous),
            other => Err(ParseKindError {
                kind: "provider",
                value: other.to_string(),
            }),
        }
    }
}
