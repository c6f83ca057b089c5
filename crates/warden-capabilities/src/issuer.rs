//! Credential issuance.

use std::sync::Arc;

use chrono::Duration;
use tracing::info;
use warden_core::{ProviderKind, Timestamp};
use warden_crypto::{KeyPair, PublicKey};

use crate::credential::{Credential, MAX_TTL_SECS};
use crate::error::{CapabilityError, CapabilityResult};
use crate::grant::GrantSet;

/// Signs credentials with the issuer key and a fixed lifetime.
#[derive(Debug, Clone)]
pub struct CredentialIssuer {
    key: Arc<KeyPair>,
    ttl: Duration,
}

impl CredentialIssuer {
    /// Create an issuer.
    ///
    /// # Errors
    ///
    /// Returns [`CapabilityError::InvalidTtl`] unless `1 <= ttl_secs <= 3600`.
    pub fn new(key: Arc<KeyPair>, ttl_secs: i64) -> CapabilityResult<Self> {
        if !(1..=MAX_TTL_SECS).contains(&ttl_secs) {
            return Err(CapabilityError::InvalidTtl {
                actual_secs: ttl_secs,
                max_secs: MAX_TTL_SECS,
            });
        }
        Ok(Self {
            key,
            ttl: Duration::seconds(ttl_secs),
        })
    }

    /// Credential lifetime.
    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Public half of the issuer key.
    #[must_use]
    pub fn public_key(&self) -> PublicKey {
        self.key.export_public_key()
    }

    /// Issue a credential valid from now.
    ///
    /// # Errors
    ///
    /// Returns [`CapabilityError::FieldTooLong`] if the subject or a grant is
    /// too large to encode.
    pub fn issue(
        &self,
        subject: impl Into<String>,
        provider: ProviderKind,
        grants: GrantSet,
    ) -> CapabilityResult<Credential> {
        self.issue_at(Timestamp::now_millis(), subject, provider, grants)
    }

    /// Issue a credential valid from `issued_at`.
    ///
    /// # Errors
    ///
    /// See [`CredentialIssuer::issue`].
    pub fn issue_at(
        &self,
        issued_at: Timestamp,
        subject: impl Into<String>,
        provider: ProviderKind,
        grants: GrantSet,
    ) -> CapabilityResult<Credential> {
        let issued_at = issued_at.truncate_to_millis();
        let expires_at = issued_at
            .checked_add(self.ttl)
            .ok_or_else(|| CapabilityError::malformed("expiry overflows"))?;

        let credential = Credential::create(
            subject.into(),
            provider,
            grants,
            issued_at,
            expires_at,
            &self.key,
        )?;

        info!(
            credential_id = %credential.id,
            subject = %credential.subject,
            provider = %credential.provider,
            grants = credential.grants.len(),
            expires_at = %credential.expires_at,
            "Issued credential"
        );
        Ok(credential)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ttl_bounds() {
        let key = Arc::new(KeyPair::generate());
        assert!(CredentialIssuer::new(Arc::clone(&key), 1).is_ok());
        assert!(CredentialIssuer::new(Arc::clone(&key), MAX_TTL_SECS).is_ok());
        assert!(matches!(
            CredentialIssuer::new(Arc::clone(&key), 0),
            Err(CapabilityError::InvalidTtl { actual_secs: 0, .. })
        ));
        assert!(CredentialIssuer::new(key, MAX_TTL_SECS + 1).is_err());
    }

    #[test]
    fn test_issue_sets_expiry_from_ttl() {
        let key = Arc::new(KeyPair::generate());
        let issuer = CredentialIssuer::new(Arc::clone(&key), 300).unwrap();
        let credential = issuer
            .issue("alice", ProviderKind::Github, GrantSet::new())
            .unwrap();

        assert_eq!(credential.lifetime(), Duration::seconds(300));
        assert_eq!(credential.key_id, key.key_id());
        assert_eq!(credential.issued_at, credential.issued_at.truncate_to_millis());
        assert_eq!(issuer.public_key(), key.export_public_key());
    }
}
