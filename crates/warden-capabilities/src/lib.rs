//! Warden Capabilities - namespace-scoped, signed registry credentials.
//!
//! This crate provides:
//! - Namespaces and segment-aware namespace patterns
//! - Permission grants and de-duplicated grant sets
//! - Compact Ed25519-signed credentials with a bounded lifetime
//! - Stateless validation and namespace/capability authorization
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use warden_capabilities::{
//!     Authorizer, CredentialIssuer, CredentialValidator, GrantSet, NamespacePattern,
//!     PermissionGrant,
//! };
//! use warden_core::{Capability, ProviderKind};
//! use warden_crypto::{KeyPair, SignatureVerifier};
//!
//! let key = Arc::new(KeyPair::generate());
//! let issuer = CredentialIssuer::new(Arc::clone(&key), 300).unwrap();
//! let validator = CredentialValidator::new(SignatureVerifier::with_keys([key.export_public_key()]));
//!
//! let grants: GrantSet = [PermissionGrant::new(
//!     Capability::Publish,
//!     NamespacePattern::parse("acme/*").unwrap(),
//!     "example",
//! )]
//! .into_iter()
//! .collect();
//!
//! let token = issuer.issue("alice", ProviderKind::Oidc, grants).unwrap().encode();
//! let verified = validator.validate(&token).unwrap();
//! assert!(Authorizer::default().authorize(&verified, "acme/tool", Capability::Publish).is_ok());
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod credential;
mod error;
mod grant;
mod issuer;
mod namespace;
mod validator;

pub use credential::{
    CREDENTIAL_FORMAT_VERSION, Credential, DEFAULT_TTL_SECS, MAX_FIELD_LEN, MAX_GRANTS,
    MAX_TTL_SECS,
};
pub use error::{CapabilityError, CapabilityResult};
pub use grant::{GrantSet, PermissionGrant};
pub use issuer::CredentialIssuer;
pub use namespace::{Namespace, NamespacePattern, SEPARATOR, is_valid_segment};
pub use validator::{
    ANONYMOUS_MUTATION_PROVENANCE, AuthorizationPolicy, Authorizer, CredentialValidator,
    VerifiedCredential,
};
