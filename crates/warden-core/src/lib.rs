//! Warden Core - Foundation types for the registry authentication core.
//!
//! This crate provides:
//! - Claim sets: the normalized output of every identity verification
//! - Provider kinds and capabilities (closed enums)
//! - Timestamps and credential identifiers
//! - The [`AuthError`] taxonomy shared by every other crate
//!
//! Nothing here performs I/O. Verification, rule evaluation and credential
//! handling live in the crates layered on top.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

pub mod claims;
pub mod error;
pub mod types;

pub use claims::{ClaimSet, ClaimSetBuilder, ClaimValue};
pub use error::{AuthError, AuthResult, StatusClass};
pub use types::{Capability, CredentialId, ParseKindError, ProviderKind, Timestamp};
