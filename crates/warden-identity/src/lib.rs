//! Warden Identity - verifying assertions from external identity providers.
//!
//! This crate provides:
//! - [`IdentityAssertion`]: what a caller presents
//! - [`IdentityVerifier`]: a closed enum over the supported providers
//! - Repository-hosting OAuth (code exchange or access token)
//! - Repository-hosting CI identity tokens and generic OIDC, validated
//!   locally against a cached [`JwksCache`]
//!
//! Every verifier produces a [`warden_core::ClaimSet`] or an
//! [`IdentityError`] that says whether a retry may help. Error reasons never
//! include provider response bodies.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod assertion;
mod error;
mod github;
mod github_oidc;
mod http;
mod jwks;
mod oidc;
mod verifier;

#[cfg(test)]
mod test_support;

pub use assertion::{IdentityAssertion, MAX_ASSERTION_LEN};
pub use error::{IdentityError, IdentityResult};
pub use github::{DEFAULT_API_URL, DEFAULT_OAUTH_URL, GithubSettings, GithubVerifier, MAX_ORG_PAGES};
pub use github_oidc::{GITHUB_ACTIONS_ISSUER, GithubOidcVerifier, REPOSITORY_OWNER};
pub use http::{DEFAULT_TIMEOUT_SECS, HttpSettings, MAX_TIMEOUT_SECS};
pub use jwks::{DISCOVERY_PATH, JwksCache, JwksSource};
pub use oidc::{
    DEFAULT_CLOCK_SKEW_SECS, DEFAULT_JWKS_MIN_REFRESH_SECS, DEFAULT_JWKS_REFRESH_SECS,
    OidcSettings, OidcVerifier,
};
pub use verifier::{ANONYMOUS_SUBJECT, IdentityVerifier};
