//! Warden Auth - the credential issuance and authorization facade.
//!
//! [`AuthService`] wires the identity verifiers, the permission rule
//! evaluator, the credential issuer and the validator together from one
//! validated [`warden_config::Config`]. Callers use two calls:
//!
//! - [`AuthService::issue_credential`]: identity assertion in, signed
//!   credential out
//! - [`AuthService::authorize`]: credential, namespace and capability in,
//!   the allowing grant (or an error) out
//!
//! # Example
//!
//! ```rust,no_run
//! use warden_auth::{AuthService, IdentityAssertion};
//! use warden_config::Config;
//! use warden_core::Capability;
//!
//! # async fn run() -> Result<(), warden_core::AuthError> {
//! let config = Config::load(None)?.config;
//! let service = AuthService::from_config(&config)?;
//!
//! let issued = service
//!     .issue_credential(&IdentityAssertion::GithubCode { code: "abc123".into() })
//!     .await?;
//! let grant = service.authorize(issued.token(), "github.com/alice/tool", Capability::Publish)?;
//! println!("allowed by {}", grant.provenance);
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod flow;
mod keys;
mod service;

pub use flow::{FlowState, IssuanceFlow};
pub use keys::{load_signing_key, trusted_keys};
pub use service::{AuthService, IssuedCredential};

pub use warden_identity::IdentityAssertion;
