//! Prelude module - commonly used types for convenient import.
//!
//! Use `use warden_identity::prelude::*;` to import all essential types.
//!
//! ```rust
//! use warden_core::ProviderKind;
//! use warden_identity::prelude::*;
//!
//! let assertion = IdentityAssertion::GithubActionsToken {
//!     token: "eyJ...".to_string(),
//! };
//! assert_eq!(assertion.provider(), ProviderKind::GithubOidc);
//! ```

// Errors
pub use crate::{IdentityError, IdentityResult};

// Assertions and verifiers
pub use crate::{IdentityAssertion, IdentityVerifier};

// Provider settings
pub use crate::{GithubSettings, HttpSettings, OidcSettings};
