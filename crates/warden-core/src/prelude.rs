//! Prelude module - commonly used types for convenient import.
//!
//! Use `use warden_core::prelude::*;` to import all essential types.

// Errors
pub use crate::{AuthError, AuthResult, StatusClass};

// Claims
pub use crate::{ClaimSet, ClaimSetBuilder, ClaimValue};

// Common types
pub use crate::{Capability, CredentialId, ProviderKind, Timestamp};
