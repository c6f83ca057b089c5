//! Prelude module - commonly used types for convenient import.
//!
//! Use `use warden_auth::prelude::*;` to import all essential types.

// Facade
pub use crate::{AuthService, IdentityAssertion, IssuedCredential};

// Flow
pub use crate::{FlowState, IssuanceFlow};

// Errors
pub use warden_core::{AuthError, AuthResult, StatusClass};
