//! Prelude module - commonly used types for convenient import.
//!
//! Use `use warden_capabilities::prelude::*;` to import all essential types.

// Errors
pub use crate::{CapabilityError, CapabilityResult};

// Namespaces and grants
pub use crate::{GrantSet, Namespace, NamespacePattern, PermissionGrant};

// Credentials
pub use crate::{Credential, CredentialIssuer};

// Validation and authorization
pub use crate::{AuthorizationPolicy, Authorizer, CredentialValidator, VerifiedCredential};
