//! Prelude module - commonly used types for convenient import.
//!
//! Use `use warden_policy::prelude::*;` to import all essential types.
//!
//! # Example
//!
//! ```rust
//! use warden_core::{ClaimSet, ProviderKind};
//! use warden_policy::prelude::*;
//!
//! let rules = RuleSet::from_json(
//!     r#"[{"id": "teams", "capability": "publish", "namespace": "corp/{groups}/*"}]"#,
//! )
//! .unwrap();
//!
//! let claims = ClaimSet::builder("u-1", ProviderKind::Oidc)
//!     .claim("groups", vec!["tools".to_string()])
//!     .build();
//! let grants = rules.rules()[0].grants(&claims);
//! assert_eq!(grants[0].pattern.to_string(), "corp/tools/*");
//! ```

// Errors
pub use crate::{RuleConfigError, RuleConfigResult};

// Rules
pub use crate::{ClaimCheck, PermissionRule, RuleSet, RuleSpec};

// Evaluation
pub use crate::{NamespaceTemplate, RuleEvaluator};
