//! Warden Policy - turning verified claims into permission grants.
//!
//! This crate provides:
//! - Declarative OIDC permission rules (`equals`, `contains`, `matches`)
//! - Namespace templates with `{claim}` placeholders
//! - Ownership-derived grants for the repository-hosting providers
//! - The [`RuleEvaluator`] that ties them together
//!
//! Rule configuration is validated eagerly; any error is meant to abort
//! startup.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod error;
mod evaluator;
mod rule;
mod template;

pub use error::{RuleConfigError, RuleConfigResult};
pub use evaluator::{DEFAULT_GITHUB_TEMPLATE, REPOSITORY_OWNER_CLAIM, RuleEvaluator};
pub use rule::{CheckSpec, ClaimCheck, PermissionRule, RuleSet, RuleSpec};
pub use template::{MAX_EXPANSIONS, NamespaceTemplate};
