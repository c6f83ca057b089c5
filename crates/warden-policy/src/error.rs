//! Rule configuration errors.
//!
//! Every variant is fatal at startup: a deployment with a broken rule set
//! must not come up with a silently narrower (or wider) policy.

use thiserror::Error;
use warden_core::AuthError;

/// Errors raised while loading permission rules and namespace templates.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleConfigError {
    /// Rule JSON could not be parsed.
    #[error("invalid rule JSON: {0}")]
    InvalidJson(String),

    /// A rule has an empty id.
    #[error("rule #{index} has an empty id")]
    EmptyRuleId {
        /// Position of the rule (0-based).
        index: usize,
    },

    /// Two rules share an id.
    #[error("duplicate rule id '{0}'")]
    DuplicateRuleId(String),

    /// A rule names a capability that does not exist.
    #[error("rule '{rule}': unknown capability '{value}'")]
    UnknownCapability {
        /// Rule id.
        rule: String,
        /// Rejected capability.
        value: String,
    },

    /// A check names an operator that does not exist.
    #[error("rule '{rule}': unknown check operator '{value}'")]
    UnknownOperator {
        /// Rule id.
        rule: String,
        /// Rejected operator.
        value: String,
    },

    /// A check value has the wrong type for its operator.
    #[error("rule '{rule}': {reason}")]
    InvalidCheck {
        /// Rule id.
        rule: String,
        /// What is wrong.
        reason: String,
    },

    /// A `matches` glob failed to compile.
    #[error("rule '{rule}': invalid glob '{pattern}': {reason}")]
    InvalidGlob {
        /// Rule id.
        rule: String,
        /// Offending glob.
        pattern: String,
        /// Compiler message.
        reason: String,
    },

    /// A namespace template is unparseable or cannot produce a valid pattern.
    #[error("invalid namespace template '{template}': {reason}")]
    InvalidTemplate {
        /// Offending template.
        template: String,
        /// What is wrong.
        reason: String,
    },
}

impl From<RuleConfigError> for AuthError {
    fn from(err: RuleConfigError) -> Self {
        Self::InvalidConfiguration(err.to_string())
    }
}

/// Result type for rule configuration.
pub type RuleConfigResult<T> = Result<T, RuleConfigError>;
