//! Issuance flow state machine.
//!
//! ```text
//! Unauthenticated -> Verifying -> Verified -> GrantsComputed -> CredentialIssued
//!        \______________\___________\______________\__________> Rejected
//! ```
//!
//! The machine lives for one call and is never persisted; it exists so that
//! each step is traced and a misordered step is caught as an internal error.

use std::fmt;

use tracing::{debug, trace};
use warden_core::{AuthError, AuthResult, ProviderKind};

/// State of one issuance attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowState {
    /// No assertion has been looked at yet.
    Unauthenticated,
    /// The provider is checking the assertion.
    Verifying,
    /// A claim set was produced.
    Verified,
    /// Rules were evaluated.
    GrantsComputed,
    /// A signed credential was produced.
    CredentialIssued,
    /// The attempt failed.
    Rejected,
}

impl FlowState {
    /// Whether no further transitions are possible.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::CredentialIssued | Self::Rejected)
    }

    /// Whether `next` directly follows this state.
    #[must_use]
    pub fn can_advance_to(&self, next: Self) -> bool {
        match (self, next) {
            (Self::Unauthenticated, Self::Verifying)
            | (Self::Verifying, Self::Verified)
            | (Self::Verified, Self::GrantsComputed)
            | (Self::GrantsComputed, Self::CredentialIssued) => true,
            (from, Self::Rejected) => !from.is_terminal(),
            _ => false,
        }
    }

    const fn as_str(&self) -> &'static str {
        match self {
            Self::Unauthenticated => "unauthenticated",
            Self::Verifying => "verifying",
            Self::Verified => "verified",
            Self::GrantsComputed => "grants_computed",
            Self::CredentialIssued => "credential_issued",
            Self::Rejected => "rejected",
        }
    }
}

impl fmt::Display for FlowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One issuance attempt.
#[derive(Debug)]
pub struct IssuanceFlow {
    provider: ProviderKind,
    state: FlowState,
}

impl IssuanceFlow {
    /// Start an attempt for `provider`.
    #[must_use]
    pub fn new(provider: ProviderKind) -> Self {
        Self {
            provider,
            state: FlowState::Unauthenticated,
        }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> FlowState {
        self.state
    }

    /// Move to the next state.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Internal`] if `next` does not follow the
    /// current state; the flow is left unchanged.
    pub fn advance(&mut self, next: FlowState) -> AuthResult<()> {
        if !self.state.can_advance_to(next) {
            return Err(AuthError::Internal(format!(
                "illegal issuance transition {} -> {next}",
                self.state
            )));
        }
        trace!(provider = %self.provider, from = %self.state, to = %next, "Issuance transition");
        self.state = next;
        Ok(())
    }

    /// Reject the attempt and hand back `err`.
    ///
    /// Rejecting an already terminal flow keeps its state; the error is
    /// still returned so callers can propagate it.
    pub fn reject(&mut self, err: AuthError) -> AuthError {
        if self.state.is_terminal() {
            return err;
        }
        debug!(
            provider = %self.provider,
            from = %self.state,
            status = %err.status_class(),
            "Issuance rejected"
        );
        self.state = FlowState::Rejected;
        err
    }
}
