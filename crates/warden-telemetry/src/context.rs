//! Request correlation for issuance and authorization calls.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Correlation data carried through one facade call.
///
/// Every issuance or authorization attempt gets its own context; the span it
/// produces tags every event logged during the attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestContext {
    /// Unique request identifier.
    pub request_id: Uuid,
    /// Shared by a request and its children.
    pub correlation_id: Uuid,
    /// Parent request, for nested operations.
    pub parent_id: Option<Uuid>,
    /// When the request started.
    pub started_at: DateTime<Utc>,
    /// Component that created the context (e.g. `auth`).
    pub component: String,
    /// Operation being performed.
    pub operation: Option<String>,
    /// Identity provider involved, if any.
    pub provider: Option<String>,
}

impl RequestContext {
    /// Create a new root context.
    #[must_use]
    pub fn new(component: impl Into<String>) -> Self {
        let id = Uuid::new_v4();
        Self {
            request_id: id,
            correlation_id: id,
            parent_id: None,
            started_at: Utc::now(),
            component: component.into(),
            operation: None,
            provider: None,
        }
    }

    /// Create a child context that keeps the correlation id.
    #[must_use]
    pub fn child(&self, component: impl Into<String>) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            correlation_id: self.correlation_id,
            parent_id: Some(self.request_id),
            started_at: Utc::now(),
            component: component.into(),
            operation: None,
            provider: self.provider.clone(),
        }
    }

    /// Set the operation name.
    #[must_use]
    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.operation = Some(operation.into());
        self
    }

    /// Set the identity provider.
    #[must_use]
    pub fn with_provider(mut self, provider: impl ToString) -> Self {
        self.provider = Some(provider.to_string());
        self
    }

    /// Milliseconds since the request started.
    #[must_use]
    pub fn elapsed_ms(&self) -> i64 {
        Utc::now()
            .signed_duration_since(self.started_at)
            .num_milliseconds()
    }

    /// First eight characters of the request id.
    #[must_use]
    pub fn short_id(&self) -> String {
        self.request_id.simple().to_string().chars().take(8).collect()
    }

    /// A tracing span carrying this context.
    #[must_use]
    pub fn span(&self) -> tracing::Span {
        tracing::info_span!(
            "request",
            request_id = %self.short_id(),
            correlation_id = %self.correlation_id,
            component = %self.component,
            operation = self.operation.as_deref(),
            provider = self.provider.as_deref(),
        )
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new("unknown")
    }
}

/// Enters a context's span and logs completion when dropped.
///
/// Only for synchronous sections; async code should use
/// `tracing::Instrument` with [`RequestContext::span`].
pub struct RequestGuard {
    context: RequestContext,
    _span: tracing::span::EnteredSpan,
}

impl RequestGuard {
    /// Enter the context's span.
    #[must_use]
    pub fn new(context: RequestContext) -> Self {
        let span = context.span().entered();
        tracing::trace!("Request started");
        Self {
            context,
            _span: span,
        }
    }
}

impl Drop for RequestGuard {
    fn drop(&mut self) {
        tracing::trace!(elapsed_ms = self.context.elapsed_ms(), "Request completed");
    }
}
