//! Prelude module - commonly used types for convenient import.
//!
//! Use `use warden_telemetry::prelude::*;` to import all essential types.
//!
//! # Example
//!
//! ```rust
//! use warden_telemetry::prelude::*;
//!
//! let ctx = RequestContext::new("auth").with_operation("issue");
//! let child = ctx.child("oidc");
//! assert_eq!(child.correlation_id, ctx.correlation_id);
//!
//! let config = LogConfig::new("debug").with_format(LogFormat::Json);
//! assert_eq!(config.level, "debug");
//! ```

// Errors
pub use crate::{TelemetryError, TelemetryResult};

// Logging
pub use crate::{FileRotation, LogConfig, LogFormat, LogTarget, setup_logging};

// Correlation
pub use crate::{RequestContext, RequestGuard};
