//! Warden Telemetry - logging setup and request correlation.
//!
//! This crate provides:
//! - Configurable logging setup with multiple formats and targets
//! - Request context for correlating the events of one facade call
//!
//! # Example
//!
//! ```rust,no_run
//! use warden_telemetry::{LogConfig, LogFormat, RequestContext, setup_logging};
//!
//! # fn main() -> Result<(), warden_telemetry::TelemetryError> {
//! let config = LogConfig::new("info")
//!     .with_format(LogFormat::Pretty)
//!     .with_directive("warden_identity=debug");
//!
//! setup_logging(&config)?;
//!
//! let ctx = RequestContext::new("auth")
//!     .with_operation("issue_credential")
//!     .with_provider("github");
//!
//! let span = ctx.span();
//! let _guard = span.enter();
//! tracing::info!("verifying identity");
//! # Ok(())
//! # }
//! ```
//!
//! With the `config` feature, a [`LogConfig`] can be built from the
//! `[logging]` section of `warden-config`.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod context;
mod error;
mod logging;

pub use context::{RequestContext, RequestGuard};
pub use error::{TelemetryError, TelemetryResult};
pub use logging::{DEFAULT_FILE_PREFIX, FileRotation, LogConfig, LogFormat, LogTarget, setup_logging};
