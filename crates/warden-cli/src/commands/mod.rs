//! Subcommand implementations.

pub(crate) mod authorize;
pub(crate) mod check_config;
pub(crate) mod inspect;
pub(crate) mod issue;
pub(crate) mod keys;
pub(crate) mod version;

use std::path::Path;

use anyhow::{Context, Result};
use tracing::debug;
use warden_auth::AuthService;
use warden_config::{Config, ResolvedConfig};

/// Load the layered configuration, honouring `--config`.
pub(crate) fn load_config(explicit: Option<&Path>) -> Result<ResolvedConfig> {
    Config::load(explicit).context("failed to load configuration")
}

/// Load the configuration and build the service from it.
pub(crate) fn load_service(explicit: Option<&Path>) -> Result<AuthService> {
    let resolved = load_config(explicit)?;
    debug!(
        files = resolved.loaded_files.len(),
        env_overrides = resolved.env_overrides.len(),
        "Configuration loaded"
    );
    AuthService::from_config(&resolved.config).context("failed to start the auth service")
}
