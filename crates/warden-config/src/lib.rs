//! Layered configuration for Warden.
//!
//! This crate provides a single [`Config`] type covering credential
//! lifetime, signing keys, provider endpoints, permission rules, anonymous
//! access and logging.
//!
//! # Usage
//!
//! ```rust,no_run
//! use warden_config::Config;
//!
//! let resolved = Config::load(None).unwrap();
//! println!("credential ttl: {}s", resolved.config.credentials.ttl_secs);
//! ```
//!
//! # Configuration Precedence
//!
//! From highest to lowest priority:
//!
//! 1. `${VAR}` references inside string values
//! 2. **Environment** (`WARDEN_<SECTION>_<KEY>`)
//! 3. **Explicit** (`--config PATH`), or `./warden.toml` when none is given
//! 4. **User** (`$XDG_CONFIG_HOME/warden/config.toml`)
//! 5. **System** (`/etc/warden/config.toml`)
//! 6. **Embedded defaults** (`defaults.toml` compiled into the binary)
//!
//! The merged result is validated before it is returned, including
//! compiling every permission rule, so configuration mistakes surface at
//! startup.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

/// Environment overrides and `${VAR}` resolution.
pub mod env;
/// Configuration error types.
pub mod error;
/// Configuration file discovery and loading.
pub mod loader;
/// Deep merge of TOML layers.
pub mod merge;
/// Configuration struct definitions.
pub mod types;
/// Configuration validation rules.
pub mod validate;

pub use error::{ConfigError, ConfigResult};
pub use loader::{Loader, ResolvedConfig};
pub use types::*;

impl Config {
    /// Load with the full precedence chain from the standard locations.
    /// `explicit` replaces the working-directory `warden.toml`.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if any layer is malformed or the result
    /// fails validation.
    pub fn load(explicit: Option<&std::path::Path>) -> ConfigResult<ResolvedConfig> {
        let loader = Loader::new();
        match explicit {
            Some(path) => loader.explicit_file(path).load(),
            None => loader.load(),
        }
    }

    /// Load a single file over the embedded defaults (no other layers).
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the file cannot be read, parsed, or
    /// fails validation.
    pub fn load_file(path: &std::path::Path) -> ConfigResult<Self> {
        loader::load_file(path)
    }
}
