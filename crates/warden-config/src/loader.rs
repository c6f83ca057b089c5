//! Config file discovery and layered loading.
//!
//! Layers, lowest precedence first:
//! 1. Embedded `defaults.toml`
//! 2. `/etc/warden/config.toml` (system)
//! 3. `$XDG_CONFIG_HOME/warden/config.toml` (user)
//! 4. The explicit `--config` file, or else `./warden.toml`
//! 5. `WARDEN_<SECTION>_<KEY>` environment variables
//!
//! `${VAR}` references in string values are then resolved, the tree is
//! deserialized and the result validated.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info};

use crate::env::{apply_env_overrides, collect_env_vars, resolve_env_references};
use crate::error::{ConfigError, ConfigResult};
use crate::merge::deep_merge;
use crate::types::Config;
use crate::validate;

/// Embedded default configuration.
pub(crate) const DEFAULTS_TOML: &str = include_str!("defaults.toml");

/// System-wide configuration file.
pub const SYSTEM_CONFIG_PATH: &str = "/etc/warden/config.toml";

/// Configuration file picked up from the working directory.
pub const LOCAL_CONFIG_FILE: &str = "warden.toml";

/// Maximum allowed config file size (1 MiB).
pub const MAX_CONFIG_FILE_SIZE: u64 = 1_048_576;

/// A loaded configuration together with where it came from.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// The validated configuration.
    pub config: Config,
    /// Files that contributed, lowest precedence first.
    pub loaded_files: Vec<String>,
    /// Dotted paths set from the environment.
    pub env_overrides: Vec<String>,
}

impl ResolvedConfig {
    /// Render the effective configuration as TOML. Secrets are omitted.
    ///
    /// # Errors
    ///
    /// Returns an error if a value cannot be represented in TOML.
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(&self.config)
    }

    /// Render the effective configuration and its sources as JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> serde_json::Result<String> {
        #[derive(Serialize)]
        struct Shown<'a> {
            config: &'a Config,
            loaded_files: &'a [String],
            env_overrides: &'a [String],
        }
        serde_json::to_string_pretty(&Shown {
            config: &self.config,
            loaded_files: &self.loaded_files,
            env_overrides: &self.env_overrides,
        })
    }
}

/// Builder for the layered load. Every layer can be redirected or disabled.
#[derive(Debug, Clone)]
pub struct Loader {
    system_file: Option<PathBuf>,
    user_file: Option<PathBuf>,
    local_file: Option<PathBuf>,
    explicit_file: Option<PathBuf>,
    env: HashMap<String, String>,
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}

impl Loader {
    /// Standard locations and the process environment.
    #[must_use]
    pub fn new() -> Self {
        Self {
            system_file: Some(PathBuf::from(SYSTEM_CONFIG_PATH)),
            user_file: user_config_path(),
            local_file: Some(PathBuf::from(LOCAL_CONFIG_FILE)),
            explicit_file: None,
            env: collect_env_vars(),
        }
    }

    /// No files and an empty environment: defaults only.
    #[must_use]
    pub fn isolated() -> Self {
        Self {
            system_file: None,
            user_file: None,
            local_file: None,
            explicit_file: None,
            env: HashMap::new(),
        }
    }

    /// Override (or disable) the system file.
    #[must_use]
    pub fn system_file(mut self, path: Option<PathBuf>) -> Self {
        self.system_file = path;
        self
    }

    /// Override (or disable) the user file.
    #[must_use]
    pub fn user_file(mut self, path: Option<PathBuf>) -> Self {
        self.user_file = path;
        self
    }

    /// Override (or disable) the working-directory file.
    #[must_use]
    pub fn local_file(mut self, path: Option<PathBuf>) -> Self {
        self.local_file = path;
        self
    }

    /// Use an explicit file instead of the working-directory file. Unlike
    /// the discovered layers it must exist.
    #[must_use]
    pub fn explicit_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.explicit_file = Some(path.into());
        self
    }

    /// Replace the environment used for overrides and `${VAR}` references.
    #[must_use]
    pub fn env(mut self, env: HashMap<String, String>) -> Self {
        self.env = env;
        self
    }

    /// Run the layered load.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if a file is unreadable, oversized or
    /// malformed, an override does not parse, or validation fails.
    pub fn load(&self) -> ConfigResult<ResolvedConfig> {
        let defaults = parse_toml("<embedded defaults>", DEFAULTS_TOML)?;
        let mut merged = defaults.clone();
        let mut loaded_files = Vec::new();

        let discovered = [
            ("system", self.system_file.as_deref()),
            ("user", self.user_file.as_deref()),
        ];
        for (layer, path) in discovered {
            let Some(path) = path else { continue };
            if let Some(overlay) = try_load_file(path)? {
                deep_merge(&mut merged, &overlay);
                loaded_files.push(path.display().to_string());
                info!(path = %path.display(), layer, "loaded config file");
            }
        }

        if let Some(path) = &self.explicit_file {
            let overlay = read_file(path)?;
            deep_merge(&mut merged, &overlay);
            loaded_files.push(path.display().to_string());
            info!(path = %path.display(), layer = "explicit", "loaded config file");
        } else if let Some(path) = &self.local_file {
            if let Some(overlay) = try_load_file(path)? {
                deep_merge(&mut merged, &overlay);
                loaded_files.push(path.display().to_string());
                info!(path = %path.display(), layer = "local", "loaded config file");
            }
        }

        let env_overrides = apply_env_overrides(&mut merged, &defaults, &self.env)?;
        if !env_overrides.is_empty() {
            debug!(count = env_overrides.len(), "applied environment overrides");
        }

        resolve_env_references(&mut merged, &self.env);
        let config = into_config(merged)?;
        validate::validate(&config)?;

        Ok(ResolvedConfig {
            config,
            loaded_files,
            env_overrides,
        })
    }
}

/// Load a single file layered over the embedded defaults only.
///
/// # Errors
///
/// Returns a [`ConfigError`] if the file cannot be read or parsed, or the
/// result fails validation.
pub fn load_file(path: &Path) -> ConfigResult<Config> {
    let mut merged = parse_toml("<embedded defaults>", DEFAULTS_TOML)?;
    deep_merge(&mut merged, &read_file(path)?);
    let config = into_config(merged)?;
    validate::validate(&config)?;
    Ok(config)
}

/// Default location of the user file (`$XDG_CONFIG_HOME/warden/config.toml`
/// on Linux).
#[must_use]
pub fn user_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "warden").map(|dirs| dirs.config_dir().join("config.toml"))
}

fn into_config(merged: toml::Value) -> ConfigResult<Config> {
    merged
        .try_into()
        .map_err(|e: toml::de::Error| ConfigError::ParseError {
            path: "<merged config>".to_owned(),
            source: e,
        })
}

fn parse_toml(label: &str, content: &str) -> ConfigResult<toml::Value> {
    toml::from_str(content).map_err(|e| ConfigError::ParseError {
        path: label.to_owned(),
        source: e,
    })
}

/// Read a file that must exist.
fn read_file(path: &Path) -> ConfigResult<toml::Value> {
    match try_load_file(path)? {
        Some(value) => Ok(value),
        None => Err(ConfigError::ReadError {
            path: path.display().to_string(),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        }),
    }
}

/// Read a file, returning `None` if it does not exist.
fn try_load_file(path: &Path) -> ConfigResult<Option<toml::Value>> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "config file not found, skipping");
            return Ok(None);
        },
        Err(e) => {
            return Err(ConfigError::ReadError {
                path: path.display().to_string(),
                source: e,
            });
        },
    };

    // Size is checked after the read so there is no stat/read race.
    let len = u64::try_from(content.len()).unwrap_or(u64::MAX);
    if len > MAX_CONFIG_FILE_SIZE {
        return Err(ConfigError::invalid(
            path.display().to_string(),
            format!("config file is {len} bytes, exceeding the {MAX_CONFIG_FILE_SIZE} byte limit"),
        ));
    }

    parse_toml(&path.display().to_string(), &content).map(Some)
}
