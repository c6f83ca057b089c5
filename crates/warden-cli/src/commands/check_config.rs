//! Check-config command: load, validate and build the service without
//! serving anything.

use std::path::Path;

use anyhow::{Context, Result};
use serde_json::json;
use warden_auth::AuthService;

use super::load_config;
use crate::output::{OutputFormat, print_json};
use crate::theme::Theme;

/// Validate the configuration end to end. With `show`, also print the
/// effective configuration (secrets omitted).
pub(crate) fn run(explicit: Option<&Path>, show: bool, format: OutputFormat) -> Result<()> {
    let resolved = load_config(explicit)?;
    let service = AuthService::from_config(&resolved.config)
        .context("configuration is valid but the auth service cannot start")?;

    let mut providers: Vec<&str> = service.enabled_providers().map(|p| p.as_str()).collect();
    providers.sort_unstable();
    let key = service.public_key();

    match format {
        OutputFormat::Json => {
            let effective = if show {
                serde_json::to_value(&resolved.config)?
            } else {
                serde_json::Value::Null
            };
            print_json(&json!({
                "valid": true,
                "loaded_files": resolved.loaded_files,
                "env_overrides": resolved.env_overrides,
                "providers": providers,
                "key_id": key.key_id_hex(),
                "config": effective,
            }))
        },
        OutputFormat::Pretty => {
            println!("{}", Theme::success("Configuration is valid."));
            if resolved.loaded_files.is_empty() {
                println!("{}", Theme::note("  (no config files found; using defaults)"));
            } else {
                println!("\n{}", Theme::header("Loaded files"));
                for path in &resolved.loaded_files {
                    println!("  - {path}");
                }
            }
            if !resolved.env_overrides.is_empty() {
                println!("\n{}", Theme::header("Environment overrides"));
                for field in &resolved.env_overrides {
                    println!("  - {field}");
                }
            }
            println!();
            println!("{}", Theme::field("Signing key", &key.key_id_hex()));
            let providers = if providers.is_empty() {
                "none".to_string()
            } else {
                providers.join(", ")
            };
            println!("{}", Theme::field("Providers", &providers));
            if service.enabled_providers().next().is_none() {
                println!(
                    "\n{}",
                    Theme::warning("No identity provider is enabled; no credential can be issued.")
                );
            }
            if show {
                println!("\n{}", Theme::header("Effective configuration"));
                println!("{}", resolved.to_toml()?);
            }
            Ok(())
        },
    }
}
