//! Keys command: manage the credential signing key.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde_json::json;
use warden_auth::load_signing_key;
use warden_crypto::KeyPair;

use super::load_config;
use crate::output::{OutputFormat, print_json};
use crate::theme::Theme;

/// Generate a signing key and write its hex seed to `out`, or to the
/// configured `signing.private_key_file` when `out` is not given.
///
/// Only the public half is printed.
pub(crate) fn generate(
    explicit_config: Option<&Path>,
    out: Option<&Path>,
    force: bool,
    format: OutputFormat,
) -> Result<()> {
    let path = match out {
        Some(path) => path.to_path_buf(),
        None => configured_key_file(explicit_config)?,
    };

    let key = KeyPair::generate();
    key.write_to_file(&path, force)
        .with_context(|| format!("failed to write key to {}", path.display()))?;
    let public = key.export_public_key();

    match format {
        OutputFormat::Json => print_json(&json!({
            "key_id": key.key_id_hex(),
            "public_key": public.to_hex(),
            "path": path.display().to_string(),
        })),
        OutputFormat::Pretty => {
            println!("{}", Theme::success("New signing key generated."));
            println!("{}", Theme::field("Key ID", &key.key_id_hex()));
            println!("{}", Theme::field("Public key", &public.to_hex()));
            println!("{}", Theme::field("Key file", &path.display().to_string()));
            if force {
                println!(
                    "\n{}",
                    Theme::warning(
                        "Credentials signed by a replaced key stop validating unless its public key is listed in signing.previous_public_keys."
                    )
                );
            }
            Ok(())
        },
    }
}

/// Show the public half of the configured signing key and the retired keys
/// still trusted.
pub(crate) fn show(explicit_config: Option<&Path>, format: OutputFormat) -> Result<()> {
    let resolved = load_config(explicit_config)?;
    let key = load_signing_key(&resolved.config.signing)?;
    let public = key.export_public_key();
    let previous = &resolved.config.signing.previous_public_keys;

    match format {
        OutputFormat::Json => print_json(&json!({
            "key_id": key.key_id_hex(),
            "public_key": public.to_hex(),
            "public_key_base64url": public.to_base64url(),
            "previous_public_keys": previous,
        })),
        OutputFormat::Pretty => {
            println!("{}", Theme::header("Signing key"));
            println!("{}", Theme::field("Key ID", &key.key_id_hex()));
            println!("{}", Theme::field("Public key", &public.to_hex()));
            println!("{}", Theme::field("Base64url", &public.to_base64url()));
            if !previous.is_empty() {
                println!("\n{}", Theme::header("Previous keys (validation only)"));
                for hex in previous {
                    println!("  - {hex}");
                }
            }
            Ok(())
        },
    }
}

fn configured_key_file(explicit_config: Option<&Path>) -> Result<PathBuf> {
    let resolved = load_config(explicit_config)?;
    let file = resolved.config.signing.private_key_file.trim();
    if file.is_empty() {
        bail!("no output path: pass --out or set signing.private_key_file");
    }
    Ok(PathBuf::from(file))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("signing.key");

        generate(None, Some(&path), false, OutputFormat::Json).unwrap();
        let first = KeyPair::load_from_file(&path).unwrap();

        assert!(generate(None, Some(&path), false, OutputFormat::Json).is_err());
        assert_eq!(KeyPair::load_from_file(&path).unwrap().key_id(), first.key_id());

        generate(None, Some(&path), true, OutputFormat::Json).unwrap();
        assert_ne!(KeyPair::load_from_file(&path).unwrap().key_id(), first.key_id());
    }
}
