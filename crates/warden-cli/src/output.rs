//! Shared rendering for pretty and JSON output.

use anyhow::Result;
use clap::ValueEnum;
use serde_json::{Value, json};
use warden_capabilities::{GrantSet, VerifiedCredential};

use crate::theme::Theme;

/// Output mode selected with `--format`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    /// Human-readable text.
    Pretty,
    /// One JSON document on stdout.
    Json,
}

/// Print a JSON document to stdout.
pub(crate) fn print_json(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Grants as a JSON array.
pub(crate) fn grants_json(grants: &GrantSet) -> Result<Value> {
    Ok(serde_json::to_value(grants)?)
}

/// Grants formatted one per line.
pub(crate) fn grant_lines(grants: &GrantSet) -> Vec<String> {
    if grants.is_empty() {
        return vec![format!("  {}", Theme::note("(no grants)"))];
    }
    grants.iter().map(Theme::grant).collect()
}

/// A validated credential as JSON.
pub(crate) fn credential_json(credential: &VerifiedCredential) -> Result<Value> {
    Ok(json!({
        "credential_id": credential.id().to_string(),
        "subject": credential.subject(),
        "provider": credential.provider().as_str(),
        "issued_at": credential.issued_at().to_string(),
        "expires_at": credential.expires_at().to_string(),
        "key_id": hex::encode(credential.verified_by()),
        "grants": grants_json(credential.grants())?,
    }))
}

/// Print a validated credential.
pub(crate) fn print_credential(credential: &VerifiedCredential) {
    println!("{}", Theme::field("Credential", &credential.id().to_string()));
    println!("{}", Theme::field("Subject", credential.subject()));
    println!("{}", Theme::field("Provider", credential.provider().as_str()));
    println!("{}", Theme::field("Issued at", &credential.issued_at().to_string()));
    println!("{}", Theme::field("Expires at", &credential.expires_at().to_string()));
    println!("{}", Theme::field("Signed by", &hex::encode(credential.verified_by())));
    println!("\n{}", Theme::header("Grants"));
    for line in grant_lines(credential.grants()) {
        println!("{line}");
    }
}
