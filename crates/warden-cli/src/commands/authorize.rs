//! Authorize command: answer one namespace/capability query.

use std::path::Path;

use anyhow::{Result, anyhow};
use serde_json::json;
use warden_core::{AuthError, Capability};

use super::load_service;
use super::issue::read_secret;
use crate::output::{OutputFormat, print_json};
use crate::theme::Theme;

/// Check whether `token` may exercise `capability` on `namespace`. A denial
/// is reported and exits non-zero.
pub(crate) fn run(
    explicit: Option<&Path>,
    token: String,
    namespace: &str,
    capability: &str,
    format: OutputFormat,
) -> Result<()> {
    let capability: Capability = capability
        .parse()
        .map_err(|e| anyhow!("invalid capability: {e}"))?;
    let token = read_secret(token)?;
    let service = load_service(explicit)?;

    match service.authorize(&token, namespace, capability) {
        Ok(grant) => match format {
            OutputFormat::Json => print_json(&json!({
                "allowed": true,
                "namespace": namespace,
                "capability": capability.as_str(),
                "grant": grant,
            })),
            OutputFormat::Pretty => {
                println!("{}", Theme::verdict(true, capability, namespace));
                println!("{}", Theme::field("Pattern", &grant.pattern.to_string()));
                println!("{}", Theme::field("Provenance", &grant.provenance));
                Ok(())
            },
        },
        Err(err @ AuthError::AuthorizationDenied { .. }) => {
            if format == OutputFormat::Json {
                print_json(&json!({
                    "allowed": false,
                    "namespace": namespace,
                    "capability": capability.as_str(),
                    "status": err.status_class().code(),
                }))?;
            } else {
                println!("{}", Theme::verdict(false, capability, namespace));
            }
            Err(err.into())
        },
        Err(err) => Err(err.into()),
    }
}
