//! Inspect command: validate a credential and show what it carries.

use std::path::Path;

use anyhow::Result;

use super::load_service;
use super::issue::read_secret;
use crate::output::{OutputFormat, credential_json, print_credential, print_json};
use crate::theme::Theme;

/// Validate `token` (signature, then expiry) and print its contents.
pub(crate) fn run(explicit: Option<&Path>, token: String, format: OutputFormat) -> Result<()> {
    let token = read_secret(token)?;
    let service = load_service(explicit)?;
    let credential = service.validate(&token)?;

    match format {
        OutputFormat::Json => print_json(&credential_json(&credential)?),
        OutputFormat::Pretty => {
            println!("{}", Theme::success("Credential is valid."));
            print_credential(&credential);
            Ok(())
        },
    }
}
