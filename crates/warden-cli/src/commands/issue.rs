//! Issue command: verify an identity assertion and print a credential.

use std::io::Read as _;
use std::path::Path;

use anyhow::{Context, Result, bail};
use clap::Args;
use serde_json::json;
use warden_auth::IdentityAssertion;

use super::load_service;
use crate::output::{OutputFormat, grant_lines, grants_json, print_json};
use crate::theme::Theme;

/// Exactly one identity assertion. Secret values may be given as `-` to
/// read them from stdin instead of the command line.
#[derive(Debug, Args)]
#[group(required = true, multiple = false)]
pub(crate) struct AssertionArgs {
    /// OAuth authorization code from the repository host
    #[arg(long, value_name = "CODE")]
    github_code: Option<String>,

    /// User access token from the repository host
    #[arg(long, value_name = "TOKEN")]
    github_token: Option<String>,

    /// CI workflow identity token
    #[arg(long, value_name = "TOKEN")]
    github_actions_token: Option<String>,

    /// Identity token from the configured OIDC issuer
    #[arg(long, value_name = "TOKEN")]
    oidc_token: Option<String>,

    /// Request an anonymous credential
    #[arg(long)]
    anonymous: bool,
}

impl AssertionArgs {
    pub(crate) fn into_assertion(self) -> Result<IdentityAssertion> {
        let assertion = if let Some(code) = self.github_code {
            IdentityAssertion::GithubCode { code: read_secret(code)? }
        } else if let Some(token) = self.github_token {
            IdentityAssertion::GithubAccessToken { token: read_secret(token)? }
        } else if let Some(token) = self.github_actions_token {
            IdentityAssertion::GithubActionsToken { token: read_secret(token)? }
        } else if let Some(token) = self.oidc_token {
            IdentityAssertion::OidcToken { token: read_secret(token)? }
        } else if self.anonymous {
            IdentityAssertion::Anonymous
        } else {
            bail!("an identity assertion is required");
        };
        Ok(assertion)
    }
}

/// Resolve `-` to the first line of stdin.
pub(crate) fn read_secret(value: String) -> Result<String> {
    if value != "-" {
        return Ok(value);
    }
    let mut input = String::new();
    std::io::stdin()
        .read_to_string(&mut input)
        .context("failed to read from stdin")?;
    Ok(input.lines().next().unwrap_or_default().trim().to_string())
}

/// Issue a credential for the assertion.
pub(crate) async fn run(explicit: Option<&Path>, args: AssertionArgs, format: OutputFormat) -> Result<()> {
    let assertion = args.into_assertion()?;
    let service = load_service(explicit)?;
    let issued = service.issue_credential(&assertion).await?;
    let credential = issued.credential();

    match format {
        OutputFormat::Json => print_json(&json!({
            "token": issued.token(),
            "credential_id": credential.id.to_string(),
            "subject": credential.subject,
            "provider": credential.provider.as_str(),
            "issued_at": credential.issued_at.to_string(),
            "expires_at": credential.expires_at.to_string(),
            "grants": grants_json(&credential.grants)?,
        })),
        OutputFormat::Pretty => {
            eprintln!("{}", Theme::success("Credential issued."));
            eprintln!("{}", Theme::field("Subject", &credential.subject));
            eprintln!("{}", Theme::field("Provider", credential.provider.as_str()));
            eprintln!("{}", Theme::field("Expires at", &credential.expires_at.to_string()));
            eprintln!("\n{}", Theme::header("Grants"));
            if credential.grants.is_empty() {
                eprintln!("{}", Theme::warning("The credential carries no grants."));
            }
            for line in grant_lines(&credential.grants) {
                eprintln!("{line}");
            }
            eprintln!();
            println!("{}", issued.token());
            Ok(())
        },
    }
}
