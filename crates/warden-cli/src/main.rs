//! Warden CLI - operate the registry credential service.
//!
//! Checks configuration, manages the signing key, issues credentials for
//! identity assertions, and inspects or authorizes credentials. Logs go to
//! stderr; command output goes to stdout.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use warden_telemetry::{LogConfig, LogFormat, setup_logging};

mod commands;
mod output;
mod theme;

use commands::{authorize, check_config, inspect, issue, keys, version};
use output::OutputFormat;

/// Warden - namespace-scoped registry credentials
#[derive(Parser)]
#[command(name = "warden")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file (replaces ./warden.toml in the precedence chain)
    #[arg(short, long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Output format
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Pretty)]
    format: OutputFormat,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load and validate the configuration, then build the service
    CheckConfig {
        /// Also print the effective configuration (secrets omitted)
        #[arg(long)]
        show: bool,
    },

    /// Manage the credential signing key
    Keys {
        #[command(subcommand)]
        command: KeyCommands,
    },

    /// Verify an identity assertion and issue a credential
    Issue {
        #[command(flatten)]
        assertion: issue::AssertionArgs,
    },

    /// Validate a credential and show its contents
    Inspect {
        /// Encoded credential, or `-` to read it from stdin
        token: String,
    },

    /// Check whether a credential may exercise a capability on a namespace
    Authorize {
        /// Encoded credential, or `-` to read it from stdin
        token: String,
        /// Namespace, e.g. `github.com/alice/tool`
        namespace: String,
        /// `edit` or `publish`
        capability: String,
    },

    /// Print version information
    Version,
}

#[derive(Subcommand)]
enum KeyCommands {
    /// Generate a new signing key
    Generate {
        /// Where to write the key (defaults to signing.private_key_file)
        #[arg(long, value_name = "PATH")]
        out: Option<PathBuf>,
        /// Replace an existing key file
        #[arg(long)]
        force: bool,
    },
    /// Show the public half of the configured signing key
    Show,
}

fn init_logging(cli: &Cli) {
    // Config errors are reported by the command itself.
    let from_config = warden_config::Config::load(cli.config.as_deref())
        .ok()
        .and_then(|resolved| LogConfig::try_from(&resolved.config.logging).ok());
    let mut log_config =
        from_config.unwrap_or_else(|| LogConfig::new("warn").with_format(LogFormat::Compact));
    if cli.verbose {
        "debug".clone_into(&mut log_config.level);
    }
    if let Err(e) = setup_logging(&log_config) {
        eprintln!("Failed to initialize logging: {e}");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli);

    let config = cli.config.as_deref();
    let format = cli.format;
    match cli.command {
        Commands::CheckConfig { show } => check_config::run(config, show, format),
        Commands::Keys { command } => match command {
            KeyCommands::Generate { out, force } => keys::generate(config, out.as_deref(), force, format),
            KeyCommands::Show => keys::show(config, format),
        },
        Commands::Issue { assertion } => issue::run(config, assertion, format).await,
        Commands::Inspect { token } => inspect::run(config, token, format),
        Commands::Authorize {
            token,
            namespace,
            capability,
        } => authorize::run(config, token, &namespace, &capability, format),
        Commands::Version => version::run(format),
    }
}
