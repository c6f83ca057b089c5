//! Version command.

use anyhow::Result;
use serde_json::json;

use crate::output::{OutputFormat, print_json};

/// Print the binary name and version.
pub(crate) fn run(format: OutputFormat) -> Result<()> {
    let name = env!("CARGO_PKG_NAME");
    let version = env!("CARGO_PKG_VERSION");
    match format {
        OutputFormat::Json => print_json(&json!({ "name": name, "version": version })),
        OutputFormat::Pretty => {
            println!("warden {version}");
            Ok(())
        },
    }
}
