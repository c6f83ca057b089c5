//! Terminal styling for human-readable output.

use colored::{ColoredString, Colorize};
use warden_capabilities::PermissionGrant;
use warden_core::Capability;

/// Width of the label column in [`Theme::field`] lines.
const LABEL_WIDTH: usize = 14;

/// Styling helpers shared by the pretty output of every command.
pub(crate) struct Theme;

impl Theme {
    pub(crate) fn header(text: &str) -> String {
        text.bold().cyan().to_string()
    }

    /// A completed action, prefixed with a check mark.
    pub(crate) fn success(text: &str) -> String {
        format!("{} {text}", "✓".green().bold())
    }

    pub(crate) fn warning(text: &str) -> String {
        format!("{} {}", "!".yellow().bold(), text.yellow())
    }

    /// Secondary detail such as provenance or placeholder text.
    pub(crate) fn note(text: &str) -> String {
        text.dimmed().to_string()
    }

    /// A labelled value, with labels padded so that values line up.
    pub(crate) fn field(label: &str, value: &str) -> String {
        let label = format!("{label}:");
        format!("  {} {value}", format!("{label:<width$}", width = LABEL_WIDTH).bold())
    }

    /// The outcome of an authorization query.
    pub(crate) fn verdict(allowed: bool, capability: Capability, namespace: &str) -> String {
        let (mark, word) = if allowed {
            ("✓".green().bold(), "allowed".green())
        } else {
            ("✗".red().bold(), "denied".red())
        };
        format!(
            "{mark} {} on {} is {word}",
            Self::capability(capability),
            namespace.bold()
        )
    }

    /// One grant as an aligned row: capability, pattern, provenance.
    pub(crate) fn grant(grant: &PermissionGrant) -> String {
        let capability = format!("{:<8}", grant.capability.as_str());
        let pattern = format!("{:<40}", grant.pattern.to_string());
        format!(
            "  {} {pattern} {}",
            Self::paint(grant.capability, &capability),
            Self::note(&grant.provenance)
        )
    }

    fn capability(capability: Capability) -> ColoredString {
        Self::paint(capability, capability.as_str())
    }

    fn paint(capability: Capability, text: &str) -> ColoredString {
        match capability {
            Capability::Publish => text.blue(),
            Capability::Edit => text.magenta(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_rendering() {
        colored::control::set_override(false);
        assert_eq!(Theme::field("Subject", "alice"), "  Subject:       alice");
        assert_eq!(
            Theme::verdict(false, Capability::Edit, "corp/tools"),
            "✗ edit on corp/tools is denied"
        );
    }
}
