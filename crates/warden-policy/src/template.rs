//! Namespace templates with `{claim}` placeholders.
//!
//! A template such as `github.com/{owner}` or `corp/{groups}/*` is rendered
//! by substituting claim values. Every substituted value must be a valid
//! single namespace segment; anything else (a `/`, a `*`, whitespace, an
//! empty string) is dropped so identity data can never widen a namespace.

use std::fmt;

use tracing::warn;
use warden_capabilities::{Namespace, NamespacePattern, is_valid_segment};
use warden_core::{ClaimSet, ClaimValue};

use crate::error::{RuleConfigError, RuleConfigResult};

/// Upper bound on the values one template may expand to.
pub const MAX_EXPANSIONS: usize = 256;

const SAMPLE_SEGMENT: &str = "x";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Piece {
    Literal(String),
    Placeholder(String),
}

/// A parsed namespace template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceTemplate {
    source: String,
    pieces: Vec<Piece>,
}

impl NamespaceTemplate {
    /// Parse a template.
    ///
    /// # Errors
    ///
    /// Returns [`RuleConfigError::InvalidTemplate`] on unbalanced braces or
    /// an empty or non-identifier placeholder name.
    pub fn parse(source: &str) -> RuleConfigResult<Self> {
        let invalid = |reason: &str| RuleConfigError::InvalidTemplate {
            template: source.to_string(),
            reason: reason.to_string(),
        };

        let mut pieces = Vec::new();
        let mut literal = String::new();
        let mut chars = source.chars();
        while let Some(c) = chars.next() {
            match c {
                '{' => {
                    let mut name = String::new();
                    loop {
                        match chars.next() {
                            Some('}') => break,
                            Some('{') | None => return Err(invalid("unclosed '{'")),
                            Some(c) => name.push(c),
                        }
                    }
                    if name.is_empty() {
                        return Err(invalid("empty placeholder"));
                    }
                    if !name
                        .chars()
                        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | ':'))
                    {
                        return Err(invalid("placeholder names may only contain [A-Za-z0-9_.:-]"));
                    }
                    if !literal.is_empty() {
                        pieces.push(Piece::Literal(std::mem::take(&mut literal)));
                    }
                    pieces.push(Piece::Placeholder(name));
                },
                '}' => return Err(invalid("unmatched '}'")),
                c => literal.push(c),
            }
        }
        if !literal.is_empty() {
            pieces.push(Piece::Literal(literal));
        }

        Ok(Self {
            source: source.to_string(),
            pieces,
        })
    }

    /// Parse a template that must render to a valid namespace pattern.
    ///
    /// # Errors
    ///
    /// As [`NamespaceTemplate::parse`], plus [`RuleConfigError::InvalidTemplate`]
    /// when substituting a plain segment for every placeholder does not yield
    /// a valid pattern (e.g. `acme*`, `a//{x}`).
    pub fn parse_pattern(source: &str) -> RuleConfigResult<Self> {
        let template = Self::parse(source)?;
        let sample = template.render_with(|_| SAMPLE_SEGMENT.to_string());
        NamespacePattern::parse(&sample).map_err(|e| RuleConfigError::InvalidTemplate {
            template: source.to_string(),
            reason: e.to_string(),
        })?;
        Ok(template)
    }

    /// Parse an owner template: only `{owner}` placeholders, at least one,
    /// rendering to a valid namespace.
    ///
    /// # Errors
    ///
    /// Returns [`RuleConfigError::InvalidTemplate`] otherwise.
    pub fn parse_owner(source: &str) -> RuleConfigResult<Self> {
        let template = Self::parse(source)?;
        let invalid = |reason: String| RuleConfigError::InvalidTemplate {
            template: source.to_string(),
            reason,
        };

        if !template.placeholders().any(|p| p == "owner") {
            return Err(invalid("must contain {owner}".to_string()));
        }
        if let Some(other) = template.placeholders().find(|p| *p != "owner") {
            return Err(invalid(format!("unknown placeholder {{{other}}}")));
        }
        let sample = template.render_with(|_| SAMPLE_SEGMENT.to_string());
        Namespace::new(sample).map_err(|e| invalid(e.to_string()))?;
        Ok(template)
    }

    /// The template text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Placeholder names in order of appearance.
    pub fn placeholders(&self) -> impl Iterator<Item = &str> {
        self.pieces.iter().filter_map(|p| match p {
            Piece::Placeholder(name) => Some(name.as_str()),
            Piece::Literal(_) => None,
        })
    }

    /// Render with a single value per placeholder.
    fn render_with(&self, mut value_of: impl FnMut(&str) -> String) -> String {
        let mut out = String::new();
        for piece in &self.pieces {
            match piece {
                Piece::Literal(text) => out.push_str(text),
                Piece::Placeholder(name) => out.push_str(&value_of(name)),
            }
        }
        out
    }

    /// Render an owner template for `owner`.
    ///
    /// Returns `None` (and logs) if `owner` is not a valid segment.
    #[must_use]
    pub fn render_owner(&self, owner: &str) -> Option<Namespace> {
        if !is_valid_segment(owner) {
            warn!(template = %self.source, value = owner, "Skipping owner that is not a valid namespace segment");
            return None;
        }
        Namespace::new(self.render_with(|_| owner.to_string())).ok()
    }

    /// Render against a claim set, expanding list claims into one result
    /// per element (the cartesian product when several placeholders are
    /// lists).
    ///
    /// A missing claim yields nothing. Values that are not valid segments
    /// are skipped with a warning.
    #[must_use]
    pub fn render_claims(&self, claims: &ClaimSet) -> Vec<NamespacePattern> {
        let mut partials = vec![String::new()];

        for piece in &self.pieces {
            match piece {
                Piece::Literal(text) => {
                    for partial in &mut partials {
                        partial.push_str(text);
                    }
                },
                Piece::Placeholder(name) => {
                    let values = self.segment_values(claims, name);
                    let mut next = Vec::new();
                    'outer: for partial in &partials {
                        for value in &values {
                            if next.len() >= MAX_EXPANSIONS {
                                warn!(template = %self.source, limit = MAX_EXPANSIONS, "Template expansion truncated");
                                break 'outer;
                            }
                            next.push(format!("{partial}{value}"));
                        }
                    }
                    partials = next;
                    if partials.is_empty() {
                        return Vec::new();
                    }
                },
            }
        }

        partials
            .into_iter()
            .filter_map(|rendered| match NamespacePattern::parse(&rendered) {
                Ok(pattern) => Some(pattern),
                Err(e) => {
                    warn!(template = %self.source, error = %e, "Rendered namespace is invalid");
                    None
                },
            })
            .collect()
    }

    fn segment_values(&self, claims: &ClaimSet, name: &str) -> Vec<String> {
        let raw: Vec<String> = match claims.get(name) {
            None => return Vec::new(),
            Some(ClaimValue::List(items)) => items.clone(),
            Some(value @ (ClaimValue::String(_) | ClaimValue::Number(_) | ClaimValue::Bool(_))) => {
                vec![value.to_string()]
            },
        };
        raw.into_iter()
            .filter(|value| {
                let ok = is_valid_segment(value);
                if !ok {
                    warn!(
                        template = %self.source,
                        claim = name,
                        value = %value,
                        "Skipping claim value that is not a valid namespace segment"
                    );
                }
                ok
            })
            .collect()
    }
}

impl fmt::Display for NamespaceTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}
