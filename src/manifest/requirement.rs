//! PEP 508 requirement strings
//!
//! A requirement is split into the parts that must survive a rewrite
//! verbatim (name, extras, spacing, marker) and the specifier that the
//! upgrader replaces.

use crate::domain::{DependencySpec, SourceKind};
use regex::Regex;
use std::sync::LazyLock;

// name, optional [extras], then everything else
static PEP508_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<head>\s*(?P<name>[a-zA-Z0-9][-a-zA-Z0-9._]*)\s*(?:\[(?P<extras>[^\]]*)\])?)(?P<rest>.*)$")
        .unwrap()
});

/// A parsed requirement string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
    /// Distribution name as written
    pub name: String,
    /// Requested extras
    pub extras: Vec<String>,
    /// Version specifier, empty when unconstrained
    pub specifier: String,
    /// Direct reference after `@`
    pub url: Option<String>,
    /// Environment marker after `;`
    pub markers: Option<String>,
    head: String,
    gap: String,
    parenthesized: bool,
    tail: String,
}

impl Requirement {
    /// Parses a requirement string; `None` if it does not start with a valid name
    pub fn parse(text: &str) -> Option<Self> {
        let caps = PEP508_RE.captures(text)?;
        let head = caps.name("head")?.as_str().to_string();
        let name = caps.name("name")?.as_str().to_string();
        let extras = caps
            .name("extras")
            .map(|m| {
                m.as_str()
                    .split(',')
                    .map(|e| e.trim().to_string())
                    .filter(|e| !e.is_empty())
                    .collect()
            })
            .unwrap_or_default();
        let rest = caps.name("rest").map_or("", |m| m.as_str());

        let (spec_part, marker_part) = match rest.find(';') {
            Some(idx) => (&rest[..idx], &rest[idx..]),
            None => (rest, ""),
        };
        let markers = marker_part
            .strip_prefix(';')
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty());

        let gap_len = spec_part.len() - spec_part.trim_start().len();
        let gap = spec_part[..gap_len].to_string();
        let body = spec_part.trim();
        let trailing = &spec_part[gap_len + body.len()..];
        let tail = format!("{}{}", trailing, marker_part);

        if let Some(url) = body.strip_prefix('@') {
            return Some(Self {
                name,
                extras,
                specifier: String::new(),
                url: Some(url.trim().to_string()),
                markers,
                head,
                gap,
                parenthesized: false,
                tail,
            });
        }

        let (specifier, parenthesized) = match body
            .strip_prefix('(')
            .and_then(|b| b.strip_suffix(')'))
        {
            Some(inner) => (inner.trim().to_string(), true),
            None => (body.to_string(), false),
        };

        // Anything that is not a comparator expression is not a requirement
        if !specifier.is_empty() && !specifier.starts_with(['<', '>', '=', '!', '~', '^']) {
            return None;
        }

        Some(Self {
            name,
            extras,
            specifier,
            url: None,
            markers,
            head,
            gap,
            parenthesized,
            tail,
        })
    }

    /// Where the requirement is fetched from
    pub fn source_kind(&self) -> SourceKind {
        match &self.url {
            None => SourceKind::Registry,
            Some(url) if url.starts_with("git+") => SourceKind::Git,
            Some(url) if url.starts_with("file:") || url.starts_with('.') || url.starts_with('/') => {
                SourceKind::Path
            }
            Some(_) => SourceKind::Url,
        }
    }

    /// Rebuilds the string with a new specifier, keeping everything else verbatim
    pub fn with_specifier(&self, specifier: &str) -> String {
        let body = if self.parenthesized {
            format!("({})", specifier)
        } else {
            specifier.to_string()
        };
        format!("{}{}{}{}", self.head, self.gap, body, self.tail)
    }

    /// Converts to a dependency declaration
    pub fn to_spec(&self, group: &str) -> DependencySpec {
        let constraint = if self.specifier.is_empty() {
            None
        } else {
            Some(self.specifier.clone())
        };
        let mut spec = DependencySpec::new(&self.name, constraint, group)
            .with_source(self.source_kind())
            .with_extras(self.extras.clone());
        if let Some(markers) = &self.markers {
            spec = spec.with_markers(markers);
        }
        spec
    }
}

/// Builds a fresh requirement string for an appended entry
pub fn format_requirement(name: &str, specifier: &str) -> String {
    format!("{}{}", name, specifier)
}
