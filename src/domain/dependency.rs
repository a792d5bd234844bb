//! Dependency information structures

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

/// Name of the group that holds runtime dependencies
pub const MAIN_GROUP: &str = "main";

/// PEP 508 distribution name
static NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?i)[a-z0-9]([a-z0-9._-]*[a-z0-9])?$").unwrap());

/// Runs of separators collapsed by normalization
static SEPARATOR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[-_.]+").unwrap());

/// Normalizes a distribution name (PEP 503): lowercase, separator runs become `-`
pub fn normalize_name(name: &str) -> String {
    SEPARATOR_RE
        .replace_all(name.trim(), "-")
        .to_ascii_lowercase()
}

/// Returns true if `name` is a valid distribution name
pub fn is_valid_name(name: &str) -> bool {
    NAME_RE.is_match(name)
}

/// Where a dependency is fetched from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Versioned package from the registry
    Registry,
    /// Git repository
    Git,
    /// Local path
    Path,
    /// Direct URL (archive or wheel)
    Url,
    /// Any shape not understood (multiple-constraint arrays, unparseable strings)
    Other,
}

impl SourceKind {
    /// Returns true for entries the upgrader and editor may rewrite
    pub fn is_registry(&self) -> bool {
        matches!(self, SourceKind::Registry)
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SourceKind::Registry => "registry",
            SourceKind::Git => "git",
            SourceKind::Path => "path",
            SourceKind::Url => "url",
            SourceKind::Other => "other",
        };
        write!(f, "{}", name)
    }
}

/// A dependency declaration as it appears in the manifest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencySpec {
    /// Package name as written
    pub name: String,
    /// Raw constraint text, absent for unconstrained and non-registry entries
    pub constraint: Option<String>,
    /// Dependency group (`main` for runtime dependencies)
    pub group: String,
    /// Where the package comes from
    pub source_kind: SourceKind,
    /// Requested extras, in declaration order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extras: Vec<String>,
    /// Environment marker, verbatim
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub markers: Option<String>,
}

impl DependencySpec {
    /// Creates a registry dependency
    pub fn new(
        name: impl Into<String>,
        constraint: Option<String>,
        group: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            constraint,
            group: group.into(),
            source_kind: SourceKind::Registry,
            extras: Vec::new(),
            markers: None,
        }
    }

    /// Sets the source kind (builder pattern)
    pub fn with_source(mut self, source_kind: SourceKind) -> Self {
        self.source_kind = source_kind;
        self
    }

    /// Sets the extras (builder pattern)
    pub fn with_extras(mut self, extras: Vec<String>) -> Self {
        self.extras = extras;
        self
    }

    /// Sets the environment marker (builder pattern)
    pub fn with_markers(mut self, markers: impl Into<String>) -> Self {
        self.markers = Some(markers.into());
        self
    }

    /// Returns the PEP 503 normalized name
    pub fn normalized_name(&self) -> String {
        normalize_name(&self.name)
    }

    /// Returns true if this is a registry dependency
    pub fn is_registry(&self) -> bool {
        self.source_kind.is_registry()
    }

    /// Returns the constraint text or an empty string
    pub fn constraint_str(&self) -> &str {
        self.constraint.as_deref().unwrap_or("")
    }
}

impl fmt::Display for DependencySpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if let Some(constraint) = &self.constraint {
            write!(f, " {}", constraint)?;
        }
        if !self.source_kind.is_registry() {
            write!(f, " ({})", self.source_kind)?;
        }
        write!(f, " [{}]", self.group)
    }
}
