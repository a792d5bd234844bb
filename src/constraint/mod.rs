//! Version constraint engine
//!
//! This module provides:
//! - The `VersionConstraint` model shared by both manifest dialects
//! - Dialect-specific parsing and rendering (Poetry and PEP 621 syntax)
//! - Strategy application: turning a resolved release into a new constraint
//! - Bound arithmetic (`next_major`, `next_minor`) and membership checks

mod legacy;
mod modern;

pub use legacy::LegacyConstraintParser;
pub use modern::ModernConstraintParser;

use crate::domain::{ReleaseVersion, SchemaDialect, UpgradeStrategy};
use crate::error::ConstraintError;
use regex::Regex;
use semver::Version;
use std::fmt;
use std::sync::LazyLock;

/// A version as written inside a constraint; components may be omitted (`^1.2`)
static CONSTRAINT_VERSION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d+)(?:\.(\d+))?(?:\.(\d+))?((?:\.\d+)*)((?:[-_.]?(?:a|b|c|rc|alpha|beta|dev|post)\.?\d*)+)?$")
        .unwrap()
});

/// One comparator clause: operator followed by a version
static CLAUSE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(>=|<=|>|<|==|!=|~=|===|\^|~)?\s*(\S+)$").unwrap());

/// A clause a PEP 440 specifier set accepts, rewritable or not
static PEP440_CLAUSE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(===|==|!=|~=|<=|>=|<|>)\s*v?\d+(?:\.\d+)*(?:\.\*)?(?:[-_.]?[a-zA-Z]+\.?\d*)*(?:\+[a-zA-Z0-9.]+)?$")
        .unwrap()
});

/// A Poetry-only clause (`^1.2`, `~1.2`, bare `1.2`, `1.*`, `*`)
static POETRY_CLAUSE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:\*|(?:\^|~)?\s*\d+(?:\.\d+)*(?:[-_.]?[a-zA-Z]+\.?\d*)*|\d+(?:\.\d+)*\.\*)$")
        .unwrap()
});

/// Version inside a constraint, keeping the components that were written
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConstraintVersion {
    pub major: u64,
    pub minor: Option<u64>,
    pub patch: Option<u64>,
    /// Release components past the third (`4.9.0.80` -> `[80]`)
    pub extra: Vec<u64>,
    /// Pre, post and dev suffix in Python spelling (`rc1`, `b2`, `.post2`)
    pub pre: Option<String>,
}

impl ConstraintVersion {
    /// Creates a full `MAJOR.MINOR.PATCH` version
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor: Some(minor),
            patch: Some(patch),
            extra: Vec::new(),
            pre: None,
        }
    }

    /// Parses `1`, `1.2`, `1.2.3`, `1.2.3.4` or `1.2.3rc1`
    pub fn parse(text: &str) -> Option<Self> {
        let caps = CONSTRAINT_VERSION_RE.captures(text.trim())?;
        let component = |i: usize| -> Result<Option<u64>, ()> {
            match caps.get(i) {
                Some(m) => m.as_str().parse().map(Some).map_err(|_| ()),
                None => Ok(None),
            }
        };
        let major = component(1).ok()??;
        let minor = component(2).ok()?;
        let patch = component(3).ok()?;
        if minor.is_none() && patch.is_some() {
            return None;
        }
        let extra = caps
            .get(4)
            .map_or("", |m| m.as_str())
            .split('.')
            .filter(|part| !part.is_empty())
            .map(|part| part.parse().ok())
            .collect::<Option<Vec<u64>>>()?;
        Some(Self {
            major,
            minor,
            patch,
            extra,
            pre: caps.get(5).map(|m| m.as_str().to_string()),
        })
    }

    /// Builds the version a registry release was published as, keeping every component
    pub fn from_release(release: &ReleaseVersion) -> Self {
        let parts = release.release();
        Self {
            major: parts.first().copied().unwrap_or(0),
            minor: parts.get(1).copied(),
            patch: parts.get(2).copied(),
            extra: parts.iter().skip(3).copied().collect(),
            pre: release.suffix(),
        }
    }

    /// Converts to a semver version, filling omitted components with zero
    pub fn to_semver(&self) -> Option<Version> {
        ReleaseVersion::parse(&self.to_string()).map(|r| r.version)
    }
}

impl fmt::Display for ConstraintVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.major)?;
        if let Some(minor) = self.minor {
            write!(f, ".{}", minor)?;
        }
        if let Some(patch) = self.patch {
            write!(f, ".{}", patch)?;
        }
        for part in &self.extra {
            write!(f, ".{}", part)?;
        }
        if let Some(pre) = &self.pre {
            write!(f, "{}", pre)?;
        }
        Ok(())
    }
}

/// Comparison operator of a range bound
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Comparator {
    Greater,
    GreaterOrEqual,
    Less,
    LessOrEqual,
}

impl Comparator {
    /// Parses an operator token
    pub fn parse(op: &str) -> Option<Self> {
        match op {
            ">" => Some(Comparator::Greater),
            ">=" => Some(Comparator::GreaterOrEqual),
            "<" => Some(Comparator::Less),
            "<=" => Some(Comparator::LessOrEqual),
            _ => None,
        }
    }

    /// Returns the operator token
    pub fn as_str(&self) -> &'static str {
        match self {
            Comparator::Greater => ">",
            Comparator::GreaterOrEqual => ">=",
            Comparator::Less => "<",
            Comparator::LessOrEqual => "<=",
        }
    }

    /// Returns true for `>` and `>=`
    pub fn is_lower(&self) -> bool {
        matches!(self, Comparator::Greater | Comparator::GreaterOrEqual)
    }
}

/// One side of a range
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Bound {
    pub op: Comparator,
    pub version: ConstraintVersion,
}

impl Bound {
    /// Creates a bound
    pub fn new(op: Comparator, version: ConstraintVersion) -> Self {
        Self { op, version }
    }

    fn admits(&self, candidate: &Version) -> Option<bool> {
        let bound = self.version.to_semver()?;
        Some(match self.op {
            Comparator::Greater => *candidate > bound,
            Comparator::GreaterOrEqual => *candidate >= bound,
            Comparator::Less => *candidate < bound,
            Comparator::LessOrEqual => *candidate <= bound,
        })
    }
}

impl fmt::Display for Bound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.op.as_str(), self.version)
    }
}

/// A dependency version constraint
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum VersionConstraint {
    /// `==v`
    Exact(ConstraintVersion),
    /// `>=v`, `<next_major(v)`; zero major narrows to `<next_minor(v)`
    Caret(ConstraintVersion),
    /// `>=v`, `<next_minor(v)`
    Tilde(ConstraintVersion),
    /// `>=v`
    Floor(ConstraintVersion),
    /// Explicit bounds, at least one present
    Range {
        lower: Option<Bound>,
        upper: Option<Bound>,
    },
    /// Anything else, preserved verbatim and never rewritten
    Raw(String),
}

impl VersionConstraint {
    /// Returns true for `Raw`
    pub fn is_raw(&self) -> bool {
        matches!(self, VersionConstraint::Raw(_))
    }

    /// Returns the version the constraint starts from, if it has one
    pub fn lower_bound(&self) -> Option<&ConstraintVersion> {
        match self {
            VersionConstraint::Exact(v)
            | VersionConstraint::Caret(v)
            | VersionConstraint::Tilde(v)
            | VersionConstraint::Floor(v) => Some(v),
            VersionConstraint::Range { lower, .. } => lower.as_ref().map(|b| &b.version),
            VersionConstraint::Raw(_) => None,
        }
    }

    /// Checks whether a version satisfies the constraint; `None` for `Raw`
    pub fn admits(&self, candidate: &Version) -> Option<bool> {
        match self {
            VersionConstraint::Exact(v) => Some(*candidate == v.to_semver()?),
            VersionConstraint::Caret(v) => {
                let upper = caret_upper(v);
                Some(*candidate >= v.to_semver()? && *candidate < upper.to_semver()?)
            }
            VersionConstraint::Tilde(v) => {
                let upper = tilde_upper(v);
                Some(*candidate >= v.to_semver()? && *candidate < upper.to_semver()?)
            }
            VersionConstraint::Floor(v) => Some(*candidate >= v.to_semver()?),
            VersionConstraint::Range { lower, upper } => {
                let lower_ok = match lower {
                    Some(b) => b.admits(candidate)?,
                    None => true,
                };
                let upper_ok = match upper {
                    Some(b) => b.admits(candidate)?,
                    None => true,
                };
                Some(lower_ok && upper_ok)
            }
            VersionConstraint::Raw(_) => None,
        }
    }

    /// Expands `Caret` and `Tilde` into the explicit range they denote
    pub fn to_range(&self) -> VersionConstraint {
        match self {
            VersionConstraint::Caret(v) => VersionConstraint::Range {
                lower: Some(Bound::new(Comparator::GreaterOrEqual, v.clone())),
                upper: Some(Bound::new(Comparator::Less, caret_upper(v))),
            },
            VersionConstraint::Tilde(v) => VersionConstraint::Range {
                lower: Some(Bound::new(Comparator::GreaterOrEqual, v.clone())),
                upper: Some(Bound::new(Comparator::Less, tilde_upper(v))),
            },
            other => other.clone(),
        }
    }
}

/// Parses and renders constraints in one dialect's syntax
pub trait ConstraintParser {
    /// Parses constraint text; unrecognized shapes become `Raw`
    fn parse(&self, text: &str) -> VersionConstraint;

    /// Renders a constraint back to text
    fn render(&self, constraint: &VersionConstraint) -> String;

    /// Returns true if the text is a well-formed specifier in this dialect
    fn is_well_formed(&self, text: &str) -> bool;

    /// Returns the dialect this parser handles
    fn dialect(&self) -> SchemaDialect;
}

/// Get a constraint parser for the specified dialect
pub fn get_parser(dialect: SchemaDialect) -> Box<dyn ConstraintParser> {
    match dialect {
        SchemaDialect::LegacyGrouped => Box::new(LegacyConstraintParser),
        SchemaDialect::ModernFlat => Box::new(ModernConstraintParser),
    }
}

/// Parses constraint text under a dialect
pub fn parse(text: &str, dialect: SchemaDialect) -> VersionConstraint {
    get_parser(dialect).parse(text)
}

/// Renders a constraint under a dialect
pub fn render(constraint: &VersionConstraint, dialect: SchemaDialect) -> String {
    get_parser(dialect).render(constraint)
}

/// Builds the constraint a strategy writes for a resolved version
///
/// Poetry keeps `^`/`~` symbolic; PEP 621 receives the equivalent explicit range.
pub fn apply_strategy(
    version: &ConstraintVersion,
    strategy: UpgradeStrategy,
    dialect: SchemaDialect,
) -> VersionConstraint {
    let symbolic = match strategy {
        UpgradeStrategy::Exact => return VersionConstraint::Exact(version.clone()),
        UpgradeStrategy::Floor => return VersionConstraint::Floor(version.clone()),
        UpgradeStrategy::Caret => VersionConstraint::Caret(version.clone()),
        UpgradeStrategy::Tilde => VersionConstraint::Tilde(version.clone()),
    };
    match dialect {
        SchemaDialect::LegacyGrouped => symbolic,
        SchemaDialect::ModernFlat => symbolic.to_range(),
    }
}

/// Validates a constraint supplied for `set_dependency`; `Raw` shapes are rejected
pub fn validate(text: &str, dialect: SchemaDialect) -> Result<VersionConstraint, ConstraintError> {
    let parser = get_parser(dialect);
    match parser.parse(text) {
        VersionConstraint::Raw(_) if parser.is_well_formed(text) => Err(ConstraintError::invalid(
            text,
            format!(
                "{} specifier is not an exact pin, caret, tilde, floor or two-sided range",
                dialect
            ),
        )),
        VersionConstraint::Raw(_) => Err(ConstraintError::invalid(
            text,
            format!("not a valid {} constraint", dialect),
        )),
        constraint => Ok(constraint),
    }
}

/// Validates an interpreter range such as `>=3.9,<4.0` or `^3.10`
pub fn validate_python_range(text: &str, dialect: SchemaDialect) -> Result<(), ConstraintError> {
    if get_parser(dialect).is_well_formed(text) {
        Ok(())
    } else {
        Err(ConstraintError::InvalidPythonRange {
            range: text.to_string(),
        })
    }
}

/// Smallest version with the next major: `1.2.3` -> `2.0.0`
pub fn next_major(v: &ConstraintVersion) -> ConstraintVersion {
    ConstraintVersion::new(v.major + 1, 0, 0)
}

/// Smallest version with the next minor: `1.2.3` -> `1.3.0`
pub fn next_minor(v: &ConstraintVersion) -> ConstraintVersion {
    ConstraintVersion::new(v.major, v.minor.unwrap_or(0) + 1, 0)
}

fn caret_upper(v: &ConstraintVersion) -> ConstraintVersion {
    if v.major == 0 && v.minor.is_some() {
        next_minor(v)
    } else {
        next_major(v)
    }
}

fn tilde_upper(v: &ConstraintVersion) -> ConstraintVersion {
    if v.minor.is_some() {
        next_minor(v)
    } else {
        next_major(v)
    }
}

/// Splits comparator text into `(operator, version)` clauses
fn split_clauses(text: &str, allow_whitespace: bool) -> Option<Vec<(String, String)>> {
    let parts: Vec<&str> = if text.contains(',') || !allow_whitespace {
        text.split(',').map(str::trim).collect()
    } else {
        join_operator_tokens(text)
    };
    parts
        .into_iter()
        .map(|part| {
            let caps = CLAUSE_RE.captures(part)?;
            let op = caps.get(1).map_or("", |m| m.as_str()).to_string();
            Some((op, caps.get(2)?.as_str().to_string()))
        })
        .collect()
}

/// `>= 1.0 < 2.0` -> [">= 1.0", "< 2.0"]
fn join_operator_tokens(text: &str) -> Vec<&str> {
    let mut clauses = Vec::new();
    let mut start = None;
    let bytes = text.as_bytes();
    for (i, &b) in bytes.iter().enumerate() {
        let is_op = matches!(b, b'<' | b'>' | b'=' | b'!' | b'~' | b'^');
        let prev_is_op = i > 0 && matches!(bytes[i - 1], b'<' | b'>' | b'=' | b'!' | b'~' | b'^');
        if is_op && !prev_is_op {
            if let Some(s) = start {
                clauses.push(text[s..i].trim());
            }
            start = Some(i);
        } else if start.is_none() && !b.is_ascii_whitespace() {
            start = Some(i);
        }
    }
    if let Some(s) = start {
        clauses.push(text[s..].trim());
    }
    clauses
}

/// Builds a `Floor` or `Range` from comparator clauses, or `None` for other shapes
fn range_from_clauses(clauses: &[(String, String)]) -> Option<VersionConstraint> {
    if clauses.is_empty() || clauses.len() > 2 {
        return None;
    }
    let mut lower: Option<Bound> = None;
    let mut upper: Option<Bound> = None;
    for (op, version) in clauses {
        let op = Comparator::parse(op)?;
        let version = ConstraintVersion::parse(version)?;
        let slot = if op.is_lower() { &mut lower } else { &mut upper };
        if slot.is_some() {
            return None;
        }
        *slot = Some(Bound::new(op, version));
    }
    match (&lower, &upper) {
        (Some(b), None) if b.op == Comparator::GreaterOrEqual => {
            Some(VersionConstraint::Floor(b.version.clone()))
        }
        _ => Some(VersionConstraint::Range { lower, upper }),
    }
}

fn render_range(lower: &Option<Bound>, upper: &Option<Bound>) -> String {
    [lower, upper]
        .into_iter()
        .flatten()
        .map(|b| b.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

fn is_pep440_clause(clause: &str) -> bool {
    PEP440_CLAUSE_RE.is_match(clause.trim())
}

fn is_poetry_clause(clause: &str) -> bool {
    let clause = clause.trim();
    POETRY_CLAUSE_RE.is_match(clause) || is_pep440_clause(clause)
}
