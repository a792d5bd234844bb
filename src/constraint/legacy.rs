//! Poetry constraint syntax
//!
//! Handles version formats:
//! - Caret: `^1.2.3`
//! - Tilde: `~1.2.3`
//! - Exact: `==1.2.3` or bare `1.2.3`
//! - Floor: `>=1.2.3`
//! - Range: `>=1.2,<2.0` or `>=1.2 <2.0`
//!
//! Wildcards (`*`, `1.*`), exclusions and unions stay `Raw`.

use super::{
    is_poetry_clause, range_from_clauses, render_range, split_clauses, ConstraintParser,
    ConstraintVersion, VersionConstraint,
};
use crate::domain::SchemaDialect;
use regex::Regex;
use std::sync::LazyLock;

/// Poetry constraint parser
pub struct LegacyConstraintParser;

static CARET_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\^\s*(\S+)$").unwrap());
static TILDE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^~\s*([^=\s]\S*)$").unwrap());
static EXACT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^==\s*([^=\s]\S*)$").unwrap());

impl ConstraintParser for LegacyConstraintParser {
    fn parse(&self, text: &str) -> VersionConstraint {
        let trimmed = text.trim();
        let raw = || VersionConstraint::Raw(trimmed.to_string());

        if trimmed.is_empty() || trimmed.contains("||") {
            return raw();
        }

        if let Some(caps) = CARET_RE.captures(trimmed) {
            return ConstraintVersion::parse(&caps[1]).map_or_else(raw, VersionConstraint::Caret);
        }

        if let Some(caps) = TILDE_RE.captures(trimmed) {
            return ConstraintVersion::parse(&caps[1]).map_or_else(raw, VersionConstraint::Tilde);
        }

        if let Some(caps) = EXACT_RE.captures(trimmed) {
            return ConstraintVersion::parse(&caps[1]).map_or_else(raw, VersionConstraint::Exact);
        }

        // Bare version means an exact pin in Poetry
        if let Some(version) = ConstraintVersion::parse(trimmed) {
            return VersionConstraint::Exact(version);
        }

        split_clauses(trimmed, true)
            .and_then(|clauses| range_from_clauses(&clauses))
            .unwrap_or_else(raw)
    }

    fn render(&self, constraint: &VersionConstraint) -> String {
        match constraint {
            VersionConstraint::Exact(v) => format!("=={}", v),
            VersionConstraint::Caret(v) => format!("^{}", v),
            VersionConstraint::Tilde(v) => format!("~{}", v),
            VersionConstraint::Floor(v) => format!(">={}", v),
            VersionConstraint::Range { lower, upper } => render_range(lower, upper),
            VersionConstraint::Raw(text) => text.clone(),
        }
    }

    fn is_well_formed(&self, text: &str) -> bool {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return false;
        }
        trimmed.split("||").all(|alternative| {
            let alternative = alternative.trim();
            let clauses: Vec<&str> = if alternative.contains(',') {
                alternative.split(',').map(str::trim).collect()
            } else {
                super::join_operator_tokens(alternative)
            };
            !clauses.is_empty() && clauses.iter().all(|c| is_poetry_clause(c))
        })
    }

    fn dialect(&self) -> SchemaDialect {
        SchemaDialect::LegacyGrouped
    }
}
