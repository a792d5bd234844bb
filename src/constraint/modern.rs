//! PEP 440 constraint syntax as used in PEP 621 dependency strings
//!
//! Handles version formats:
//! - Exact: `==1.2.3`
//! - Floor: `>=1.2.3`
//! - Range: `>=1.2.3,<2.0.0` (any `>`, `>=`, `<`, `<=` pair)
//!
//! `~=`, `!=`, `===`, wildcards and longer clause lists stay `Raw`.

use super::{
    is_pep440_clause, range_from_clauses, render_range, split_clauses, ConstraintParser,
    ConstraintVersion, VersionConstraint,
};
use crate::domain::SchemaDialect;
use regex::Regex;
use std::sync::LazyLock;

/// PEP 440 constraint parser
pub struct ModernConstraintParser;

static EXACT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^==\s*([^=\s]\S*)$").unwrap());

impl ConstraintParser for ModernConstraintParser {
    fn parse(&self, text: &str) -> VersionConstraint {
        let trimmed = text.trim();
        let raw = || VersionConstraint::Raw(trimmed.to_string());

        if trimmed.is_empty() {
            return raw();
        }

        if let Some(caps) = EXACT_RE.captures(trimmed) {
            return ConstraintVersion::parse(&caps[1]).map_or_else(raw, VersionConstraint::Exact);
        }

        split_clauses(trimmed, false)
            .and_then(|clauses| range_from_clauses(&clauses))
            .unwrap_or_else(raw)
    }

    fn render(&self, constraint: &VersionConstraint) -> String {
        match constraint {
            VersionConstraint::Exact(v) => format!("=={}", v),
            VersionConstraint::Floor(v) => format!(">={}", v),
            VersionConstraint::Range { lower, upper } => render_range(lower, upper),
            VersionConstraint::Caret(_) | VersionConstraint::Tilde(_) => {
                self.render(&constraint.to_range())
            }
            VersionConstraint::Raw(text) => text.clone(),
        }
    }

    fn is_well_formed(&self, text: &str) -> bool {
        let trimmed = text.trim();
        !trimmed.is_empty() && trimmed.split(',').all(is_pep440_clause)
    }

    fn dialect(&self) -> SchemaDialect {
        SchemaDialect::ModernFlat
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraint::{Bound, Comparator};

    fn parse(text: &str) -> VersionConstraint {
        ModernConstraintParser.parse(text)
    }

    fn cv(text: &str) -> ConstraintVersion {
        ConstraintVersion::parse(text).unwrap()
    }

    #[test]
    fn test_parse_exact() {
        assert_eq!(parse("==2.31.0"), VersionConstraint::Exact(cv("2.31.0")));
    }

    #[test]
    fn test_parse_floor() {
        assert_eq!(parse(">=1.26"), VersionConstraint::Floor(cv("1.26")));
    }

    #[test]
    fn test_parse_range() {
        assert_eq!(
            parse(">=1.2.0,<2.0.0"),
            VersionConstraint::Range {
                lower: Some(Bound::new(Comparator::GreaterOrEqual, cv("1.2.0"))),
                upper: Some(Bound::new(Comparator::Less, cv("2.0.0"))),
            }
        );
        assert_eq!(
            parse("<3"),
            VersionConstraint::Range {
                lower: None,
                upper: Some(Bound::new(Comparator::Less, cv("3"))),
            }
        );
        assert_eq!(
            parse(">1.0"),
            VersionConstraint::Range {
                lower: Some(Bound::new(Comparator::Greater, cv("1.0"))),
                upper: None,
            }
        );
    }

    #[test]
    fn test_symbolic_prefixes_are_raw() {
        assert!(parse("^1.2.3").is_raw());
        assert!(parse("~1.2.3").is_raw());
        assert!(parse("~=1.4").is_raw());
        assert!(parse("1.2.3").is_raw());
    }

    #[test]
    fn test_other_shapes_are_raw() {
        for text in ["!=1.5", "==1.*", ">=1,<2,!=1.5", "<2,<3", "", "==="] {
            assert!(parse(text).is_raw(), "{text} should be raw");
        }
    }

    #[test]
    fn test_render_caret_as_range() {
        let p = ModernConstraintParser;
        assert_eq!(
            p.render(&VersionConstraint::Caret(cv("1.2.0"))),
            ">=1.2.0,<2.0.0"
        );
        assert_eq!(
            p.render(&VersionConstraint::Caret(cv("0.3.1"))),
            ">=0.3.1,<0.4.0"
        );
        assert_eq!(
            p.render(&VersionConstraint::Tilde(cv("1.2"))),
            ">=1.2,<1.3.0"
        );
    }

    #[test]
    fn test_render_roundtrip_of_parsed() {
        let p = ModernConstraintParser;
        for text in ["==1.0.0", ">=2.1", ">=1.0,<2.0", "<5", "~=1.4"] {
            assert_eq!(p.render(&p.parse(text)), text);
        }
    }

    #[test]
    fn test_is_well_formed() {
        let p = ModernConstraintParser;
        assert!(p.is_well_formed(">=1.0, !=1.5.*"));
        assert!(p.is_well_formed("~=3.9"));
        assert!(!p.is_well_formed("^1.0"));
        assert!(!p.is_well_formed("1.0"));
    }
}
