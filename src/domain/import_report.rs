//! Import reconciliation result types

use super::ExitStatus;
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

/// Which findings make the check fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailOn {
    /// Fail only on missing dependencies
    Missing,
    /// Fail only on unused dependencies
    Unused,
    /// Fail on either
    #[default]
    Both,
    /// Never fail
    None,
}

impl fmt::Display for FailOn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FailOn::Missing => "missing",
            FailOn::Unused => "unused",
            FailOn::Both => "both",
            FailOn::None => "none",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for FailOn {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "missing" => Ok(FailOn::Missing),
            "unused" => Ok(FailOn::Unused),
            "both" => Ok(FailOn::Both),
            "none" => Ok(FailOn::None),
            _ => Err(ConfigError::InvalidFailOn {
                value: s.to_string(),
            }),
        }
    }
}

/// Difference between declared and imported packages
///
/// All package names are PEP 503 normalized.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ImportReport {
    /// Imported but not declared
    pub missing: BTreeSet<String>,
    /// Declared but never imported
    pub unused: BTreeSet<String>,
    /// Importing modules for each missing package
    pub missing_sources: BTreeMap<String, BTreeSet<String>>,
    /// Modules provided by more than one installed distribution
    pub ambiguous: BTreeMap<String, BTreeSet<String>>,
    /// Packages declared in the checked groups
    pub declared: BTreeSet<String>,
    /// Packages resolved from imports
    pub used: BTreeSet<String>,
}

impl ImportReport {
    /// Returns true if nothing is missing or unused
    pub fn is_clean(&self) -> bool {
        self.missing.is_empty() && self.unused.is_empty()
    }

    /// Maps the findings to an exit status under the given fail-on mode
    pub fn status(&self, fail_on: FailOn) -> ExitStatus {
        let missing = matches!(fail_on, FailOn::Missing | FailOn::Both) && !self.missing.is_empty();
        let unused = matches!(fail_on, FailOn::Unused | FailOn::Both) && !self.unused.is_empty();
        match (missing, unused) {
            (true, true) => ExitStatus::MissingAndUnused,
            (true, false) => ExitStatus::MissingFound,
            (false, true) => ExitStatus::UnusedFound,
            (false, false) => ExitStatus::Success,
        }
    }
}

/// A package the fix batch could not add
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixFailure {
    /// Normalized package name
    pub package: String,
    /// Why it failed
    pub error: String,
}

impl fmt::Display for FixFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.package, self.error)
    }
}

/// A package added by the fix batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixAddition {
    /// Normalized package name
    pub package: String,
    /// Constraint written
    pub constraint: String,
    /// Group it was added to
    pub group: String,
}

/// Result of the fix batch
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FixReport {
    /// Packages added
    pub added: Vec<FixAddition>,
    /// Packages that could not be added
    pub failures: Vec<FixFailure>,
}

impl FixReport {
    /// Returns true if any package failed
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(missing: &[&str], unused: &[&str]) -> ImportReport {
        ImportReport {
            missing: missing.iter().map(|s| s.to_string()).collect(),
            unused: unused.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_fail_on_from_str() {
        assert_eq!("missing".parse::<FailOn>().unwrap(), FailOn::Missing);
        assert_eq!("NONE".parse::<FailOn>().unwrap(), FailOn::None);
        assert!("sometimes".parse::<FailOn>().is_err());
    }

    #[test]
    fn test_status_both() {
        assert_eq!(report(&[], &[]).status(FailOn::Both), ExitStatus::Success);
        assert_eq!(report(&["a"], &[]).status(FailOn::Both), ExitStatus::MissingFound);
        assert_eq!(report(&[], &["b"]).status(FailOn::Both), ExitStatus::UnusedFound);
        assert_eq!(
            report(&["a"], &["b"]).status(FailOn::Both),
            ExitStatus::MissingAndUnused
        );
    }

    #[test]
    fn test_status_respects_fail_on() {
        let r = report(&["a"], &["b"]);
        assert_eq!(r.status(FailOn::Missing), ExitStatus::MissingFound);
        assert_eq!(r.status(FailOn::Unused), ExitStatus::UnusedFound);
        assert_eq!(r.status(FailOn::None), ExitStatus::Success);
    }

    #[test]
    fn test_is_clean() {
        assert!(report(&[], &[]).is_clean());
        assert!(!report(&["x"], &[]).is_clean());
    }

    #[test]
    fn test_fix_failure_display() {
        let failure = FixFailure {
            package: "nonexistent".to_string(),
            error: "not found".to_string(),
        };
        assert_eq!(format!("{}", failure), "nonexistent: not found");
    }
}
