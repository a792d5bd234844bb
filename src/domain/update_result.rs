//! Upgrade decision result types

use super::{DependencySpec, SourceKind};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Reason why a dependency was not upgraded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Git, path, URL or otherwise non-registry entry
    NonRegistry(SourceKind),
    /// Package not in --only list
    NotInOnlyList,
    /// No version constraint to rewrite
    Unconstrained,
    /// Constraint outside the rewritable shapes (wildcards, exclusions, ...)
    UnparseableConstraint(String),
    /// Latest release crosses a major version and major bumps are disabled
    MajorBump { current: u64, latest: String },
    /// Registry lookup failed
    FetchFailed(String),
    /// Package declared more than once in the same group
    DuplicateEntry,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NonRegistry(kind) => write!(f, "{} dependency", kind),
            SkipReason::NotInOnlyList => write!(f, "not in --only list"),
            SkipReason::Unconstrained => write!(f, "no version constraint"),
            SkipReason::UnparseableConstraint(c) => write!(f, "unsupported constraint '{}'", c),
            SkipReason::MajorBump { current, latest } => {
                write!(f, "major bump {}.x -> {} not allowed", current, latest)
            }
            SkipReason::FetchFailed(msg) => write!(f, "fetch failed: {}", msg),
            SkipReason::DuplicateEntry => write!(f, "declared more than once"),
        }
    }
}

/// Result of the upgrade decision for a single dependency
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UpgradeRecord {
    /// Constraint rewritten
    Upgrade {
        /// The dependency as it was declared
        dependency: DependencySpec,
        /// The constraint written in its place
        new_constraint: String,
        /// The release it was resolved to
        latest: String,
    },
    /// Constraint already matches what the strategy would write
    NoOp {
        /// The dependency as it was declared
        dependency: DependencySpec,
        /// The release it was resolved to
        latest: String,
    },
    /// Dependency left untouched
    Skip {
        /// The dependency as it was declared
        dependency: DependencySpec,
        /// The reason for skipping
        reason: SkipReason,
    },
}

impl UpgradeRecord {
    /// Creates an Upgrade record
    pub fn upgrade(
        dependency: DependencySpec,
        new_constraint: impl Into<String>,
        latest: impl Into<String>,
    ) -> Self {
        UpgradeRecord::Upgrade {
            dependency,
            new_constraint: new_constraint.into(),
            latest: latest.into(),
        }
    }

    /// Creates a NoOp record
    pub fn no_op(dependency: DependencySpec, latest: impl Into<String>) -> Self {
        UpgradeRecord::NoOp {
            dependency,
            latest: latest.into(),
        }
    }

    /// Creates a Skip record
    pub fn skip(dependency: DependencySpec, reason: SkipReason) -> Self {
        UpgradeRecord::Skip { dependency, reason }
    }

    /// Returns true if this record rewrites the manifest
    pub fn is_upgrade(&self) -> bool {
        matches!(self, UpgradeRecord::Upgrade { .. })
    }

    /// Returns true if the constraint was already current
    pub fn is_no_op(&self) -> bool {
        matches!(self, UpgradeRecord::NoOp { .. })
    }

    /// Returns true if this is a skip record
    pub fn is_skip(&self) -> bool {
        matches!(self, UpgradeRecord::Skip { .. })
    }

    /// Returns true for skips caused by a failed registry lookup
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            UpgradeRecord::Skip {
                reason: SkipReason::FetchFailed(_),
                ..
            }
        )
    }

    /// Returns the dependency reference
    pub fn dependency(&self) -> &DependencySpec {
        match self {
            UpgradeRecord::Upgrade { dependency, .. } => dependency,
            UpgradeRecord::NoOp { dependency, .. } => dependency,
            UpgradeRecord::Skip { dependency, .. } => dependency,
        }
    }

    /// Returns the package name
    pub fn package_name(&self) -> &str {
        &self.dependency().name
    }

    /// Returns the group the dependency belongs to
    pub fn group(&self) -> &str {
        &self.dependency().group
    }
}

impl fmt::Display for UpgradeRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpgradeRecord::Upgrade {
                dependency,
                new_constraint,
                ..
            } => write!(
                f,
                "{}: {} → {}",
                dependency.name,
                dependency.constraint_str(),
                new_constraint
            ),
            UpgradeRecord::NoOp { dependency, .. } => {
                write!(f, "{}: {} (up to date)", dependency.name, dependency.constraint_str())
            }
            UpgradeRecord::Skip { dependency, reason } => {
                write!(f, "{}: skipped ({})", dependency.name, reason)
            }
        }
    }
}
