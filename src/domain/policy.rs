//! Upgrade policy configuration
//!
//! `UpgradePolicy` carries every knob of one upgrade run. It is built once
//! from settings and CLI flags, then only read.

use super::dependency::normalize_name;
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// How a resolved release is turned into a new constraint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpgradeStrategy {
    /// Pin exactly: `==v`
    Exact,
    /// Compatible with the leftmost non-zero component: `^v`
    #[default]
    Caret,
    /// Compatible within the minor release: `~v`
    Tilde,
    /// Open-ended lower bound: `>=v`
    Floor,
}

impl UpgradeStrategy {
    /// Returns all strategies
    pub fn all() -> &'static [UpgradeStrategy] {
        &[
            UpgradeStrategy::Exact,
            UpgradeStrategy::Caret,
            UpgradeStrategy::Tilde,
            UpgradeStrategy::Floor,
        ]
    }

    /// Returns the lowercase name
    pub fn as_str(&self) -> &'static str {
        match self {
            UpgradeStrategy::Exact => "exact",
            UpgradeStrategy::Caret => "caret",
            UpgradeStrategy::Tilde => "tilde",
            UpgradeStrategy::Floor => "floor",
        }
    }
}

impl fmt::Display for UpgradeStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for UpgradeStrategy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "exact" => Ok(UpgradeStrategy::Exact),
            "caret" => Ok(UpgradeStrategy::Caret),
            "tilde" => Ok(UpgradeStrategy::Tilde),
            "floor" => Ok(UpgradeStrategy::Floor),
            _ => Err(ConfigError::InvalidStrategy {
                value: s.to_string(),
            }),
        }
    }
}

/// Policy for one upgrade run
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UpgradePolicy {
    /// How new constraints are written
    pub strategy: UpgradeStrategy,
    /// Consider pre-releases when picking the latest release
    pub allow_prerelease: bool,
    /// Allow the new constraint to cross a major version
    pub allow_major_bump: bool,
    /// Groups to process; empty means every declared group
    pub target_groups: BTreeSet<String>,
    /// If set, only these (normalized) packages are processed
    pub only_packages: Option<BTreeSet<String>>,
}

impl UpgradePolicy {
    /// Create a policy with defaults (caret, finals only, no major bumps, all groups)
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the strategy
    pub fn with_strategy(mut self, strategy: UpgradeStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Set whether pre-releases are eligible
    pub fn with_prerelease(mut self, allow: bool) -> Self {
        self.allow_prerelease = allow;
        self
    }

    /// Set whether major bumps are allowed
    pub fn with_major_bump(mut self, allow: bool) -> Self {
        self.allow_major_bump = allow;
        self
    }

    /// Set the groups to process
    pub fn with_groups<I, S>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.target_groups = groups.into_iter().map(Into::into).collect();
        self
    }

    /// Restrict the run to these packages; an empty list means no restriction
    pub fn with_only<I, S>(mut self, only: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let only: BTreeSet<String> = only
            .into_iter()
            .map(|s| normalize_name(s.as_ref()))
            .collect();
        self.only_packages = if only.is_empty() { None } else { Some(only) };
        self
    }

    /// Check if a group should be processed
    pub fn should_process_group(&self, group: &str) -> bool {
        self.target_groups.is_empty() || self.target_groups.contains(group)
    }

    /// Check if a package should be processed based on the only-list
    pub fn should_process_package(&self, name: &str) -> bool {
        match &self.only_packages {
            Some(only) => only.contains(&normalize_name(name)),
            None => true,
        }
    }
}
