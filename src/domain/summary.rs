//! Edit and upgrade result summary types
//!
//! Provides structures for tracking what happened to the manifest file.

use super::{SchemaDialect, UpgradeRecord};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Outcome of committing an edited manifest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditOutcome {
    /// Path to the manifest file
    pub path: PathBuf,
    /// Text before the edits
    #[serde(skip)]
    pub before: String,
    /// Text after the edits
    #[serde(skip)]
    pub after: String,
    /// Unified diff, computed in check mode
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diff: Option<String>,
    /// Whether the file was actually rewritten
    pub written: bool,
}

impl EditOutcome {
    /// Returns true if the edits changed the text
    pub fn changed(&self) -> bool {
        self.before != self.after
    }

    /// Returns true if this was a check-mode run that found changes
    pub fn is_pending(&self) -> bool {
        self.changed() && !self.written
    }
}

/// Result of an upgrade run over one manifest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpgradeReport {
    /// Dialect of the manifest
    pub dialect: SchemaDialect,
    /// One record per inspected dependency, in manifest order
    pub records: Vec<UpgradeRecord>,
    /// What happened to the file
    pub outcome: EditOutcome,
}

impl UpgradeReport {
    /// Returns the number of rewritten constraints
    pub fn upgrade_count(&self) -> usize {
        self.records.iter().filter(|r| r.is_upgrade()).count()
    }

    /// Returns the number of already-current constraints
    pub fn no_op_count(&self) -> usize {
        self.records.iter().filter(|r| r.is_no_op()).count()
    }

    /// Returns the number of skips
    pub fn skip_count(&self) -> usize {
        self.records.iter().filter(|r| r.is_skip()).count()
    }

    /// Returns the number of failed lookups
    pub fn failure_count(&self) -> usize {
        self.records.iter().filter(|r| r.is_failure()).count()
    }

    /// Returns all upgrades
    pub fn upgrades(&self) -> impl Iterator<Item = &UpgradeRecord> {
        self.records.iter().filter(|r| r.is_upgrade())
    }

    /// Returns all skips
    pub fn skips(&self) -> impl Iterator<Item = &UpgradeRecord> {
        self.records.iter().filter(|r| r.is_skip())
    }

    /// Returns true if any constraint was rewritten
    pub fn has_upgrades(&self) -> bool {
        self.upgrade_count() > 0
    }
}
