//! Manifest dialect definitions

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which layout a pyproject.toml declares its dependencies in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemaDialect {
    /// Poetry layout under `[tool.poetry]`, dependencies as a key/value table per group
    LegacyGrouped,
    /// PEP 621 layout under `[project]`, dependencies as PEP 508 strings
    ModernFlat,
}

impl SchemaDialect {
    /// Returns the top-level table path that marks this dialect
    pub fn root_table(&self) -> &'static str {
        match self {
            SchemaDialect::LegacyGrouped => "tool.poetry",
            SchemaDialect::ModernFlat => "project",
        }
    }

    /// Returns the key holding the interpreter range
    pub fn python_key(&self) -> &'static str {
        match self {
            SchemaDialect::LegacyGrouped => "tool.poetry.dependencies.python",
            SchemaDialect::ModernFlat => "project.requires-python",
        }
    }

    /// Returns the display name for this dialect
    pub fn display_name(&self) -> &'static str {
        match self {
            SchemaDialect::LegacyGrouped => "Poetry",
            SchemaDialect::ModernFlat => "PEP 621",
        }
    }
}

impl fmt::Display for SchemaDialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}
