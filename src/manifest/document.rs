//! Loaded manifest document
//!
//! `ManifestDocument` owns the comment-preserving TOML tree and the text it
//! was loaded from. An untouched document renders back to that exact text.

use super::{get_model, table_at, DialectModel, LegacyModel, ModernModel};
use crate::domain::{normalize_name, DependencySpec, SchemaDialect};
use crate::error::ManifestError;
use std::collections::BTreeSet;
use toml_edit::DocumentMut;
use tracing::debug;

/// A pyproject.toml loaded for editing
pub struct ManifestDocument {
    doc: DocumentMut,
    original: String,
    dialect: SchemaDialect,
    dirty: bool,
}

fn declared_names(model: &dyn DialectModel, doc: &DocumentMut) -> BTreeSet<String> {
    model
        .groups(doc)
        .iter()
        .flat_map(|group| model.get_dependencies(doc, group))
        .map(|dep| normalize_name(&dep.name))
        .collect()
}

/// Decides which layout the manifest uses
///
/// When both `[tool.poetry]` and `[project]` are present, the side that
/// declares dependencies wins; if both declare the same package the layout
/// is ambiguous and rejected.
pub fn detect_dialect(doc: &DocumentMut) -> Result<SchemaDialect, ManifestError> {
    let has_poetry = table_at(doc, &["tool", "poetry"]).is_some();
    let has_project = table_at(doc, &["project"]).is_some();

    match (has_poetry, has_project) {
        (false, false) => Err(ManifestError::schema_error(
            "neither [project] nor [tool.poetry] table found",
        )),
        (true, false) => Ok(SchemaDialect::LegacyGrouped),
        (false, true) => Ok(SchemaDialect::ModernFlat),
        (true, true) => {
            let legacy = declared_names(&LegacyModel, doc);
            let modern = declared_names(&ModernModel, doc);
            let conflicts: Vec<&String> = legacy.intersection(&modern).collect();
            if !conflicts.is_empty() {
                let names: Vec<&str> = conflicts.iter().map(|s| s.as_str()).collect();
                return Err(ManifestError::schema_error(format!(
                    "both [project] and [tool.poetry] declare {}",
                    names.join(", ")
                )));
            }
            if modern.is_empty() || !legacy.is_empty() {
                Ok(SchemaDialect::LegacyGrouped)
            } else {
                Ok(SchemaDialect::ModernFlat)
            }
        }
    }
}

impl ManifestDocument {
    /// Parses manifest text and detects its dialect
    pub fn load(text: &str) -> Result<Self, ManifestError> {
        let doc: DocumentMut = text
            .parse()
            .map_err(|e: toml_edit::TomlError| ManifestError::parse_error(e.to_string()))?;
        let dialect = detect_dialect(&doc)?;
        debug!(%dialect, "detected manifest dialect");
        Ok(Self {
            doc,
            original: text.to_string(),
            dialect,
            dirty: false,
        })
    }

    /// Returns the detected dialect
    pub fn dialect(&self) -> SchemaDialect {
        self.dialect
    }

    fn model(&self) -> Box<dyn DialectModel> {
        get_model(self.dialect)
    }

    /// Renders the document; unmodified documents return the loaded text
    pub fn render(&self) -> String {
        if self.dirty {
            self.doc.to_string()
        } else {
            self.original.clone()
        }
    }

    /// Returns true if any edit changed the document
    pub fn is_modified(&self) -> bool {
        self.dirty && self.doc.to_string() != self.original
    }

    /// Lists declared groups, `main` first
    pub fn groups(&self) -> Vec<String> {
        self.model().groups(&self.doc)
    }

    /// Reads a group's dependencies in declaration order; empty if the group is absent
    pub fn get_dependencies(&self, group: &str) -> Vec<DependencySpec> {
        self.model().get_dependencies(&self.doc, group)
    }

    /// Finds one dependency by (normalized) name
    pub fn find_dependency(&self, name: &str, group: &str) -> Option<DependencySpec> {
        let wanted = normalize_name(name);
        self.get_dependencies(group)
            .into_iter()
            .find(|dep| dep.normalized_name() == wanted)
    }

    /// Inserts or updates a dependency in place; returns true if the text changed
    pub fn set_dependency(
        &mut self,
        name: &str,
        constraint: &str,
        group: &str,
    ) -> Result<bool, ManifestError> {
        let changed = self
            .model()
            .set_dependency(&mut self.doc, name, constraint, group)?;
        self.dirty |= changed;
        Ok(changed)
    }

    /// Removes a dependency; returns false when it was not declared
    pub fn remove_dependency(&mut self, name: &str, group: &str) -> bool {
        let removed = self.model().remove_dependency(&mut self.doc, name, group);
        self.dirty |= removed;
        removed
    }

    /// Reads the project version
    pub fn project_version(&self) -> Option<String> {
        self.model().project_version(&self.doc)
    }

    /// Replaces the project version
    pub fn set_project_version(&mut self, version: &str) -> Result<bool, ManifestError> {
        let changed = self.model().set_project_version(&mut self.doc, version)?;
        self.dirty |= changed;
        Ok(changed)
    }

    /// Reads the interpreter range
    pub fn python_range(&self) -> Option<String> {
        self.model().python_range(&self.doc)
    }

    /// Sets the interpreter range
    pub fn set_python_range(&mut self, range: &str) -> Result<bool, ManifestError> {
        let changed = self.model().set_python_range(&mut self.doc, range)?;
        self.dirty |= changed;
        Ok(changed)
    }
}
