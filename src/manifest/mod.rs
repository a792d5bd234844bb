//! pyproject.toml manifest model
//!
//! This module provides functionality to:
//! - Load a manifest into a comment-preserving document and detect its dialect
//! - Read and edit dependency groups for the Poetry and PEP 621 layouts
//! - Parse and rewrite PEP 508 requirement strings
//! - Read and atomically write manifest files

mod document;
mod legacy;
mod modern;
mod requirement;
mod writer;

pub use document::{detect_dialect, ManifestDocument};
pub use legacy::LegacyModel;
pub use modern::ModernModel;
pub use requirement::{format_requirement, Requirement};
pub use writer::{read_manifest, write_atomic, ManifestWriter};

use crate::domain::{normalize_name, DependencySpec, SchemaDialect};
use crate::error::ManifestError;
use toml_edit::{DocumentMut, Item, Table, TableLike, Value};

/// Dialect-specific access to dependency groups and project keys
pub trait DialectModel {
    /// Returns the dialect this model handles
    fn dialect(&self) -> SchemaDialect;

    /// Lists the groups declared in the document, `main` first
    fn groups(&self, doc: &DocumentMut) -> Vec<String>;

    /// Reads a group's dependencies in declaration order
    fn get_dependencies(&self, doc: &DocumentMut, group: &str) -> Vec<DependencySpec>;

    /// Inserts or updates a dependency; returns true if the document changed
    fn set_dependency(
        &self,
        doc: &mut DocumentMut,
        name: &str,
        constraint: &str,
        group: &str,
    ) -> Result<bool, ManifestError>;

    /// Removes a dependency; returns true if an entry was removed
    fn remove_dependency(&self, doc: &mut DocumentMut, name: &str, group: &str) -> bool;

    /// Reads the project version
    fn project_version(&self, doc: &DocumentMut) -> Option<String>;

    /// Replaces the project version; returns true if it changed
    fn set_project_version(&self, doc: &mut DocumentMut, version: &str)
        -> Result<bool, ManifestError>;

    /// Reads the interpreter range
    fn python_range(&self, doc: &DocumentMut) -> Option<String>;

    /// Sets the interpreter range; returns true if it changed
    fn set_python_range(&self, doc: &mut DocumentMut, range: &str) -> Result<bool, ManifestError>;
}

/// Get the model for the specified dialect
pub fn get_model(dialect: SchemaDialect) -> Box<dyn DialectModel> {
    match dialect {
        SchemaDialect::LegacyGrouped => Box::new(LegacyModel),
        SchemaDialect::ModernFlat => Box::new(ModernModel),
    }
}

/// Walks a dotted path of tables (regular or inline)
pub(crate) fn table_at<'a, S: AsRef<str>>(
    doc: &'a DocumentMut,
    path: &[S],
) -> Option<&'a dyn TableLike> {
    let mut current: &dyn TableLike = doc.as_table();
    for key in path {
        current = current.get(key.as_ref())?.as_table_like()?;
    }
    Some(current)
}

/// Mutable variant of [`table_at`]
pub(crate) fn table_at_mut<'a, S: AsRef<str>>(
    doc: &'a mut DocumentMut,
    path: &[S],
) -> Option<&'a mut dyn TableLike> {
    let mut current: &mut dyn TableLike = doc.as_table_mut();
    for key in path {
        current = current.get_mut(key.as_ref())?.as_table_like_mut()?;
    }
    Some(current)
}

/// Walks a dotted path of tables, creating missing ones
///
/// Intermediate tables are created implicit so only the leaf gets a header.
pub(crate) fn ensure_table<'a, S: AsRef<str>>(
    doc: &'a mut DocumentMut,
    path: &[S],
) -> Result<&'a mut Table, ManifestError> {
    let mut current: &mut Table = doc.as_table_mut();
    for (i, key) in path.iter().enumerate() {
        let mut fresh = Table::new();
        fresh.set_implicit(i + 1 < path.len());
        current = current
            .entry(key.as_ref())
            .or_insert(Item::Table(fresh))
            .as_table_mut()
            .ok_or_else(|| {
                let dotted: Vec<&str> = path[..=i].iter().map(AsRef::as_ref).collect();
                ManifestError::invalid_structure(dotted.join("."), "expected a table")
            })?;
    }
    Ok(current)
}

/// Finds the key whose normalized form matches `name`
pub(crate) fn find_key(table: &dyn TableLike, name: &str) -> Option<String> {
    let wanted = normalize_name(name);
    table
        .iter()
        .find(|(key, _)| normalize_name(key) == wanted)
        .map(|(key, _)| key.to_string())
}

/// Replaces a string value in place, keeping its surrounding whitespace and comments
pub(crate) fn replace_value(slot: &mut Value, text: &str) -> bool {
    if slot.as_str() == Some(text) {
        return false;
    }
    let decor = slot.decor().clone();
    *slot = Value::from(text);
    *slot.decor_mut() = decor;
    true
}

/// Sets `key` in a table, replacing an existing string in place or appending a new one
pub(crate) fn upsert_string(table: &mut dyn TableLike, key: &str, text: &str) -> bool {
    if let Some(slot) = table.get_mut(key).and_then(Item::as_value_mut) {
        return replace_value(slot, text);
    }
    table.insert(key, toml_edit::value(text));
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(text: &str) -> DocumentMut {
        text.parse().unwrap()
    }

    #[test]
    fn test_get_model() {
        assert_eq!(
            get_model(SchemaDialect::LegacyGrouped).dialect(),
            SchemaDialect::LegacyGrouped
        );
        assert_eq!(
            get_model(SchemaDialect::ModernFlat).dialect(),
            SchemaDialect::ModernFlat
        );
    }

    #[test]
    fn test_table_at_follows_dotted_keys_and_inline_tables() {
        let d = doc("[tool.poetry]\nname = \"x\"\n[tool.other]\ninner = { a = 1 }\n");
        assert!(table_at(&d, &["tool", "poetry"]).is_some());
        assert!(table_at(&d, &["tool", "other", "inner"]).is_some());
        assert!(table_at(&d, &["tool", "missing"]).is_none());
        assert!(table_at(&d, &["tool", "poetry", "name"]).is_none());
    }

    #[test]
    fn test_ensure_table_creates_only_leaf_header() {
        let mut d = doc("[tool.poetry]\nname = \"x\"\n");
        ensure_table(&mut d, &["tool", "poetry", "group", "dev", "dependencies"]).unwrap();
        let rendered = d.to_string();
        assert!(rendered.contains("[tool.poetry.group.dev.dependencies]"));
        assert!(!rendered.contains("[tool.poetry.group]\n"));
    }

    #[test]
    fn test_ensure_table_rejects_non_table() {
        let mut d = doc("[project]\ndependencies = []\n");
        let err = ensure_table(&mut d, &["project", "dependencies"]).unwrap_err();
        assert!(format!("{}", err).contains("project.dependencies"));
    }

    #[test]
    fn test_find_key_normalizes() {
        let d = doc("[deps]\nFlask_Cors = \"^4.0\"\n");
        let table = table_at(&d, &["deps"]).unwrap();
        assert_eq!(find_key(table, "flask-cors").as_deref(), Some("Flask_Cors"));
        assert!(find_key(table, "flask").is_none());
    }

    #[test]
    fn test_replace_value_keeps_comment() {
        let mut d = doc("[deps]\nrequests = \"^2.0\"  # http\n");
        let slot = d["deps"]["requests"].as_value_mut().unwrap();
        assert!(replace_value(slot, "^2.31.0"));
        assert_eq!(d.to_string(), "[deps]\nrequests = \"^2.31.0\"  # http\n");
    }

    #[test]
    fn test_replace_value_same_text_is_noop() {
        let mut d = doc("[deps]\nrequests = \"^2.0\"\n");
        let slot = d["deps"]["requests"].as_value_mut().unwrap();
        assert!(!replace_value(slot, "^2.0"));
    }
}
