//! Poetry layout (`[tool.poetry]`)
//!
//! Handles:
//! - tool.poetry.dependencies (group `main`, minus the `python` key)
//! - tool.poetry.group.<name>.dependencies
//! - tool.poetry.dev-dependencies (deprecated, reported as group `dev`)

use super::{ensure_table, find_key, table_at, table_at_mut, upsert_string, DialectModel};
use crate::domain::{normalize_name, DependencySpec, SchemaDialect, SourceKind, MAIN_GROUP};
use crate::error::ManifestError;
use toml_edit::{DocumentMut, Item, TableLike};

/// Model for Poetry manifests
pub struct LegacyModel;

const PYTHON_KEY: &str = "python";

fn main_path() -> Vec<String> {
    path(&["tool", "poetry", "dependencies"])
}

fn dev_legacy_path() -> Vec<String> {
    path(&["tool", "poetry", "dev-dependencies"])
}

fn group_path(group: &str) -> Vec<String> {
    path(&["tool", "poetry", "group", group, "dependencies"])
}

fn path(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|p| p.to_string()).collect()
}

/// Tables a group's entries may live in, in lookup order
fn candidate_paths(group: &str) -> Vec<Vec<String>> {
    match group {
        MAIN_GROUP => vec![main_path()],
        "dev" => vec![group_path("dev"), dev_legacy_path()],
        other => vec![group_path(other)],
    }
}

/// Table new entries of a group are written to
fn insert_path(doc: &DocumentMut, group: &str) -> Vec<String> {
    if group == "dev" {
        let modern = group_path("dev");
        let legacy = dev_legacy_path();
        if table_at(doc, &modern).is_none() && table_at(doc, &legacy).is_some() {
            return legacy;
        }
        return modern;
    }
    candidate_paths(group).remove(0)
}

/// Builds a declaration from a Poetry value
fn spec_from_item(name: &str, item: &Item, group: &str) -> DependencySpec {
    if let Some(constraint) = item.as_str() {
        return DependencySpec::new(name, Some(constraint.to_string()), group);
    }

    if let Some(table) = item.as_table_like() {
        let kind = if table.contains_key("git") {
            SourceKind::Git
        } else if table.contains_key("path") {
            SourceKind::Path
        } else if table.contains_key("url") {
            SourceKind::Url
        } else {
            SourceKind::Registry
        };
        let constraint = if kind.is_registry() {
            table
                .get("version")
                .and_then(Item::as_str)
                .map(str::to_string)
        } else {
            None
        };
        let extras = table
            .get("extras")
            .and_then(Item::as_array)
            .map(|a| a.iter().filter_map(|v| v.as_str()).map(str::to_string).collect())
            .unwrap_or_default();
        let mut spec = DependencySpec::new(name, constraint, group)
            .with_source(kind)
            .with_extras(extras);
        if let Some(markers) = table.get("markers").and_then(Item::as_str) {
            spec = spec.with_markers(markers);
        }
        return spec;
    }

    // Arrays of per-platform constraints and anything else
    DependencySpec::new(name, None, group).with_source(SourceKind::Other)
}

fn collect(table: &dyn TableLike, group: &str) -> Vec<DependencySpec> {
    table
        .iter()
        .filter(|(key, _)| !(group == MAIN_GROUP && *key == PYTHON_KEY))
        .map(|(key, item)| spec_from_item(key, item, group))
        .collect()
}

impl DialectModel for LegacyModel {
    fn dialect(&self) -> SchemaDialect {
        SchemaDialect::LegacyGrouped
    }

    fn groups(&self, doc: &DocumentMut) -> Vec<String> {
        let mut groups = Vec::new();
        if table_at(doc, &main_path()).is_some() {
            groups.push(MAIN_GROUP.to_string());
        }
        if let Some(named) = table_at(doc, &["tool", "poetry", "group"]) {
            for (name, item) in named.iter() {
                let declares = item
                    .as_table_like()
                    .is_some_and(|t| t.contains_key("dependencies"));
                if declares && !groups.iter().any(|g| g == name) {
                    groups.push(name.to_string());
                }
            }
        }
        if table_at(doc, &dev_legacy_path()).is_some() && !groups.iter().any(|g| g == "dev") {
            groups.push("dev".to_string());
        }
        groups
    }

    fn get_dependencies(&self, doc: &DocumentMut, group: &str) -> Vec<DependencySpec> {
        candidate_paths(group)
            .iter()
            .filter_map(|p| table_at(doc, p))
            .flat_map(|table| collect(table, group))
            .collect()
    }

    fn set_dependency(
        &self,
        doc: &mut DocumentMut,
        name: &str,
        constraint: &str,
        group: &str,
    ) -> Result<bool, ManifestError> {
        if group == MAIN_GROUP && normalize_name(name) == PYTHON_KEY {
            return Err(ManifestError::invalid_structure(
                "tool.poetry.dependencies.python",
                "the interpreter range is not a dependency; use set-python",
            ));
        }
        for candidate in candidate_paths(group) {
            let Some(table) = table_at_mut(doc, &candidate) else {
                continue;
            };
            let Some(key) = find_key(table, name) else {
                continue;
            };
            let Some(item) = table.get_mut(&key) else {
                continue;
            };

            let existing = spec_from_item(&key, item, group);
            if !existing.is_registry() {
                return Err(ManifestError::non_registry(key, existing.source_kind.to_string()));
            }

            if let Some(value) = item.as_value_mut().filter(|v| v.is_str()) {
                return Ok(super::replace_value(value, constraint));
            }
            return match item.as_table_like_mut() {
                Some(entry) => Ok(upsert_string(entry, "version", constraint)),
                None => Err(ManifestError::invalid_structure(
                    format!("{}.{}", candidate.join("."), key),
                    "expected a version string or table",
                )),
            };
        }

        let target = insert_path(doc, group);
        let table = ensure_table(doc, &target)?;
        table.insert(name, toml_edit::value(constraint));
        Ok(true)
    }

    fn remove_dependency(&self, doc: &mut DocumentMut, name: &str, group: &str) -> bool {
        let mut removed = false;
        for candidate in candidate_paths(group) {
            if let Some(table) = table_at_mut(doc, &candidate) {
                if let Some(key) = find_key(table, name) {
                    if !(group == MAIN_GROUP && key == PYTHON_KEY) {
                        removed |= table.remove(&key).is_some();
                    }
                }
            }
        }
        removed
    }

    fn project_version(&self, doc: &DocumentMut) -> Option<String> {
        table_at(doc, &["tool", "poetry"])?
            .get("version")?
            .as_str()
            .map(str::to_string)
    }

    fn set_project_version(
        &self,
        doc: &mut DocumentMut,
        version: &str,
    ) -> Result<bool, ManifestError> {
        let table = table_at_mut(doc, &["tool", "poetry"])
            .ok_or_else(|| ManifestError::schema_error("no [tool.poetry] table"))?;
        Ok(upsert_string(table, "version", version))
    }

    fn python_range(&self, doc: &DocumentMut) -> Option<String> {
        table_at(doc, &main_path())?
            .get(PYTHON_KEY)?
            .as_str()
            .map(str::to_string)
    }

    fn set_python_range(&self, doc: &mut DocumentMut, range: &str) -> Result<bool, ManifestError> {
        if let Some(table) = table_at_mut(doc, &main_path()) {
            return Ok(upsert_string(table, PYTHON_KEY, range));
        }
        let table = ensure_table(doc, &main_path())?;
        table.insert(PYTHON_KEY, toml_edit::value(range));
        Ok(true)
    }
}
