//! PEP 621 layout (`[project]`)
//!
//! Handles:
//! - project.dependencies (group `main`)
//! - project.optional-dependencies.<name>
//!
//! Entries are PEP 508 strings; edits rewrite a single array element in place.

use super::requirement::{format_requirement, Requirement};
use super::{ensure_table, table_at, table_at_mut, upsert_string, DialectModel};
use crate::domain::{normalize_name, DependencySpec, SchemaDialect, SourceKind, MAIN_GROUP};
use crate::error::ManifestError;
use toml_edit::{Array, DocumentMut, Item, Value};

/// Model for PEP 621 manifests
pub struct ModernModel;

const OPTIONAL: &str = "optional-dependencies";

/// Table holding the group's array, and the array's key
fn location(group: &str) -> (Vec<&str>, &str) {
    if group == MAIN_GROUP {
        (vec!["project"], "dependencies")
    } else {
        (vec!["project", OPTIONAL], group)
    }
}

fn array_at<'a>(doc: &'a DocumentMut, group: &str) -> Option<&'a Array> {
    let (parent, key) = location(group);
    table_at(doc, &parent)?.get(key)?.as_array()
}

fn array_at_mut<'a>(doc: &'a mut DocumentMut, group: &str) -> Option<&'a mut Array> {
    let (parent, key) = location(group);
    table_at_mut(doc, &parent)?.get_mut(key)?.as_array_mut()
}

fn ensure_array<'a>(doc: &'a mut DocumentMut, group: &str) -> Result<&'a mut Array, ManifestError> {
    let (parent, key) = location(group);
    let table = ensure_table(doc, &parent)?;
    table
        .entry(key)
        .or_insert(Item::Value(Value::Array(Array::new())))
        .as_array_mut()
        .ok_or_else(|| {
            ManifestError::invalid_structure(
                format!("{}.{}", parent.join("."), key),
                "expected an array of requirement strings",
            )
        })
}

/// Finds the element whose requirement name matches `name`
fn find_entry(array: &Array, name: &str) -> Option<(usize, Requirement)> {
    let wanted = normalize_name(name);
    array.iter().enumerate().find_map(|(idx, value)| {
        let req = Requirement::parse(value.as_str()?)?;
        (normalize_name(&req.name) == wanted).then_some((idx, req))
    })
}

/// Appends an element, copying the indentation of the previous one
fn push_with_layout(array: &mut Array, text: String) {
    let len = array.len();
    let Some(last) = array.get_mut(len.wrapping_sub(1)) else {
        array.push(text);
        return;
    };

    let prefix = last
        .decor()
        .prefix()
        .and_then(|p| p.as_str())
        .filter(|p| !p.is_empty())
        .unwrap_or(" ")
        .to_string();
    // A multi-line array without a trailing comma keeps its closing newline on the last element
    let suffix = last
        .decor()
        .suffix()
        .and_then(|s| s.as_str())
        .unwrap_or("")
        .to_string();
    last.decor_mut().set_suffix("");

    let mut value = Value::from(text);
    value.decor_mut().set_prefix(prefix);
    value.decor_mut().set_suffix(suffix);
    array.push_formatted(value);
}

/// Removes an element, handing its trailing layout to the new last element
fn remove_with_layout(array: &mut Array, idx: usize) {
    let removed = array.remove(idx);
    if idx == array.len() && idx > 0 {
        if let Some(suffix) = removed.decor().suffix().and_then(|s| s.as_str()) {
            if let Some(last) = array.get_mut(idx - 1) {
                last.decor_mut().set_suffix(suffix.to_string());
            }
        }
    }
}

fn spec_from_value(value: &Value, group: &str) -> Option<DependencySpec> {
    let text = value.as_str()?;
    Some(match Requirement::parse(text) {
        Some(req) => req.to_spec(group),
        None => DependencySpec::new(text.trim(), None, group).with_source(SourceKind::Other),
    })
}

impl DialectModel for ModernModel {
    fn dialect(&self) -> SchemaDialect {
        SchemaDialect::ModernFlat
    }

    fn groups(&self, doc: &DocumentMut) -> Vec<String> {
        let mut groups = Vec::new();
        if array_at(doc, MAIN_GROUP).is_some() {
            groups.push(MAIN_GROUP.to_string());
        }
        if let Some(optional) = table_at(doc, &["project", OPTIONAL]) {
            for (name, item) in optional.iter() {
                if item.as_array().is_some() && name != MAIN_GROUP {
                    groups.push(name.to_string());
                }
            }
        }
        groups
    }

    fn get_dependencies(&self, doc: &DocumentMut, group: &str) -> Vec<DependencySpec> {
        array_at(doc, group)
            .map(|array| {
                array
                    .iter()
                    .filter_map(|value| spec_from_value(value, group))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn set_dependency(
        &self,
        doc: &mut DocumentMut,
        name: &str,
        constraint: &str,
        group: &str,
    ) -> Result<bool, ManifestError> {
        if let Some(array) = array_at_mut(doc, group) {
            if let Some((idx, req)) = find_entry(array, name) {
                let kind = req.source_kind();
                if kind != SourceKind::Registry {
                    return Err(ManifestError::non_registry(req.name, kind.to_string()));
                }
                let updated = req.with_specifier(constraint);
                if array.get(idx).and_then(Value::as_str) == Some(updated.as_str()) {
                    return Ok(false);
                }
                array.replace(idx, updated);
                return Ok(true);
            }
        }

        let array = ensure_array(doc, group)?;
        push_with_layout(array, format_requirement(name, constraint));
        Ok(true)
    }

    fn remove_dependency(&self, doc: &mut DocumentMut, name: &str, group: &str) -> bool {
        let Some(array) = array_at_mut(doc, group) else {
            return false;
        };
        match find_entry(array, name) {
            Some((idx, _)) => {
                remove_with_layout(array, idx);
                true
            }
            None => false,
        }
    }

    fn project_version(&self, doc: &DocumentMut) -> Option<String> {
        table_at(doc, &["project"])?
            .get("version")?
            .as_str()
            .map(str::to_string)
    }

    fn set_project_version(
        &self,
        doc: &mut DocumentMut,
        version: &str,
    ) -> Result<bool, ManifestError> {
        let table = table_at_mut(doc, &["project"])
            .ok_or_else(|| ManifestError::schema_error("no [project] table"))?;
        Ok(upsert_string(table, "version", version))
    }

    fn python_range(&self, doc: &DocumentMut) -> Option<String> {
        table_at(doc, &["project"])?
            .get("requires-python")?
            .as_str()
            .map(str::to_string)
    }

    fn set_python_range(&self, doc: &mut DocumentMut, range: &str) -> Result<bool, ManifestError> {
        let table = table_at_mut(doc, &["project"])
            .ok_or_else(|| ManifestError::schema_error("no [project] table"))?;
        Ok(upsert_string(table, "requires-python", range))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const PEP621: &str = r#"[project]
name = "demo"
version = "0.4.1"
requires-python = ">=3.9"
dependencies = [
    "requests>=2.28.0,<3.0.0",  # http
    "uvicorn[standard] >=0.23 ; python_version >= '3.9'",
    "mylib @ git+https://github.com/org/mylib.git",
    "click",
]

[project.optional-dependencies]
dev = ["pytest>=7.0", "black==23.1.0"]
"#;

    fn doc(text: &str) -> DocumentMut {
        text.parse().unwrap()
    }

    #[test]
    fn test_groups() {
        assert_eq!(ModernModel.groups(&doc(PEP621)), vec!["main", "dev"]);
    }

    #[test]
    fn test_get_dependencies() {
        let deps = ModernModel.get_dependencies(&doc(PEP621), MAIN_GROUP);
        assert_eq!(deps.len(), 4);
        assert_eq!(deps[0].constraint.as_deref(), Some(">=2.28.0,<3.0.0"));
        assert_eq!(deps[1].extras, vec!["standard"]);
        assert_eq!(deps[1].markers.as_deref(), Some("python_version >= '3.9'"));
        assert_eq!(deps[2].source_kind, SourceKind::Git);
        assert!(deps[3].constraint.is_none());

        let dev = ModernModel.get_dependencies(&doc(PEP621), "dev");
        assert_eq!(dev[1].constraint.as_deref(), Some("==23.1.0"));
    }

    #[test]
    fn test_set_rewrites_in_place() {
        let mut d = doc(PEP621);
        assert!(ModernModel
            .set_dependency(&mut d, "requests", ">=2.31.0,<3.0.0", MAIN_GROUP)
            .unwrap());
        assert_eq!(
            d.to_string(),
            PEP621.replace(">=2.28.0,<3.0.0", ">=2.31.0,<3.0.0")
        );
    }

    #[test]
    fn test_set_keeps_extras_and_markers() {
        let mut d = doc(PEP621);
        ModernModel
            .set_dependency(&mut d, "Uvicorn", ">=0.30.0,<1.0.0", MAIN_GROUP)
            .unwrap();
        assert!(d
            .to_string()
            .contains("\"uvicorn[standard] >=0.30.0,<1.0.0 ; python_version >= '3.9'\","));
    }

    #[test]
    fn test_set_same_text_is_noop() {
        let mut d = doc(PEP621);
        assert!(!ModernModel
            .set_dependency(&mut d, "requests", ">=2.28.0,<3.0.0", MAIN_GROUP)
            .unwrap());
        assert_eq!(d.to_string(), PEP621);
    }

    #[test]
    fn test_set_git_dependency_fails() {
        let mut d = doc(PEP621);
        let err = ModernModel
            .set_dependency(&mut d, "mylib", ">=1.0", MAIN_GROUP)
            .unwrap_err();
        match err {
            ManifestError::NonRegistry { name, kind } => {
                assert_eq!(name, "mylib");
                assert_eq!(kind, "git");
            }
            other => panic!("expected NonRegistry, got {:?}", other),
        }
        assert_eq!(d.to_string(), PEP621);
    }

    #[test]
    fn test_append_multiline_copies_indentation() {
        let mut d = doc(PEP621);
        ModernModel
            .set_dependency(&mut d, "httpx", ">=0.27.0", MAIN_GROUP)
            .unwrap();
        assert!(d
            .to_string()
            .contains("    \"click\",\n    \"httpx>=0.27.0\",\n]"));
    }

    #[test]
    fn test_append_inline_array() {
        let mut d = doc(PEP621);
        ModernModel.set_dependency(&mut d, "ruff", ">=0.4", "dev").unwrap();
        assert!(d
            .to_string()
            .contains("dev = [\"pytest>=7.0\", \"black==23.1.0\", \"ruff>=0.4\"]"));
    }

    #[test]
    fn test_append_without_trailing_comma() {
        let mut d = doc("[project]\nname = \"x\"\ndependencies = [\n    \"a>=1\"\n]\n");
        ModernModel.set_dependency(&mut d, "b", ">=2", MAIN_GROUP).unwrap();
        assert_eq!(
            d.to_string(),
            "[project]\nname = \"x\"\ndependencies = [\n    \"a>=1\",\n    \"b>=2\"\n]\n"
        );
    }

    #[test]
    fn test_set_creates_optional_group() {
        let mut d = doc("[project]\nname = \"x\"\n");
        ModernModel.set_dependency(&mut d, "mkdocs", ">=1.5", "docs").unwrap();
        let deps = ModernModel.get_dependencies(&d, "docs");
        assert_eq!(deps.len(), 1);
        assert_eq!(deps[0].name, "mkdocs");
    }

    #[test]
    fn test_remove_dependency() {
        let mut d = doc(PEP621);
        assert!(ModernModel.remove_dependency(&mut d, "black", "dev"));
        assert!(d.to_string().contains("dev = [\"pytest>=7.0\"]"));
        assert!(!ModernModel.remove_dependency(&mut d, "black", "dev"));
        assert!(!ModernModel.remove_dependency(&mut d, "black", "docs"));
    }

    #[test]
    fn test_project_version_and_python() {
        let mut d = doc(PEP621);
        assert_eq!(ModernModel.project_version(&d).as_deref(), Some("0.4.1"));
        assert_eq!(ModernModel.python_range(&d).as_deref(), Some(">=3.9"));
        ModernModel.set_python_range(&mut d, ">=3.10").unwrap();
        assert!(d.to_string().contains("requires-python = \">=3.10\"\n"));
    }
}
