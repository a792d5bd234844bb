//! Validated edits on a single manifest
//!
//! `ManifestEditor` checks every input before touching the document, re-parses
//! the rendered text after each edit and commits through [`ManifestWriter`].

use crate::constraint::{validate, validate_python_range};
use crate::domain::{is_valid_name, EditOutcome, SchemaDialect};
use crate::error::{AppError, ConstraintError, ManifestError, VersionError};
use crate::manifest::{read_manifest, ManifestDocument, ManifestWriter};
use regex::Regex;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::LazyLock;
use toml_edit::DocumentMut;
use tracing::debug;

static PROJECT_VERSION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)\.(\d+)\.(\d+)(.*)$").unwrap());

/// Which component of the project version to bump
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BumpLevel {
    Major,
    Minor,
    Patch,
}

impl fmt::Display for BumpLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BumpLevel::Major => "major",
            BumpLevel::Minor => "minor",
            BumpLevel::Patch => "patch",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for BumpLevel {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "major" => Ok(BumpLevel::Major),
            "minor" => Ok(BumpLevel::Minor),
            "patch" => Ok(BumpLevel::Patch),
            _ => Err(VersionError::InvalidLevel {
                level: s.to_string(),
            }),
        }
    }
}

/// Computes the bumped version; anything after `MAJOR.MINOR.PATCH` is dropped
pub fn bump(version: &str, level: BumpLevel) -> Result<String, VersionError> {
    let malformed = || VersionError::Malformed {
        version: version.to_string(),
    };
    let caps = PROJECT_VERSION_RE
        .captures(version.trim())
        .ok_or_else(malformed)?;
    let component = |i: usize| -> Result<u64, VersionError> {
        caps.get(i)
            .and_then(|m| m.as_str().parse().ok())
            .ok_or_else(malformed)
    };
    let (major, minor, patch) = (component(1)?, component(2)?, component(3)?);

    let (major, minor, patch) = match level {
        BumpLevel::Major => (major + 1, 0, 0),
        BumpLevel::Minor => (major, minor + 1, 0),
        BumpLevel::Patch => (major, minor, patch + 1),
    };
    Ok(format!("{}.{}.{}", major, minor, patch))
}

/// Editor over one manifest file
pub struct ManifestEditor {
    path: PathBuf,
    before: String,
    document: ManifestDocument,
}

impl ManifestEditor {
    /// Reads and loads the manifest at `path`
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ManifestError> {
        let path = path.as_ref();
        let text = read_manifest(path)?;
        Self::from_text(path, text)
    }

    /// Loads manifest text that belongs to `path`
    pub fn from_text(path: impl Into<PathBuf>, text: impl Into<String>) -> Result<Self, ManifestError> {
        let before = text.into();
        let document = ManifestDocument::load(&before)?;
        Ok(Self {
            path: path.into(),
            before,
            document,
        })
    }

    /// Path of the manifest
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Detected dialect
    pub fn dialect(&self) -> SchemaDialect {
        self.document.dialect()
    }

    /// Read access to the loaded document
    pub fn document(&self) -> &ManifestDocument {
        &self.document
    }

    /// Current text of the document
    pub fn render(&self) -> String {
        self.document.render()
    }

    /// Text as it was loaded, before any edit
    pub fn original_text(&self) -> &str {
        &self.before
    }

    /// Bumps the project version and returns the new one
    pub fn bump_version(&mut self, level: BumpLevel) -> Result<String, AppError> {
        let current = self.document.project_version().ok_or(VersionError::Missing)?;
        let next = bump(&current, level)?;
        self.document.set_project_version(&next)?;
        self.verify()?;
        debug!(from = %current, to = %next, "bumped project version");
        Ok(next)
    }

    /// Adds or updates a registry dependency
    pub fn set_dependency(
        &mut self,
        name: &str,
        constraint: &str,
        group: &str,
    ) -> Result<bool, AppError> {
        if !is_valid_name(name) {
            return Err(ConstraintError::InvalidPackageName {
                name: name.to_string(),
            }
            .into());
        }
        let constraint = constraint.trim();
        if constraint.is_empty() {
            return Err(ConstraintError::invalid(constraint, "empty constraint").into());
        }
        validate(constraint, self.dialect())?;

        let changed = self.document.set_dependency(name, constraint, group)?;
        self.verify()?;
        debug!(name, constraint, group, changed, "set dependency");
        Ok(changed)
    }

    /// Removes a dependency; returns how many entries were removed (0 or 1)
    pub fn remove_dependency(&mut self, name: &str, group: &str) -> Result<usize, AppError> {
        let removed = self.document.remove_dependency(name, group);
        if removed {
            self.verify()?;
        }
        debug!(name, group, removed, "remove dependency");
        Ok(usize::from(removed))
    }

    /// Sets the interpreter range
    pub fn set_python_range(&mut self, range: &str) -> Result<bool, AppError> {
        let range = range.trim();
        validate_python_range(range, self.dialect())?;
        let changed = self.document.set_python_range(range)?;
        self.verify()?;
        Ok(changed)
    }

    /// Commits the edits; in check mode nothing is written
    pub fn finish(self, check: bool) -> Result<EditOutcome, ManifestError> {
        let after = self.document.render();
        ManifestWriter::new(check).commit(&self.path, &self.before, &after)
    }

    /// Re-parses the rendered text so a broken edit never reaches disk
    fn verify(&self) -> Result<(), ManifestError> {
        self.document
            .render()
            .parse::<DocumentMut>()
            .map(|_| ())
            .map_err(|e| ManifestError::render_error(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::TempDir;

    const POETRY: &str = "[tool.poetry]\nname = \"demo\"\nversion = \"1.4.2\"\n\n[tool.poetry.dependencies]\npython = \"^3.10\"\nrequests = \"^2.28\"\nmylib = { git = \"https://github.com/org/mylib.git\" }\n";

    const PEP621: &str = "[project]\nname = \"demo\"\nversion = \"0.9.9rc1\"\nrequires-python = \">=3.9\"\ndependencies = [\n    \"requests>=2.28\",\n]\n";

    fn editor(text: &str) -> ManifestEditor {
        ManifestEditor::from_text("pyproject.toml", text).unwrap()
    }

    #[test]
    fn test_bump_levels() {
        assert_eq!(bump("1.4.2", BumpLevel::Major).unwrap(), "2.0.0");
        assert_eq!(bump("1.4.2", BumpLevel::Minor).unwrap(), "1.5.0");
        assert_eq!(bump("1.4.2", BumpLevel::Patch).unwrap(), "1.4.3");
        assert_eq!(bump("0.9.9rc1", BumpLevel::Patch).unwrap(), "0.9.10");
        assert_eq!(bump("2.0.0-beta.1+build", BumpLevel::Minor).unwrap(), "2.1.0");
    }

    #[test]
    fn test_bump_malformed() {
        assert!(matches!(
            bump("1.4", BumpLevel::Patch),
            Err(VersionError::Malformed { .. })
        ));
        assert!(matches!(
            bump("v1.2.3", BumpLevel::Patch),
            Err(VersionError::Malformed { .. })
        ));
    }

    #[test]
    fn test_bump_level_from_str() {
        assert_eq!("Minor".parse::<BumpLevel>().unwrap(), BumpLevel::Minor);
        let err = "huge".parse::<BumpLevel>().unwrap_err();
        assert!(format!("{}", err).contains("huge"));
    }

    #[test]
    fn test_bump_version_edits_document() {
        let mut ed = editor(POETRY);
        assert_eq!(ed.bump_version(BumpLevel::Minor).unwrap(), "1.5.0");
        assert_eq!(ed.render(), POETRY.replace("1.4.2", "1.5.0"));
    }

    #[test]
    fn test_bump_version_missing() {
        let mut ed = editor("[project]\nname = \"x\"\n");
        let err = ed.bump_version(BumpLevel::Patch).unwrap_err();
        assert!(matches!(err, AppError::Version(VersionError::Missing)));
    }

    #[test]
    fn test_set_dependency_validates_before_editing() {
        let mut ed = editor(POETRY);

        let err = ed.set_dependency("requests", "not a version", "main").unwrap_err();
        assert!(matches!(err, AppError::Constraint(_)));

        let err = ed.set_dependency("-bad-", "^1.0", "main").unwrap_err();
        assert!(matches!(
            err,
            AppError::Constraint(ConstraintError::InvalidPackageName { .. })
        ));

        let err = ed.set_dependency("requests", "  ", "main").unwrap_err();
        assert!(matches!(err, AppError::Constraint(_)));

        assert_eq!(ed.render(), POETRY);
    }

    #[test]
    fn test_set_dependency_refuses_non_registry() {
        let mut ed = editor(POETRY);
        let err = ed.set_dependency("mylib", "^1.0", "main").unwrap_err();
        assert!(matches!(
            err,
            AppError::Manifest(ManifestError::NonRegistry { .. })
        ));
        assert_eq!(ed.render(), POETRY);
    }

    #[test]
    fn test_set_dependency_modern_rejects_poetry_syntax() {
        let mut ed = editor(PEP621);
        assert!(ed.set_dependency("requests", "^2.31", "main").is_err());
        assert!(ed.set_dependency("requests", ">=2.31,<3", "main").unwrap());
        let err = ed.set_dependency("attrs", "~=23.1", "main").unwrap_err();
        assert!(matches!(
            err,
            AppError::Constraint(ConstraintError::InvalidConstraint { .. })
        ));
        assert!(!ed.render().contains("attrs"));
    }

    #[test]
    fn test_remove_dependency_counts() {
        let mut ed = editor(POETRY);
        assert_eq!(ed.remove_dependency("Requests", "main").unwrap(), 1);
        assert_eq!(ed.remove_dependency("requests", "main").unwrap(), 0);
        assert_eq!(ed.remove_dependency("python", "main").unwrap(), 0);
    }

    #[test]
    fn test_set_python_range() {
        let mut ed = editor(PEP621);
        assert!(ed.set_python_range(">=3.10,<4").unwrap());
        assert!(ed.render().contains("requires-python = \">=3.10,<4\""));

        let err = ed.set_python_range("three").unwrap_err();
        assert!(matches!(
            err,
            AppError::Constraint(ConstraintError::InvalidPythonRange { .. })
        ));
    }

    #[test]
    fn test_finish_writes_and_checks() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pyproject.toml");
        fs::write(&path, POETRY).unwrap();

        let mut ed = ManifestEditor::open(&path).unwrap();
        ed.set_dependency("flask", "^3.0.0", "main").unwrap();
        let outcome = ed.finish(true).unwrap();
        assert!(outcome.is_pending());
        assert!(outcome.diff.unwrap().contains("+flask = \"^3.0.0\""));
        assert_eq!(fs::read_to_string(&path).unwrap(), POETRY);

        let mut ed = ManifestEditor::open(&path).unwrap();
        ed.set_dependency("flask", "^3.0.0", "main").unwrap();
        let outcome = ed.finish(false).unwrap();
        assert!(outcome.written);
        assert!(fs::read_to_string(&path)
            .unwrap()
            .contains("flask = \"^3.0.0\""));
    }

    #[test]
    fn test_finish_without_edits_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pyproject.toml");
        fs::write(&path, PEP621).unwrap();

        let outcome = ManifestEditor::open(&path).unwrap().finish(false).unwrap();
        assert!(!outcome.written);
        assert!(!outcome.changed());
    }
}
