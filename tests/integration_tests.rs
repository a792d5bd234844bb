//! Integration tests for pydepup
//!
//! These tests drive the library API end to end against files on disk and
//! an in-memory registry:
//! - Manifest round-trips and targeted edits
//! - Upgrade runs in both dialects
//! - Import reconciliation and the fix batch

use pretty_assertions::assert_eq;
use pydepup::domain::{ExitStatus, FailOn, SchemaDialect, UpgradePolicy, UpgradeStrategy};
use pydepup::editor::{BumpLevel, ManifestEditor};
use pydepup::registry::{Resolver, StaticAdapter};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const POETRY: &str = r#"# Project manifest
[tool.poetry]
name = "demo"
version = "0.9.4-beta.1"
description = "Demo project"   # trailing comment

[tool.poetry.dependencies]
python = "^3.10"
requests = "^2.28"
django = { version = "^4.2", extras = ["argon2"] }
internal = { path = "../internal", develop = true }
numpy = "*"

[tool.poetry.group.dev.dependencies]
pytest = "^7.4"  # test runner

[build-system]
requires = ["poetry-core"]
build-backend = "poetry.core.masonry.api"
"#;

const PEP621: &str = r#"[project]
name = "demo"
version = "2.0.0"
requires-python = ">=3.10"
dependencies = [
    # http
    "requests>=2.28,<3",
    "uvicorn[standard]>=0.29 ; python_version >= '3.9'",
    "mylib @ git+https://github.com/org/mylib.git",
]

[project.optional-dependencies]
dev = ["pytest>=7.4"]
"#;

fn create_test_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp directory")
}

fn write_manifest(dir: &Path, text: &str) -> std::path::PathBuf {
    let path = dir.join("pyproject.toml");
    fs::write(&path, text).unwrap();
    path
}

fn resolver() -> Resolver {
    Resolver::new(
        StaticAdapter::new()
            .with_package("requests", ["2.28.0", "2.31.0", "2.32.3", "3.0.0a1"])
            .with_package("django", ["4.2.0", "4.2.11", "5.0.4"])
            .with_package("pytest", ["7.4.0", "7.4.4"])
            .with_package("uvicorn", ["0.29.0", "0.30.1"])
            .with_package("rich", ["13.7.1"]),
    )
}

mod round_trip {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_open_and_finish_without_edits_is_byte_identical() {
        let dir = create_test_dir();
        for text in [POETRY, PEP621] {
            let path = write_manifest(dir.path(), text);
            let editor = ManifestEditor::open(&path).unwrap();
            assert_eq!(editor.render(), text);
            let outcome = editor.finish(false).unwrap();
            assert!(!outcome.changed());
            assert!(!outcome.written);
            assert_eq!(fs::read_to_string(&path).unwrap(), text);
        }
    }

    #[test]
    fn test_dialect_detection() {
        let dir = create_test_dir();
        let path = write_manifest(dir.path(), POETRY);
        assert_eq!(ManifestEditor::open(&path).unwrap().dialect(), SchemaDialect::LegacyGrouped);
        let path = write_manifest(dir.path(), PEP621);
        assert_eq!(ManifestEditor::open(&path).unwrap().dialect(), SchemaDialect::ModernFlat);
    }

    #[test]
    fn test_missing_manifest() {
        let dir = create_test_dir();
        assert!(ManifestEditor::open(dir.path().join("pyproject.toml")).is_err());
    }
}

mod editing {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_bump_version_drops_suffix_and_keeps_comments() {
        let dir = create_test_dir();
        let path = write_manifest(dir.path(), POETRY);
        let mut editor = ManifestEditor::open(&path).unwrap();
        assert_eq!(editor.bump_version(BumpLevel::Minor).unwrap(), "0.10.0");
        editor.finish(false).unwrap();

        let written = fs::read_to_string(&path).unwrap();
        assert_eq!(written, POETRY.replace("\"0.9.4-beta.1\"", "\"0.10.0\""));
    }

    #[test]
    fn test_bump_twice_follows_bump_law() {
        let mut editor = ManifestEditor::from_text("pyproject.toml", PEP621).unwrap();
        editor.bump_version(BumpLevel::Patch).unwrap();
        assert_eq!(editor.bump_version(BumpLevel::Major).unwrap(), "3.0.0");
    }

    #[test]
    fn test_set_dependency_updates_table_version() {
        let mut editor = ManifestEditor::from_text("pyproject.toml", POETRY).unwrap();
        assert!(editor.set_dependency("Django", "^4.2.11", "main").unwrap());
        assert_eq!(
            editor.render(),
            POETRY.replace(
                "django = { version = \"^4.2\"",
                "django = { version = \"^4.2.11\""
            )
        );
    }

    #[test]
    fn test_set_dependency_is_idempotent() {
        let mut editor = ManifestEditor::from_text("pyproject.toml", PEP621).unwrap();
        assert!(editor.set_dependency("rich", ">=13.7", "main").unwrap());
        let once = editor.render();
        assert!(!editor.set_dependency("rich", ">=13.7", "main").unwrap());
        assert_eq!(editor.render(), once);
    }

    #[test]
    fn test_non_registry_entries_are_refused() {
        let mut editor = ManifestEditor::from_text("pyproject.toml", POETRY).unwrap();
        assert!(editor.set_dependency("internal", "^1.0", "main").is_err());
        let mut editor = ManifestEditor::from_text("pyproject.toml", PEP621).unwrap();
        assert!(editor.set_dependency("mylib", ">=1.0", "main").is_err());
        assert_eq!(editor.render(), PEP621);
    }

    #[test]
    fn test_invalid_inputs_leave_document_untouched() {
        let mut editor = ManifestEditor::from_text("pyproject.toml", PEP621).unwrap();
        assert!(editor.set_dependency("requests", "^2.31", "main").is_err());
        assert!(editor.set_dependency("bad name!", ">=1", "main").is_err());
        assert!(editor.set_python_range("three point ten").is_err());
        assert_eq!(editor.render(), PEP621);
    }

    #[test]
    fn test_remove_dependency_and_python_range() {
        let dir = create_test_dir();
        let path = write_manifest(dir.path(), PEP621);
        let mut editor = ManifestEditor::open(&path).unwrap();
        assert_eq!(editor.remove_dependency("pytest", "dev").unwrap(), 1);
        assert_eq!(editor.remove_dependency("pytest", "dev").unwrap(), 0);
        assert!(editor.set_python_range(">=3.11,<3.14").unwrap());
        let outcome = editor.finish(false).unwrap();
        assert!(outcome.written);

        let written = fs::read_to_string(&path).unwrap();
        assert!(written.contains("dev = []"));
        assert!(written.contains("requires-python = \">=3.11,<3.14\""));
        assert!(written.contains("    # http\n"));
    }

    #[test]
    fn test_check_mode_writes_nothing() {
        let dir = create_test_dir();
        let path = write_manifest(dir.path(), POETRY);
        let mut editor = ManifestEditor::open(&path).unwrap();
        editor.set_dependency("rich", "^13.7", "dev").unwrap();
        let outcome = editor.finish(true).unwrap();

        assert!(outcome.is_pending());
        let diff = outcome.diff.unwrap();
        assert!(diff.contains("+rich = \"^13.7\""));
        assert_eq!(fs::read_to_string(&path).unwrap(), POETRY);
    }
}

mod upgrading {
    use super::*;
    use pretty_assertions::assert_eq;
    use pydepup::domain::{SkipReason, UpgradeRecord};
    use pydepup::upgrade::Upgrader;

    #[tokio::test]
    async fn test_poetry_upgrade_default_policy() {
        let dir = create_test_dir();
        let path = write_manifest(dir.path(), POETRY);
        let policy = UpgradePolicy::new();
        let resolver = resolver();

        let report = Upgrader::new(&policy, &resolver)
            .run(ManifestEditor::open(&path).unwrap(), false)
            .await
            .unwrap();

        assert_eq!(report.upgrade_count(), 2);
        assert_eq!(report.failure_count(), 0);
        assert!(matches!(
            &report.records[1],
            UpgradeRecord::Skip {
                reason: SkipReason::MajorBump { current: 4, .. },
                ..
            }
        ));
        let written = fs::read_to_string(&path).unwrap();
        assert!(written.contains("requests = \"^2.32.3\""));
        assert!(written.contains("django = { version = \"^4.2\", extras = [\"argon2\"] }"));
        assert!(written.contains("pytest = \"^7.4.4\"  # test runner"));
        assert!(written.contains("internal = { path = \"../internal\", develop = true }"));
        assert!(written.contains("numpy = \"*\""));
        assert!(written.contains("description = \"Demo project\"   # trailing comment"));
    }

    #[tokio::test]
    async fn test_pep621_upgrade_exact_strategy() {
        let policy = UpgradePolicy::new()
            .with_strategy(UpgradeStrategy::Exact)
            .with_groups(["main"]);
        let resolver = resolver();
        let editor = ManifestEditor::from_text("pyproject.toml", PEP621).unwrap();

        let report = Upgrader::new(&policy, &resolver).run(editor, true).await.unwrap();

        let after = &report.outcome.after;
        assert!(after.contains("\"requests==2.32.3\""));
        assert!(after.contains("\"uvicorn[standard]==0.30.1 ; python_version >= '3.9'\""));
        assert!(after.contains("\"mylib @ git+https://github.com/org/mylib.git\""));
        assert!(after.contains("dev = [\"pytest>=7.4\"]"));
        assert!(report.outcome.is_pending());
    }

    #[tokio::test]
    async fn test_zero_major_caret_narrows_to_minor() {
        let policy = UpgradePolicy::new().with_only(["uvicorn"]);
        let resolver = resolver();
        let editor = ManifestEditor::from_text("pyproject.toml", PEP621).unwrap();

        let report = Upgrader::new(&policy, &resolver).run(editor, true).await.unwrap();
        assert!(report
            .outcome
            .after
            .contains("\"uvicorn[standard]>=0.30.1,<0.31.0 ; python_version >= '3.9'\""));
    }

    #[tokio::test]
    async fn test_major_guard_and_prerelease_filter() {
        let text = "[tool.poetry.dependencies]\nrequests = \"^2.28\"\ndjango = \"^4.2\"\n";
        let resolver = resolver();

        let policy = UpgradePolicy::new().with_major_bump(true);
        let editor = ManifestEditor::from_text("pyproject.toml", text).unwrap();
        let report = Upgrader::new(&policy, &resolver).run(editor, true).await.unwrap();
        assert!(report.outcome.after.contains("requests = \"^2.32.3\""));
        assert!(report.outcome.after.contains("django = \"^5.0.4\""));

        let policy = UpgradePolicy::new().with_prerelease(true);
        let editor = ManifestEditor::from_text("pyproject.toml", text).unwrap();
        let report = Upgrader::new(&policy, &resolver).run(editor, true).await.unwrap();
        assert!(matches!(
            &report.records[0],
            UpgradeRecord::Skip {
                reason: SkipReason::MajorBump { current: 2, latest },
                ..
            } if latest == "3.0.0a1"
        ));
    }

    #[tokio::test]
    async fn test_unknown_package_is_a_recorded_failure() {
        let text = "[project]\nname = \"x\"\ndependencies = [\"no-such-pkg>=1.0\", \"rich>=13\"]\n";
        let policy = UpgradePolicy::new();
        let resolver = resolver();
        let editor = ManifestEditor::from_text("pyproject.toml", text).unwrap();

        let report = Upgrader::new(&policy, &resolver).run(editor, true).await.unwrap();
        assert_eq!(report.failure_count(), 1);
        assert!(report.outcome.after.contains("\"no-such-pkg>=1.0\""));
        assert!(report.outcome.after.contains("\"rich>=13.7.1,<14.0.0\""));
    }
}

mod reconciling {
    use super::*;
    use pretty_assertions::assert_eq;
    use pydepup::imports::{fix, DistributionIndex, ReconcileOptions, Reconciler};

    fn create_project(manifest: &str, files: &[(&str, &str)]) -> TempDir {
        let dir = create_test_dir();
        write_manifest(dir.path(), manifest);
        for (path, content) in files {
            let path = dir.path().join(path);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, content).unwrap();
        }
        dir
    }

    #[test]
    fn test_cv2_maps_to_opencv_python() {
        let dir = create_project(
            PEP621,
            &[
                ("src/demo/__init__.py", "import cv2\nimport requests\nimport uvicorn\n"),
                ("src/demo/cli.py", "from demo import core\nimport json, sys\n"),
                (".venv/lib/site.py", "import should_not_be_seen\n"),
            ],
        );
        let editor = ManifestEditor::open(dir.path().join("pyproject.toml")).unwrap();
        let reconciler = Reconciler::new(ReconcileOptions::new(dir.path()));
        let report = reconciler.check(editor.document()).unwrap();

        assert_eq!(report.missing.iter().collect::<Vec<_>>(), vec!["opencv-python"]);
        assert_eq!(report.unused.iter().collect::<Vec<_>>(), vec!["mylib"]);
        assert_eq!(report.status(FailOn::Missing), ExitStatus::MissingFound);
        assert_eq!(report.status(FailOn::None), ExitStatus::Success);
    }

    #[test]
    fn test_installed_metadata_overrides_table() {
        let dir = create_project(
            "[project]\nname = \"x\"\ndependencies = [\"opencv-python-headless>=4\"]\n",
            &[("src/app.py", "import cv2\n")],
        );
        let editor = ManifestEditor::open(dir.path().join("pyproject.toml")).unwrap();
        let index = DistributionIndex::new().with_module("cv2", "opencv-python-headless");
        let reconciler = Reconciler::new(ReconcileOptions::new(dir.path())).with_index(index);
        assert!(reconciler.check(editor.document()).unwrap().is_clean());
    }

    #[tokio::test]
    async fn test_fix_batch_survives_failures() {
        let dir = create_project(
            POETRY,
            &[("src/demo.py", "import requests\nimport rich\nimport nonexistent_pkg\n")],
        );
        let path = dir.path().join("pyproject.toml");
        let mut editor = ManifestEditor::open(&path).unwrap();
        let reconciler = Reconciler::new(ReconcileOptions::new(dir.path()));
        let report = reconciler.check(editor.document()).unwrap();
        assert_eq!(report.missing.len(), 2);

        let policy = UpgradePolicy::new();
        let result = fix(&report, &mut editor, "main", &policy, &resolver()).await;
        editor.finish(false).unwrap();

        assert_eq!(result.added.len(), 1);
        assert_eq!(result.added[0].package, "rich");
        assert_eq!(result.failures.len(), 1);
        assert_eq!(result.failures[0].package, "nonexistent-pkg");
        let written = fs::read_to_string(&path).unwrap();
        assert!(written.contains("rich = \"^13.7.1\""));
    }
}
