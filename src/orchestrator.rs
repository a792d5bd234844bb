//! Command orchestrator
//!
//! This module provides:
//! - Workflow coordination: load manifest → read settings → run command → commit
//! - Merging of CLI flags over `[tool.pydepup]` settings
//! - Check mode support
//! - Mapping of command results to an `ExitStatus`

use crate::cli::{CheckImportsArgs, CliArgs, Command, UpgradeArgs};
use crate::config::Settings;
use crate::domain::{
    EditOutcome, ExitStatus, FailOn, FixReport, ImportReport, UpgradePolicy, UpgradeReport,
    MAIN_GROUP,
};
use crate::editor::ManifestEditor;
use crate::error::{AppError, ConfigError};
use crate::imports::{self, ReconcileOptions, Reconciler};
use crate::progress::Progress;
use crate::registry::{HttpClient, PyPIAdapter, Resolver, DEFAULT_INDEX_URL, DEFAULT_TIMEOUT};
use crate::upgrade::Upgrader;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

/// What a command produced, before formatting
#[derive(Debug, Clone)]
pub enum CommandOutput {
    /// One of the single-edit commands
    Edit {
        /// Human-readable description of the edit
        action: String,
        /// What happened to the file
        outcome: EditOutcome,
    },
    /// The rendered manifest
    Print { content: String },
    /// An upgrade run
    Upgrade(UpgradeReport),
    /// An import check, optionally followed by a fix batch
    Imports {
        report: ImportReport,
        fail_on: FailOn,
        fix: Option<FixReport>,
        outcome: Option<EditOutcome>,
    },
}

/// Result of running the orchestrator
#[derive(Debug, Clone)]
pub struct OrchestratorResult {
    /// Command output
    pub output: CommandOutput,
    /// Status for the process exit code
    pub status: ExitStatus,
    /// Whether the run was in check mode
    pub check: bool,
}

/// Orchestrator for one CLI invocation
pub struct Orchestrator {
    /// CLI arguments for configuration
    args: CliArgs,
    /// Registry resolver; built from settings when absent
    resolver: Option<Resolver>,
}

fn edit_status(outcome: &EditOutcome) -> ExitStatus {
    if outcome.is_pending() {
        ExitStatus::ChangesPending
    } else {
        ExitStatus::Success
    }
}

impl Orchestrator {
    /// Create a new orchestrator with the given CLI arguments
    pub fn new(args: CliArgs) -> Self {
        Self {
            args,
            resolver: None,
        }
    }

    /// Use a custom resolver instead of PyPI (for testing)
    pub fn with_resolver(mut self, resolver: Resolver) -> Self {
        self.resolver = Some(resolver);
        self
    }

    fn show_progress(&self) -> bool {
        !self.args.quiet && !self.args.json
    }

    /// Run the selected command
    pub async fn run(mut self) -> Result<OrchestratorResult, AppError> {
        let mut editor = ManifestEditor::open(&self.args.file)?;
        let settings = Settings::from_manifest(editor.original_text())?;
        let check = self.args.check;

        let (output, status) = match self.args.command.clone() {
            Command::BumpVersion { level } => {
                let before = editor.document().project_version().unwrap_or_default();
                let next = editor.bump_version(level)?;
                let outcome = editor.finish(check)?;
                let status = edit_status(&outcome);
                let action = format!("version {} → {}", before, next);
                (CommandOutput::Edit { action, outcome }, status)
            }
            Command::SetDep { name, spec, group } => {
                editor.set_dependency(&name, &spec, &group)?;
                let outcome = editor.finish(check)?;
                let status = edit_status(&outcome);
                let action = format!("set {} {} in group '{}'", name, spec.trim(), group);
                (CommandOutput::Edit { action, outcome }, status)
            }
            Command::RemoveDep { name, group } => {
                let removed = editor.remove_dependency(&name, &group)?;
                let outcome = editor.finish(check)?;
                let status = edit_status(&outcome);
                let action = if removed > 0 {
                    format!("removed {} from group '{}'", name, group)
                } else {
                    format!("{} is not declared in group '{}'", name, group)
                };
                (CommandOutput::Edit { action, outcome }, status)
            }
            Command::SetPython { spec } => {
                editor.set_python_range(&spec)?;
                let outcome = editor.finish(check)?;
                let status = edit_status(&outcome);
                let action = format!("python range {}", spec.trim());
                (CommandOutput::Edit { action, outcome }, status)
            }
            Command::Print => (
                CommandOutput::Print {
                    content: editor.render(),
                },
                ExitStatus::Success,
            ),
            Command::Upgrade(args) => self.upgrade(editor, &settings, &args).await?,
            Command::CheckImports(args) => self.check_imports(editor, &settings, &args).await?,
        };

        Ok(OrchestratorResult {
            output,
            status,
            check,
        })
    }

    async fn upgrade(
        &mut self,
        editor: ManifestEditor,
        settings: &Settings,
        args: &UpgradeArgs,
    ) -> Result<(CommandOutput, ExitStatus), AppError> {
        let policy = build_upgrade_policy(settings, args);
        let resolver = self.take_resolver(settings, args.timeout, args.index_url.as_deref())?;

        let report = Upgrader::new(&policy, &resolver)
            .with_progress(Progress::new(self.show_progress()))
            .run(editor, self.args.check)
            .await?;

        let mut status = edit_status(&report.outcome);
        if report.failure_count() > 0 {
            status = status.combine(ExitStatus::PartialFailure);
        }
        info!(
            upgraded = report.upgrade_count(),
            skipped = report.skip_count(),
            failed = report.failure_count(),
            "upgrade finished"
        );
        Ok((CommandOutput::Upgrade(report), status))
    }

    async fn check_imports(
        &mut self,
        mut editor: ManifestEditor,
        settings: &Settings,
        args: &CheckImportsArgs,
    ) -> Result<(CommandOutput, ExitStatus), AppError> {
        let options = build_reconcile_options(&self.args.file, settings, args);
        let fail_on = args.fail_on.or(settings.imports.fail_on).unwrap_or_default();
        let fix_to = args
            .fix_to
            .clone()
            .or_else(|| settings.imports.fix_to.clone())
            .unwrap_or_else(|| MAIN_GROUP.to_string());
        if args.fix && !options.declared_groups.contains(&fix_to) {
            return Err(ConfigError::ConflictingOptions {
                message: format!(
                    "fix-to group '{}' is not one of the checked groups ({})",
                    fix_to,
                    options.declared_groups.join(", ")
                ),
            }
            .into());
        }

        let reconciler = Reconciler::new(options);
        let mut report = reconciler.check(editor.document())?;
        let mut status = report.status(fail_on);

        if !args.fix || report.missing.is_empty() {
            let output = CommandOutput::Imports {
                report,
                fail_on,
                fix: None,
                outcome: None,
            };
            return Ok((output, status));
        }

        let policy = UpgradePolicy::new()
            .with_strategy(args.strategy.or(settings.strategy).unwrap_or_default())
            .with_prerelease(args.pre || settings.allow_prerelease.unwrap_or(false));
        let resolver = self.take_resolver(settings, args.timeout, args.index_url.as_deref())?;
        let fixed = imports::fix(&report, &mut editor, &fix_to, &policy, &resolver).await;
        let outcome = editor.finish(self.args.check)?;

        for addition in &fixed.added {
            report.missing.remove(&addition.package);
            report.missing_sources.remove(&addition.package);
        }
        status = report.status(fail_on).combine(edit_status(&outcome));
        if fixed.has_failures() {
            status = status.combine(ExitStatus::PartialFailure);
        }

        let output = CommandOutput::Imports {
            report,
            fail_on,
            fix: Some(fixed),
            outcome: Some(outcome),
        };
        Ok((output, status))
    }

    fn take_resolver(
        &mut self,
        settings: &Settings,
        timeout: Option<Duration>,
        index_url: Option<&str>,
    ) -> Result<Resolver, AppError> {
        if let Some(resolver) = self.resolver.take() {
            return Ok(resolver);
        }
        let timeout = timeout.or(settings.timeout()).unwrap_or(DEFAULT_TIMEOUT);
        let index_url = index_url
            .or(settings.index_url.as_deref())
            .unwrap_or(DEFAULT_INDEX_URL);
        let client = HttpClient::with_timeout(timeout)?;
        Ok(Resolver::new(
            PyPIAdapter::new(client).with_index_url(index_url),
        ))
    }
}

/// Builds the upgrade policy: CLI flags over settings over defaults
pub fn build_upgrade_policy(settings: &Settings, args: &UpgradeArgs) -> UpgradePolicy {
    let groups = if args.groups.is_empty() {
        settings.groups.clone().unwrap_or_default()
    } else {
        args.groups.clone()
    };
    UpgradePolicy::new()
        .with_strategy(args.strategy.or(settings.strategy).unwrap_or_default())
        .with_prerelease(args.pre || settings.allow_prerelease.unwrap_or(false))
        .with_major_bump(args.allow_major || settings.allow_major.unwrap_or(false))
        .with_groups(groups)
        .with_only(&args.only)
}

/// Builds reconciler options: CLI flags over settings over defaults
///
/// The project root defaults to the manifest's directory.
pub fn build_reconcile_options(
    manifest: &Path,
    settings: &Settings,
    args: &CheckImportsArgs,
) -> ReconcileOptions {
    let imports = &settings.imports;
    let root = args.root.clone().unwrap_or_else(|| match manifest.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    });

    let mut options = ReconcileOptions::new(root);
    if !args.src.is_empty() {
        options = options.with_source_roots(args.src.clone());
    } else if let Some(roots) = &imports.source_roots {
        options = options.with_source_roots(roots.clone());
    }
    if !args.groups.is_empty() {
        options = options.with_declared_groups(args.groups.clone());
    } else if let Some(groups) = &imports.declared_groups {
        options = options.with_declared_groups(groups.clone());
    }

    let site_packages = if args.site_packages.is_empty() {
        imports.site_packages.clone()
    } else {
        args.site_packages.clone()
    };
    options
        .with_exclude_dirs(
            imports
                .exclude_dirs
                .iter()
                .chain(&args.exclude_dir)
                .cloned()
                .collect(),
        )
        .with_ignore(imports.ignore.iter().chain(&args.ignore).cloned().collect())
        .with_site_packages(site_packages)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::UpgradeStrategy;
    use crate::registry::StaticAdapter;
    use clap::Parser;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::TempDir;

    const POETRY: &str = r#"[tool.poetry]
name = "demo"
version = "1.2.3"

[tool.poetry.dependencies]
python = "^3.10"
requests = "^2.28"

[tool.pydepup]
strategy = "tilde"
"#;

    fn project(manifest: &str) -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("pyproject.toml"), manifest).unwrap();
        dir
    }

    fn args(dir: &TempDir, rest: &[&str]) -> CliArgs {
        let file = dir.path().join("pyproject.toml");
        let mut argv = vec!["pydepup".to_string(), "--file".to_string(), file.display().to_string()];
        argv.extend(rest.iter().map(|s| s.to_string()));
        CliArgs::parse_from(argv)
    }

    fn resolver() -> Resolver {
        Resolver::new(
            StaticAdapter::new()
                .with_package("requests", ["2.28.0", "2.31.0"])
                .with_package("rich", ["13.7.1"]),
        )
    }

    #[test]
    fn test_policy_merges_cli_over_settings() {
        let settings = Settings {
            strategy: Some(UpgradeStrategy::Tilde),
            groups: Some(vec!["dev".to_string()]),
            allow_major: Some(true),
            ..Default::default()
        };
        let policy = build_upgrade_policy(&settings, &UpgradeArgs::default());
        assert_eq!(policy.strategy, UpgradeStrategy::Tilde);
        assert!(policy.allow_major_bump);
        assert!(policy.should_process_group("dev"));
        assert!(!policy.should_process_group("main"));

        let cli = UpgradeArgs {
            strategy: Some(UpgradeStrategy::Exact),
            groups: vec!["main".to_string()],
            ..Default::default()
        };
        let policy = build_upgrade_policy(&settings, &cli);
        assert_eq!(policy.strategy, UpgradeStrategy::Exact);
        assert!(policy.should_process_group("main"));
    }

    #[test]
    fn test_reconcile_options_root_defaults_to_manifest_dir() {
        let options = build_reconcile_options(
            Path::new("/work/app/pyproject.toml"),
            &Settings::default(),
            &CheckImportsArgs::default(),
        );
        assert_eq!(options.root, PathBuf::from("/work/app"));
        assert_eq!(options.source_roots, vec![PathBuf::from("src")]);
        assert_eq!(options.declared_groups, vec!["main".to_string()]);

        let options = build_reconcile_options(
            Path::new("pyproject.toml"),
            &Settings::default(),
            &CheckImportsArgs::default(),
        );
        assert_eq!(options.root, PathBuf::from("."));
    }

    #[tokio::test]
    async fn test_bump_version_writes_file() {
        let dir = project(POETRY);
        let result = Orchestrator::new(args(&dir, &["bump-version", "minor"]))
            .run()
            .await
            .unwrap();
        assert_eq!(result.status, ExitStatus::Success);
        let written = fs::read_to_string(dir.path().join("pyproject.toml")).unwrap();
        assert!(written.contains("version = \"1.3.0\""));
    }

    #[tokio::test]
    async fn test_check_mode_reports_pending() {
        let dir = project(POETRY);
        let result = Orchestrator::new(args(&dir, &["--check", "set-dep", "rich", "^13.7"]))
            .run()
            .await
            .unwrap();
        assert_eq!(result.status, ExitStatus::ChangesPending);
        let CommandOutput::Edit { outcome, .. } = result.output else {
            panic!("expected edit output");
        };
        assert!(outcome.diff.unwrap().contains("+rich = \"^13.7\""));
        assert_eq!(fs::read_to_string(dir.path().join("pyproject.toml")).unwrap(), POETRY);
    }

    #[tokio::test]
    async fn test_upgrade_uses_settings_strategy() {
        let dir = project(POETRY);
        let result = Orchestrator::new(args(&dir, &["upgrade"]))
            .with_resolver(resolver())
            .run()
            .await
            .unwrap();
        assert_eq!(result.status, ExitStatus::Success);
        let written = fs::read_to_string(dir.path().join("pyproject.toml")).unwrap();
        assert!(written.contains("requests = \"~2.31.0\""));
    }

    #[tokio::test]
    async fn test_check_imports_fix() {
        let dir = project("[project]\nname = \"app\"\ndependencies = [\"requests>=2.28\"]\n");
        fs::create_dir_all(dir.path().join("src")).unwrap();
        fs::write(dir.path().join("src/app.py"), "import requests\nimport rich\n").unwrap();

        let result = Orchestrator::new(args(&dir, &["check-imports", "--fix"]))
            .with_resolver(resolver())
            .run()
            .await
            .unwrap();
        assert_eq!(result.status, ExitStatus::Success);
        let written = fs::read_to_string(dir.path().join("pyproject.toml")).unwrap();
        assert!(written.contains("\"rich>=13.7.1,<14.0.0\""));
    }

    #[tokio::test]
    async fn test_fix_to_outside_checked_groups_is_rejected() {
        let dir = project("[project]\nname = \"app\"\ndependencies = []\n");
        let err = Orchestrator::new(args(&dir, &["check-imports", "--fix", "--fix-to", "docs"]))
            .run()
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Config(ConfigError::ConflictingOptions { .. })));
    }
}
