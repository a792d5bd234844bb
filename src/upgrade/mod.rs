//! Manifest upgrade workflow
//!
//! This module provides:
//! - Upgrade judgment for individual dependencies
//! - The upgrader: collect → resolve → judge → apply → commit
//!
//! Every lookup completes before the first edit is applied, so a run that
//! fails halfway through resolution leaves the document untouched.

mod judge;

pub use judge::UpgradeJudge;

use crate::domain::{DependencySpec, SkipReason, UpgradePolicy, UpgradeRecord, UpgradeReport};
use crate::editor::ManifestEditor;
use crate::error::AppError;
use crate::progress::Progress;
use crate::registry::Resolver;
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Runs upgrades over one manifest
pub struct Upgrader<'a> {
    policy: &'a UpgradePolicy,
    resolver: &'a Resolver,
    progress: Progress,
}

/// A dependency waiting for its registry lookup
struct Pending {
    index: usize,
    dependency: DependencySpec,
}

impl<'a> Upgrader<'a> {
    /// Create an upgrader
    pub fn new(policy: &'a UpgradePolicy, resolver: &'a Resolver) -> Self {
        Self {
            policy,
            resolver,
            progress: Progress::disabled(),
        }
    }

    /// Show progress while resolving (builder pattern)
    pub fn with_progress(mut self, progress: Progress) -> Self {
        self.progress = progress;
        self
    }

    /// Collects the dependencies of every target group, in manifest order
    fn collect(&self, editor: &ManifestEditor) -> Vec<DependencySpec> {
        let document = editor.document();
        let declared = document.groups();
        for group in &self.policy.target_groups {
            if !declared.contains(group) {
                warn!(group = %group, "group not declared in manifest");
            }
        }
        declared
            .iter()
            .filter(|group| self.policy.should_process_group(group))
            .flat_map(|group| document.get_dependencies(group))
            .collect()
    }

    /// Upgrades the manifest held by `editor` and commits the result
    pub async fn run(
        mut self,
        mut editor: ManifestEditor,
        check: bool,
    ) -> Result<UpgradeReport, AppError> {
        let dialect = editor.dialect();
        let judge = UpgradeJudge::new(self.policy, dialect);
        let dependencies = self.collect(&editor);

        let mut seen: HashMap<(String, String), usize> = HashMap::new();
        for dep in &dependencies {
            *seen
                .entry((dep.group.clone(), dep.normalized_name()))
                .or_default() += 1;
        }

        // Step 1: decide what needs a lookup
        let mut records: Vec<Option<UpgradeRecord>> = Vec::with_capacity(dependencies.len());
        let mut pending = Vec::new();
        for (index, dep) in dependencies.into_iter().enumerate() {
            let duplicate = seen
                .get(&(dep.group.clone(), dep.normalized_name()))
                .is_some_and(|count| *count > 1);
            let skip = judge
                .should_skip(&dep)
                .or_else(|| duplicate.then_some(SkipReason::DuplicateEntry));
            match skip {
                Some(reason) => {
                    debug!(package = %dep.name, %reason, "skipped");
                    records.push(Some(UpgradeRecord::skip(dep, reason)));
                }
                None => {
                    records.push(None);
                    pending.push(Pending {
                        index,
                        dependency: dep,
                    });
                }
            }
        }

        // Step 2: resolve every pending package before editing anything
        self.progress.begin(pending.len(), self.resolver.registry_name());
        for item in &pending {
            self.progress.resolving(&item.dependency.name);
            let record = match self.resolver.latest(&item.dependency.name, self.policy).await {
                Ok(latest) => judge.judge(&item.dependency, &latest),
                Err(e) => {
                    warn!(package = %item.dependency.name, error = %e, "lookup failed");
                    let reason = SkipReason::FetchFailed(e.to_string());
                    UpgradeRecord::skip(item.dependency.clone(), reason)
                }
            };
            records[item.index] = Some(record);
            self.progress.resolved();
        }
        self.progress.finish();

        let records: Vec<UpgradeRecord> = records.into_iter().flatten().collect();

        // Step 3: apply
        for record in &records {
            if let UpgradeRecord::Upgrade {
                dependency,
                new_constraint,
                ..
            } = record
            {
                editor.set_dependency(&dependency.name, new_constraint, &dependency.group)?;
                info!(
                    package = %dependency.name,
                    from = dependency.constraint_str(),
                    to = %new_constraint,
                    "upgraded"
                );
            }
        }

        let outcome = editor.finish(check)?;
        Ok(UpgradeReport {
            dialect,
            records,
            outcome,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RegistryError;
    use crate::registry::StaticAdapter;
    use pretty_assertions::assert_eq;

    const POETRY: &str = r#"[tool.poetry]
name = "demo"
version = "0.1.0"

[tool.poetry.dependencies]
python = "^3.10"
requests = "^2.28"  # http client
django = "^4.2"
mylib = { git = "https://github.com/org/mylib.git" }
numpy = "*"

[tool.poetry.group.dev.dependencies]
pytest = "^7.0"
"#;

    fn resolver() -> Resolver {
        Resolver::new(
            StaticAdapter::new()
                .with_package("requests", ["2.28.0", "2.31.0"])
                .with_package("django", ["4.2.0", "5.0.1"])
                .with_package("pytest", ["7.0.0", "8.1.1"])
                .with_failure("numpy", RegistryError::timeout("numpy", "static")),
        )
    }

    fn editor(text: &str) -> ManifestEditor {
        ManifestEditor::from_text("pyproject.toml", text).unwrap()
    }

    #[tokio::test]
    async fn test_upgrade_poetry_check_mode() {
        let policy = UpgradePolicy::new();
        let resolver = resolver();
        let report = Upgrader::new(&policy, &resolver)
            .run(editor(POETRY), true)
            .await
            .unwrap();

        let summary: Vec<String> = report.records.iter().map(|r| r.to_string()).collect();
        assert_eq!(report.records.len(), 5);
        assert_eq!(summary[0], "requests: ^2.28 → ^2.31.0");
        assert!(matches!(
            report.records[1],
            UpgradeRecord::Skip {
                reason: SkipReason::MajorBump { current: 4, .. },
                ..
            }
        ));
        assert!(matches!(
            report.records[2],
            UpgradeRecord::Skip {
                reason: SkipReason::NonRegistry(_),
                ..
            }
        ));
        assert!(matches!(
            report.records[3],
            UpgradeRecord::Skip {
                reason: SkipReason::UnparseableConstraint(_),
                ..
            }
        ));
        assert!(report.records[4].is_skip());
        assert_eq!(report.upgrade_count(), 1);

        assert!(report.outcome.is_pending());
        assert_eq!(
            report.outcome.after,
            POETRY.replace("\"^2.28\"", "\"^2.31.0\"")
        );
    }

    #[tokio::test]
    async fn test_upgrade_dev_group_crosses_major_when_allowed() {
        let policy = UpgradePolicy::new()
            .with_major_bump(true)
            .with_groups(["dev"]);
        let resolver = resolver();
        let report = Upgrader::new(&policy, &resolver)
            .run(editor(POETRY), true)
            .await
            .unwrap();

        assert_eq!(report.records.len(), 1);
        assert_eq!(report.records[0].to_string(), "pytest: ^7.0 → ^8.1.1");
        assert!(report.outcome.after.contains("pytest = \"^8.1.1\""));
        assert!(report.outcome.after.contains("django = \"^4.2\""));
    }

    #[tokio::test]
    async fn test_fetch_failure_is_recorded() {
        let text = "[project]\nname = \"x\"\ndependencies = [\"numpy>=1.26\", \"requests>=2.28,<3\"]\n";
        let policy = UpgradePolicy::new();
        let resolver = resolver();
        let report = Upgrader::new(&policy, &resolver)
            .run(editor(text), true)
            .await
            .unwrap();

        assert_eq!(report.failure_count(), 1);
        assert!(report.records[0].is_failure());
        assert!(report
            .outcome
            .after
            .contains("\"requests>=2.31.0,<3.0.0\""));
        assert!(report.outcome.after.contains("\"numpy>=1.26\""));
    }

    #[tokio::test]
    async fn test_duplicates_and_only_list() {
        let text = "[project]\nname = \"x\"\ndependencies = [\n    \"requests>=2.0; python_version<'3.8'\",\n    \"Requests>=2.28; python_version>='3.8'\",\n    \"pytest>=7\",\n]\n";
        let policy = UpgradePolicy::new().with_only(["requests", "django"]);
        let resolver = resolver();
        let report = Upgrader::new(&policy, &resolver)
            .run(editor(text), true)
            .await
            .unwrap();

        assert!(matches!(
            report.records[0],
            UpgradeRecord::Skip {
                reason: SkipReason::DuplicateEntry,
                ..
            }
        ));
        assert!(matches!(
            report.records[2],
            UpgradeRecord::Skip {
                reason: SkipReason::NotInOnlyList,
                ..
            }
        ));
        assert!(!report.outcome.changed());
    }

    #[tokio::test]
    async fn test_up_to_date_is_no_op() {
        let text = "[tool.poetry.dependencies]\nrequests = \"^2.31.0\"\n";
        let policy = UpgradePolicy::new();
        let resolver = resolver();
        let report = Upgrader::new(&policy, &resolver)
            .run(editor(text), true)
            .await
            .unwrap();

        assert_eq!(report.no_op_count(), 1);
        assert!(!report.outcome.changed());
        assert!(!report.outcome.written);
    }
}
