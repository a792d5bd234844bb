//! Import reconciliation
//!
//! Compares the third-party packages a project imports against the packages
//! its manifest declares:
//! - `scanner` extracts imports from the source tree
//! - `mapping` turns top-level modules into distribution names
//! - `stdlib` knows which modules ship with Python
//!
//! `fix` adds the missing packages to the manifest through the editor.

mod mapping;
mod scanner;
mod stdlib;

pub use mapping::DistributionIndex;
pub use scanner::{
    discover_local_modules, extract_imports, python_files, scan_imports, DEFAULT_EXCLUDED_DIRS,
};
pub use stdlib::is_stdlib;

use crate::constraint::{apply_strategy, render, ConstraintVersion};
use crate::domain::{
    normalize_name, FixAddition, FixFailure, FixReport, ImportReport, UpgradePolicy, MAIN_GROUP,
};
use crate::editor::ManifestEditor;
use crate::error::{AppError, ScanError};
use crate::manifest::ManifestDocument;
use crate::registry::Resolver;
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// Packages never reported as missing or unused
pub const DEFAULT_IGNORE: &[&str] = &["pip", "setuptools", "wheel"];

/// Inputs of one reconciliation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileOptions {
    /// Project root; relative source roots are resolved against it
    pub root: PathBuf,
    /// Directories scanned for imports
    pub source_roots: Vec<PathBuf>,
    /// Extra directory names to skip while scanning
    pub exclude_dirs: Vec<String>,
    /// Extra package names to ignore
    pub ignore: Vec<String>,
    /// site-packages directories holding `*.dist-info` metadata
    pub site_packages: Vec<PathBuf>,
    /// Manifest groups whose packages count as declared
    pub declared_groups: Vec<String>,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            source_roots: vec![PathBuf::from("src")],
            exclude_dirs: Vec::new(),
            ignore: Vec::new(),
            site_packages: Vec::new(),
            declared_groups: vec![MAIN_GROUP.to_string()],
        }
    }
}

impl ReconcileOptions {
    /// Create options for a project root with the defaults
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    /// Set the source roots (builder pattern)
    pub fn with_source_roots<I, P>(mut self, roots: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.source_roots = roots.into_iter().map(Into::into).collect();
        self
    }

    /// Set the extra excluded directory names
    pub fn with_exclude_dirs(mut self, dirs: Vec<String>) -> Self {
        self.exclude_dirs = dirs;
        self
    }

    /// Set the extra ignored packages
    pub fn with_ignore(mut self, ignore: Vec<String>) -> Self {
        self.ignore = ignore;
        self
    }

    /// Set the site-packages directories
    pub fn with_site_packages(mut self, dirs: Vec<PathBuf>) -> Self {
        self.site_packages = dirs;
        self
    }

    /// Set the groups whose packages count as declared
    pub fn with_declared_groups(mut self, groups: Vec<String>) -> Self {
        self.declared_groups = groups;
        self
    }

    /// Source roots resolved against the project root
    pub fn resolved_source_roots(&self) -> Vec<PathBuf> {
        self.source_roots
            .iter()
            .map(|p| if p.is_absolute() { p.clone() } else { self.root.join(p) })
            .collect()
    }

    /// Default ignore list plus the configured names, normalized
    pub fn ignore_set(&self) -> BTreeSet<String> {
        DEFAULT_IGNORE
            .iter()
            .map(|s| s.to_string())
            .chain(self.ignore.iter().cloned())
            .map(|s| normalize_name(&s))
            .collect()
    }
}

/// Computes missing and unused packages
///
/// The ignore list is removed from both sides first.
pub fn diff(
    declared: &BTreeSet<String>,
    imported: &BTreeSet<String>,
    ignore: &BTreeSet<String>,
) -> ImportReport {
    let declared: BTreeSet<String> = declared
        .iter()
        .map(|n| normalize_name(n))
        .filter(|n| !ignore.contains(n))
        .collect();
    let used: BTreeSet<String> = imported
        .iter()
        .map(|n| normalize_name(n))
        .filter(|n| !ignore.contains(n))
        .collect();

    ImportReport {
        missing: used.difference(&declared).cloned().collect(),
        unused: declared.difference(&used).cloned().collect(),
        declared,
        used,
        ..Default::default()
    }
}

/// Checks a project's imports against its manifest
pub struct Reconciler {
    options: ReconcileOptions,
    index: DistributionIndex,
}

impl Reconciler {
    /// Create a reconciler, reading installed metadata from the configured site-packages
    pub fn new(options: ReconcileOptions) -> Self {
        let index = DistributionIndex::load(&options.site_packages);
        Self { options, index }
    }

    /// Replace the distribution index (builder pattern)
    pub fn with_index(mut self, index: DistributionIndex) -> Self {
        self.index = index;
        self
    }

    /// Get the options
    pub fn options(&self) -> &ReconcileOptions {
        &self.options
    }

    /// Normalized names declared in the configured groups
    pub fn declared(&self, document: &ManifestDocument) -> BTreeSet<String> {
        self.options
            .declared_groups
            .iter()
            .flat_map(|group| document.get_dependencies(group))
            .map(|dep| dep.normalized_name())
            .collect()
    }

    /// Scans the sources and reports missing and unused packages
    pub fn check(&self, document: &ManifestDocument) -> Result<ImportReport, ScanError> {
        let roots = self.options.resolved_source_roots();
        let imported = scan_imports(&roots, &self.options.exclude_dirs)?;

        let mut bases = roots.clone();
        bases.push(self.options.root.clone());
        let local = discover_local_modules(&bases);

        let declared = self.declared(document);
        let mut used = BTreeSet::new();
        let mut sources: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        let mut ambiguous = BTreeMap::new();

        for module in imported {
            if is_stdlib(&module) || local.contains(&module) {
                continue;
            }
            let candidates = self.index.candidates(&module);
            if candidates.len() > 1 {
                ambiguous.insert(module.clone(), candidates.iter().cloned().collect());
            }
            let declared_candidates: Vec<&String> =
                candidates.iter().filter(|c| declared.contains(*c)).collect();
            let packages: Vec<String> = if declared_candidates.is_empty() {
                candidates.into_iter().take(1).collect()
            } else {
                declared_candidates.into_iter().cloned().collect()
            };
            for package in packages {
                sources.entry(package.clone()).or_default().insert(module.clone());
                used.insert(package);
            }
        }

        let mut report = diff(&declared, &used, &self.options.ignore_set());
        report.missing_sources = report
            .missing
            .iter()
            .filter_map(|p| sources.get(p).map(|m| (p.clone(), m.clone())))
            .collect();
        report.ambiguous = ambiguous;
        debug!(
            declared = report.declared.len(),
            used = report.used.len(),
            missing = report.missing.len(),
            unused = report.unused.len(),
            "reconciled imports"
        );
        Ok(report)
    }
}

/// Adds every missing package to `group`
///
/// Each package is resolved and written with the policy's strategy. A
/// package that cannot be resolved or written is recorded as a failure and
/// the batch continues.
pub async fn fix(
    report: &ImportReport,
    editor: &mut ManifestEditor,
    group: &str,
    policy: &UpgradePolicy,
    resolver: &Resolver,
) -> FixReport {
    let dialect = editor.dialect();
    let mut result = FixReport::default();

    for package in &report.missing {
        let added: Result<String, AppError> = async {
            let latest = resolver.latest(package, policy).await?;
            let target = apply_strategy(
                &ConstraintVersion::from_release(&latest),
                policy.strategy,
                dialect,
            );
            let constraint = render(&target, dialect);
            editor.set_dependency(package, &constraint, group)?;
            Ok(constraint)
        }
        .await;

        match added {
            Ok(constraint) => {
                info!(package = %package, constraint = %constraint, group, "added missing dependency");
                result.added.push(FixAddition {
                    package: package.clone(),
                    constraint,
                    group: group.to_string(),
                });
            }
            Err(e) => {
                warn!(package = %package, error = %e, "could not add dependency");
                result.failures.push(FixFailure {
                    package: package.clone(),
                    error: e.to_string(),
                });
            }
        }
    }
    result
}
