//! Per-dependency upgrade decisions
//!
//! `UpgradeJudge` decides, without touching the manifest, whether a declared
//! dependency is processed and what constraint it should end up with.

use crate::constraint::{apply_strategy, parse, render, ConstraintVersion, VersionConstraint};
use crate::domain::{
    DependencySpec, ReleaseVersion, SchemaDialect, SkipReason, UpgradePolicy, UpgradeRecord,
};

/// Decision engine for one upgrade run
pub struct UpgradeJudge<'a> {
    policy: &'a UpgradePolicy,
    dialect: SchemaDialect,
}

impl<'a> UpgradeJudge<'a> {
    /// Create a judge for a policy and manifest dialect
    pub fn new(policy: &'a UpgradePolicy, dialect: SchemaDialect) -> Self {
        Self { policy, dialect }
    }

    /// Returns the reason a dependency is not looked up at all, if any
    pub fn should_skip(&self, dependency: &DependencySpec) -> Option<SkipReason> {
        if !dependency.is_registry() {
            return Some(SkipReason::NonRegistry(dependency.source_kind));
        }
        if !self.policy.should_process_package(&dependency.name) {
            return Some(SkipReason::NotInOnlyList);
        }
        let Some(text) = dependency.constraint.as_deref() else {
            return Some(SkipReason::Unconstrained);
        };
        match parse(text, self.dialect) {
            VersionConstraint::Raw(raw) => Some(SkipReason::UnparseableConstraint(raw)),
            _ => None,
        }
    }

    /// Decides what to do with a dependency given its latest eligible release
    pub fn judge(&self, dependency: &DependencySpec, latest: &ReleaseVersion) -> UpgradeRecord {
        let current = parse(dependency.constraint_str(), self.dialect);

        if !self.policy.allow_major_bump {
            if let Some(lower) = current.lower_bound() {
                if latest.major() > lower.major {
                    return UpgradeRecord::skip(
                        dependency.clone(),
                        SkipReason::MajorBump {
                            current: lower.major,
                            latest: latest.raw.clone(),
                        },
                    );
                }
            }
        }

        let target = apply_strategy(
            &ConstraintVersion::from_release(latest),
            self.policy.strategy,
            self.dialect,
        );
        let rendered = render(&target, self.dialect);

        if target == current || rendered == dependency.constraint_str().trim() {
            UpgradeRecord::no_op(dependency.clone(), latest.raw.clone())
        } else {
            UpgradeRecord::upgrade(dependency.clone(), rendered, latest.raw.clone())
        }
    }
}
