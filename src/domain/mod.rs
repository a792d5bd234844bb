//! Core domain models for pydepup
//!
//! This module contains the fundamental types used throughout the application:
//! - Manifest dialects
//! - Dependency declarations and source kinds
//! - Registry releases
//! - Upgrade policy and per-dependency upgrade records
//! - Import reconciliation reports
//! - Exit status

mod dependency;
mod dialect;
mod exit_status;
mod import_report;
mod policy;
mod release;
mod summary;
mod update_result;

pub use dependency::{is_valid_name, normalize_name, DependencySpec, SourceKind, MAIN_GROUP};
pub use dialect::SchemaDialect;
pub use exit_status::ExitStatus;
pub use import_report::{FailOn, FixAddition, FixFailure, FixReport, ImportReport};
pub use policy::{UpgradePolicy, UpgradeStrategy};
pub use release::ReleaseVersion;
pub use summary::{EditOutcome, UpgradeReport};
pub use update_result::{SkipReason, UpgradeRecord};
