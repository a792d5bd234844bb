//! JSON output formatter for machine processing
//!
//! This module provides:
//! - JSON serialization of every command result
//! - The exit status alongside the result, so callers need not decode exit codes

use crate::domain::{EditOutcome, ExitStatus, FailOn, FixReport, ImportReport, UpgradeRecord, UpgradeReport};
use crate::orchestrator::{CommandOutput, OrchestratorResult};
use crate::output::{OutputFormatter, Verbosity};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::io::Write;

/// JSON formatter for machine-readable output
pub struct JsonFormatter {
    /// Verbosity level affects detail in output
    verbosity: Verbosity,
}

impl JsonFormatter {
    /// Create a new JSON formatter
    pub fn new(verbosity: Verbosity) -> Self {
        Self { verbosity }
    }
}

/// JSON representation of the full result
#[derive(Serialize)]
struct JsonOutput<'a> {
    /// Command name
    command: &'static str,
    /// Whether this was a check-mode run
    check: bool,
    /// Structured status
    status: ExitStatus,
    /// Process exit code
    exit_code: u8,
    /// Command specific payload
    #[serde(flatten)]
    body: JsonBody<'a>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum JsonBody<'a> {
    Edit {
        action: &'a str,
        file: JsonFile<'a>,
    },
    Print {
        content: &'a str,
    },
    Upgrade {
        dialect: String,
        summary: JsonUpgradeSummary,
        updates: Vec<JsonUpdate<'a>>,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        skips: Vec<JsonSkip<'a>>,
        file: JsonFile<'a>,
    },
    Imports {
        fail_on: FailOn,
        missing: &'a BTreeSet<String>,
        unused: &'a BTreeSet<String>,
        #[serde(skip_serializing_if = "is_empty_map")]
        missing_sources: &'a BTreeMap<String, BTreeSet<String>>,
        #[serde(skip_serializing_if = "is_empty_map")]
        ambiguous: &'a BTreeMap<String, BTreeSet<String>>,
        #[serde(skip_serializing_if = "Option::is_none")]
        fix: Option<&'a FixReport>,
        #[serde(skip_serializing_if = "Option::is_none")]
        file: Option<JsonFile<'a>>,
    },
}

fn is_empty_map<K, V>(map: &&BTreeMap<K, V>) -> bool {
    map.is_empty()
}

/// What happened to the manifest file
#[derive(Serialize)]
struct JsonFile<'a> {
    path: String,
    changed: bool,
    written: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    diff: Option<&'a str>,
}

#[derive(Serialize)]
struct JsonUpgradeSummary {
    upgrades: usize,
    up_to_date: usize,
    skips: usize,
    failures: usize,
}

/// JSON representation of an upgrade
#[derive(Serialize)]
struct JsonUpdate<'a> {
    name: &'a str,
    group: &'a str,
    from: &'a str,
    to: &'a str,
    latest: &'a str,
}

/// JSON representation of a skip
#[derive(Serialize)]
struct JsonSkip<'a> {
    name: &'a str,
    group: &'a str,
    constraint: Option<&'a str>,
    reason: String,
}

impl<'a> JsonFile<'a> {
    fn from_outcome(outcome: &'a EditOutcome) -> Self {
        Self {
            path: outcome.path.display().to_string(),
            changed: outcome.changed(),
            written: outcome.written,
            diff: outcome.diff.as_deref(),
        }
    }
}

impl JsonFormatter {
    fn upgrade_body<'a>(&self, report: &'a UpgradeReport) -> JsonBody<'a> {
        let updates = report
            .records
            .iter()
            .filter_map(|record| match record {
                UpgradeRecord::Upgrade {
                    dependency,
                    new_constraint,
                    latest,
                } => Some(JsonUpdate {
                    name: &dependency.name,
                    group: &dependency.group,
                    from: dependency.constraint_str(),
                    to: new_constraint,
                    latest,
                }),
                _ => None,
            })
            .collect();

        // failures are always reported; other skips only in verbose mode
        let skips = report
            .records
            .iter()
            .filter_map(|record| match record {
                UpgradeRecord::Skip { dependency, reason }
                    if record.is_failure() || self.verbosity == Verbosity::Verbose =>
                {
                    Some(JsonSkip {
                        name: &dependency.name,
                        group: &dependency.group,
                        constraint: dependency.constraint.as_deref(),
                        reason: reason.to_string(),
                    })
                }
                _ => None,
            })
            .collect();

        JsonBody::Upgrade {
            dialect: report.dialect.to_string(),
            summary: JsonUpgradeSummary {
                upgrades: report.upgrade_count(),
                up_to_date: report.no_op_count(),
                skips: report.skip_count(),
                failures: report.failure_count(),
            },
            updates,
            skips,
            file: JsonFile::from_outcome(&report.outcome),
        }
    }

    fn imports_body<'a>(
        report: &'a ImportReport,
        fail_on: FailOn,
        fix: Option<&'a FixReport>,
        outcome: Option<&'a EditOutcome>,
    ) -> JsonBody<'a> {
        JsonBody::Imports {
            fail_on,
            missing: &report.missing,
            unused: &report.unused,
            missing_sources: &report.missing_sources,
            ambiguous: &report.ambiguous,
            fix,
            file: outcome.map(JsonFile::from_outcome),
        }
    }

    fn to_json<'a>(&self, result: &'a OrchestratorResult) -> JsonOutput<'a> {
        let (command, body) = match &result.output {
            CommandOutput::Edit { action, outcome } => (
                "edit",
                JsonBody::Edit {
                    action,
                    file: JsonFile::from_outcome(outcome),
                },
            ),
            CommandOutput::Print { content } => ("print", JsonBody::Print { content }),
            CommandOutput::Upgrade(report) => ("upgrade", self.upgrade_body(report)),
            CommandOutput::Imports {
                report,
                fail_on,
                fix,
                outcome,
            } => (
                "check-imports",
                Self::imports_body(report, *fail_on, fix.as_ref(), outcome.as_ref()),
            ),
        };
        JsonOutput {
            command,
            check: result.check,
            status: result.status,
            exit_code: result.status.code(),
            body,
        }
    }
}

impl OutputFormatter for JsonFormatter {
    fn format(&self, result: &OrchestratorResult, writer: &mut dyn Write) -> std::io::Result<()> {
        let output = self.to_json(result);
        let json = serde_json::to_string_pretty(&output)
            .map_err(std::io::Error::other)?;
        writeln!(writer, "{}", json)
    }
}
