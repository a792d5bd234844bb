//! Text output formatter for human-readable display
//!
//! This module provides:
//! - Upgrade results with semantic change type indication (major/minor/patch)
//! - Import findings grouped into missing, unused and ambiguous
//! - Check-mode diffs
//! - Summary lines

use crate::constraint::parse;
use crate::domain::{EditOutcome, FixReport, ImportReport, UpgradeRecord, UpgradeReport};
use crate::orchestrator::{CommandOutput, OrchestratorResult};
use crate::output::{write_diff, OutputFormatter, Verbosity};
use colored::{ColoredString, Colorize};
use std::io::Write;

/// Minimum width of the package name column
const NAME_WIDTH: usize = 20;

/// Semantic version change type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionChangeType {
    /// Major version change (breaking)
    Major,
    /// Minor version change (features)
    Minor,
    /// Patch version change (fixes)
    Patch,
    /// Unknown or unparseable
    Unknown,
}

impl VersionChangeType {
    /// Determine the change type between two versions
    pub fn from_versions(old: &str, new: &str) -> Self {
        let parse = |v: &str| -> Option<(u64, u64)> {
            let mut parts = v.trim().split('.');
            let major = parts.next()?.parse().ok()?;
            let minor = match parts.next() {
                Some(p) => p.parse().ok()?,
                None => 0,
            };
            Some((major, minor))
        };

        match (parse(old), parse(new)) {
            (Some((old_major, old_minor)), Some((new_major, new_minor))) => {
                if new_major != old_major {
                    VersionChangeType::Major
                } else if new_minor != old_minor {
                    VersionChangeType::Minor
                } else {
                    VersionChangeType::Patch
                }
            }
            _ => VersionChangeType::Unknown,
        }
    }

    /// Get the display label with color
    pub fn colored_label(&self) -> String {
        match self {
            VersionChangeType::Major => "major".red().bold().to_string(),
            VersionChangeType::Minor => "minor".yellow().to_string(),
            VersionChangeType::Patch => "patch".green().to_string(),
            VersionChangeType::Unknown => "?".dimmed().to_string(),
        }
    }

    /// Get the plain label
    pub fn label(&self) -> &'static str {
        match self {
            VersionChangeType::Major => "major",
            VersionChangeType::Minor => "minor",
            VersionChangeType::Patch => "patch",
            VersionChangeType::Unknown => "?",
        }
    }
}

/// Text formatter for human-readable output
pub struct TextFormatter {
    /// Verbosity level
    verbosity: Verbosity,
    /// Whether to use colors
    color: bool,
}

impl TextFormatter {
    /// Create a new text formatter
    pub fn new(verbosity: Verbosity) -> Self {
        Self {
            verbosity,
            color: true,
        }
    }

    /// Create a new text formatter with color option
    pub fn with_color(verbosity: Verbosity, color: bool) -> Self {
        Self { verbosity, color }
    }

    fn paint(&self, text: &str, style: fn(&str) -> ColoredString) -> String {
        if self.color {
            style(text).to_string()
        } else {
            text.to_string()
        }
    }

    /// Get the check-mode prefix if applicable
    fn check_prefix(&self, check: bool) -> String {
        if check {
            format!("{} ", self.paint("(check)", |s| s.cyan()))
        } else {
            String::new()
        }
    }

    fn plural(count: usize, one: &'static str, many: &'static str) -> &'static str {
        if count == 1 {
            one
        } else {
            many
        }
    }

    /// Writes the diff of a pending edit
    fn format_outcome(
        &self,
        outcome: &EditOutcome,
        writer: &mut dyn Write,
    ) -> std::io::Result<()> {
        if let Some(diff) = &outcome.diff {
            if self.verbosity != Verbosity::Quiet && !diff.is_empty() {
                writeln!(writer)?;
                write_diff(diff, self.color, writer)?;
            }
        }
        Ok(())
    }

    fn format_edit(
        &self,
        action: &str,
        outcome: &EditOutcome,
        check: bool,
        writer: &mut dyn Write,
    ) -> std::io::Result<()> {
        let prefix = self.check_prefix(check);
        let path = outcome.path.display().to_string();
        if !outcome.changed() {
            writeln!(
                writer,
                "{}{}: {} ({})",
                prefix,
                self.paint(&path, |s| s.bold()),
                action,
                self.paint("no changes", |s| s.dimmed())
            )?;
            return Ok(());
        }
        writeln!(writer, "{}{}: {}", prefix, self.paint(&path, |s| s.bold()), action)?;
        self.format_outcome(outcome, writer)
    }

    /// Format a single upgrade line
    fn format_upgrade_line(
        &self,
        record: &UpgradeRecord,
        report: &UpgradeReport,
        writer: &mut dyn Write,
    ) -> std::io::Result<()> {
        let UpgradeRecord::Upgrade {
            dependency,
            new_constraint,
            latest,
        } = record
        else {
            return Ok(());
        };
        let old = parse(dependency.constraint_str(), report.dialect)
            .lower_bound()
            .map(|v| v.to_string())
            .unwrap_or_default();
        let change_type = VersionChangeType::from_versions(&old, latest);
        let label = if self.color {
            change_type.colored_label()
        } else {
            change_type.label().to_string()
        };
        let group = if dependency.group == crate::domain::MAIN_GROUP {
            String::new()
        } else {
            format!(" ({})", dependency.group)
        };
        let name = format!("{:width$}", dependency.name, width = NAME_WIDTH);
        let arrow = if self.color { "→" } else { "->" };

        writeln!(
            writer,
            "  {} {} {} {} [{}]{}",
            name,
            self.paint(dependency.constraint_str(), |s| s.dimmed()),
            self.paint(arrow, |s| s.dimmed()),
            self.paint(new_constraint, |s| s.bright_white().bold()),
            label,
            self.paint(&group, |s| s.dimmed())
        )
    }

    /// Format a single skip line
    fn format_skip_line(&self, record: &UpgradeRecord, writer: &mut dyn Write) -> std::io::Result<()> {
        let UpgradeRecord::Skip { dependency, reason } = record else {
            return Ok(());
        };
        let name = format!("{:width$}", dependency.name, width = NAME_WIDTH);
        let reason = format!("({})", reason);
        if record.is_failure() {
            writeln!(writer, "  {} {}", name, self.paint(&reason, |s| s.red()))
        } else {
            writeln!(
                writer,
                "  {} {}",
                self.paint(&name, |s| s.dimmed()),
                self.paint(&reason, |s| s.dimmed())
            )
        }
    }

    fn format_upgrade(
        &self,
        report: &UpgradeReport,
        check: bool,
        writer: &mut dyn Write,
    ) -> std::io::Result<()> {
        let prefix = self.check_prefix(check);
        let upgrades = report.upgrade_count();
        let failures = report.failure_count();

        if self.verbosity == Verbosity::Quiet {
            let mut line = if upgrades > 0 {
                format!("{} upgraded", self.paint(&upgrades.to_string(), |s| s.green()))
            } else {
                self.paint("No upgrades", |s| s.dimmed())
            };
            if failures > 0 {
                line.push_str(&format!(", {} failed", self.paint(&failures.to_string(), |s| s.red())));
            }
            return writeln!(writer, "{}{}", prefix, line);
        }

        let path = report.outcome.path.display().to_string();
        let skips = report.skip_count();
        writeln!(
            writer,
            "{}{} {}: {} {}, {} {}",
            prefix,
            self.paint(&path, |s| s.bold()),
            self.paint(&format!("({})", report.dialect), |s| s.dimmed()),
            self.paint(&upgrades.to_string(), |s| s.green()),
            Self::plural(upgrades, "upgrade", "upgrades"),
            self.paint(&skips.to_string(), |s| s.dimmed()),
            Self::plural(skips, "skip", "skips"),
        )?;

        for record in report.upgrades() {
            self.format_upgrade_line(record, report, writer)?;
        }

        let failed: Vec<&UpgradeRecord> = report.records.iter().filter(|r| r.is_failure()).collect();
        if !failed.is_empty() {
            writeln!(writer)?;
            writeln!(writer, "  {}", self.paint("Failed:", |s| s.red().bold()))?;
            for record in failed {
                self.format_skip_line(record, writer)?;
            }
        }

        if self.verbosity == Verbosity::Verbose {
            let skipped: Vec<&UpgradeRecord> = report.skips().filter(|r| !r.is_failure()).collect();
            if !skipped.is_empty() {
                writeln!(writer)?;
                writeln!(writer, "  {}", self.paint("Skipped:", |s| s.dimmed()))?;
                for record in skipped {
                    self.format_skip_line(record, writer)?;
                }
            }
            let current: Vec<&UpgradeRecord> = report.records.iter().filter(|r| r.is_no_op()).collect();
            if !current.is_empty() {
                writeln!(writer)?;
                writeln!(writer, "  {}", self.paint("Up to date:", |s| s.dimmed()))?;
                for record in current {
                    writeln!(writer, "  {}", self.paint(record.package_name(), |s| s.dimmed()))?;
                }
            }
        }

        self.format_outcome(&report.outcome, writer)
    }

    fn format_section(
        &self,
        title: &str,
        rows: Vec<(String, String)>,
        style: fn(&str) -> ColoredString,
        writer: &mut dyn Write,
    ) -> std::io::Result<()> {
        if rows.is_empty() {
            return Ok(());
        }
        writeln!(writer, "{}", self.paint(title, style))?;
        for (name, detail) in rows {
            if detail.is_empty() {
                writeln!(writer, "  {}", name)?;
            } else {
                let name = format!("{:width$}", name, width = NAME_WIDTH);
                writeln!(writer, "  {} {}", name, self.paint(&detail, |s| s.dimmed()))?;
            }
        }
        writeln!(writer)
    }

    fn format_imports(
        &self,
        report: &ImportReport,
        fix: Option<&FixReport>,
        outcome: Option<&EditOutcome>,
        check: bool,
        writer: &mut dyn Write,
    ) -> std::io::Result<()> {
        let prefix = self.check_prefix(check);

        if self.verbosity != Verbosity::Quiet {
            let missing = report
                .missing
                .iter()
                .map(|p| {
                    let modules = report
                        .missing_sources
                        .get(p)
                        .map(|m| m.iter().cloned().collect::<Vec<_>>().join(", "))
                        .unwrap_or_default();
                    let detail = if modules.is_empty() {
                        String::new()
                    } else {
                        format!("(imported as {})", modules)
                    };
                    (p.clone(), detail)
                })
                .collect();
            self.format_section("Missing (imported but not declared):", missing, |s| s.red().bold(), writer)?;

            let unused = report.unused.iter().map(|p| (p.clone(), String::new())).collect();
            self.format_section("Unused (declared but not imported):", unused, |s| s.yellow().bold(), writer)?;

            let ambiguous = report
                .ambiguous
                .iter()
                .map(|(module, candidates)| {
                    let names = candidates.iter().cloned().collect::<Vec<_>>().join(", ");
                    (module.clone(), names)
                })
                .collect();
            self.format_section("Ambiguous modules:", ambiguous, |s| s.cyan(), writer)?;

            if let Some(fix) = fix {
                let added = fix
                    .added
                    .iter()
                    .map(|a| (a.package.clone(), format!("{} ({})", a.constraint, a.group)))
                    .collect();
                self.format_section("Added:", added, |s| s.green().bold(), writer)?;
                let failed = fix
                    .failures
                    .iter()
                    .map(|f| (f.package.clone(), f.error.clone()))
                    .collect();
                self.format_section("Could not add:", failed, |s| s.red().bold(), writer)?;
            }
        }

        if report.is_clean() {
            writeln!(writer, "{}{}", prefix, self.paint("All imports are declared", |s| s.green()))?;
        } else {
            writeln!(
                writer,
                "{}{} missing, {} unused",
                prefix,
                self.paint(&report.missing.len().to_string(), |s| s.red()),
                self.paint(&report.unused.len().to_string(), |s| s.yellow())
            )?;
        }

        match outcome {
            Some(outcome) => self.format_outcome(outcome, writer),
            None => Ok(()),
        }
    }
}

impl OutputFormatter for TextFormatter {
    fn format(&self, result: &OrchestratorResult, writer: &mut dyn Write) -> std::io::Result<()> {
        match &result.output {
            CommandOutput::Edit { action, outcome } => {
                self.format_edit(action, outcome, result.check, writer)
            }
            CommandOutput::Print { content } => write!(writer, "{}", content),
            CommandOutput::Upgrade(report) => self.format_upgrade(report, result.check, writer),
            CommandOutput::Imports {
                report,
                fix,
                outcome,
                ..
            } => self.format_imports(report, fix.as_ref(), outcome.as_ref(), result.check, writer),
        }
    }
}
