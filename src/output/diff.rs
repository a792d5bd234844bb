//! Unified diff rendering for check mode
//!
//! This module provides:
//! - Unified diff text between the manifest before and after edits
//! - Colored rendering of that diff for terminals

use colored::Colorize;
use similar::TextDiff;
use std::io::Write;

/// Lines of context around each hunk
const CONTEXT_LINES: usize = 3;

/// Builds a unified diff between two versions of a file
pub fn unified_diff(path: &str, before: &str, after: &str) -> String {
    TextDiff::from_lines(before, after)
        .unified_diff()
        .context_radius(CONTEXT_LINES)
        .header(&format!("a/{}", path), &format!("b/{}", path))
        .to_string()
}

/// Writes a unified diff, coloring added and removed lines when asked
pub fn write_diff(diff: &str, color: bool, writer: &mut dyn Write) -> std::io::Result<()> {
    for line in diff.lines() {
        if !color {
            writeln!(writer, "{}", line)?;
            continue;
        }
        if line.starts_with("+++") || line.starts_with("---") {
            writeln!(writer, "{}", line.bold())?;
        } else if line.starts_with("@@") {
            writeln!(writer, "{}", line.cyan())?;
        } else if line.starts_with('+') {
            writeln!(writer, "{}", line.green())?;
        } else if line.starts_with('-') {
            writeln!(writer, "{}", line.red())?;
        } else {
            writeln!(writer, "{}", line)?;
        }
    }
    Ok(())
}
