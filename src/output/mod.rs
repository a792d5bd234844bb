//! Output formatting for command results
//!
//! This module provides:
//! - Text output for human-readable display
//! - JSON output for machine processing
//! - Unified diffs for check mode

mod diff;
mod json;
mod text;

pub use diff::{unified_diff, write_diff};
pub use json::JsonFormatter;
pub use text::{TextFormatter, VersionChangeType};

use crate::orchestrator::OrchestratorResult;
use std::io::{IsTerminal, Write};

/// Rendering of a command result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// How much a formatter reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    /// Counts and failures only
    Quiet,
    #[default]
    Normal,
    /// Also lists skipped and up-to-date packages
    Verbose,
}

impl Verbosity {
    /// Quiet wins; clap already rejects both flags together
    pub fn from_flags(verbose: bool, quiet: bool) -> Self {
        match (verbose, quiet) {
            (_, true) => Verbosity::Quiet,
            (true, false) => Verbosity::Verbose,
            (false, false) => Verbosity::Normal,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct OutputConfig {
    pub format: OutputFormat,
    pub verbosity: Verbosity,
    /// ANSI colors in text output
    pub color: bool,
}

impl OutputConfig {
    /// Color is enabled only when stdout is a terminal
    pub fn from_cli(json: bool, verbose: bool, quiet: bool) -> Self {
        Self {
            format: if json { OutputFormat::Json } else { OutputFormat::Text },
            verbosity: Verbosity::from_flags(verbose, quiet),
            color: !json && std::io::stdout().is_terminal(),
        }
    }
}

/// Trait for output formatters
pub trait OutputFormatter {
    /// Format and write the orchestrator result
    fn format(&self, result: &OrchestratorResult, writer: &mut dyn Write) -> std::io::Result<()>;
}

/// Create an output formatter based on configuration
pub fn create_formatter(config: OutputConfig) -> Box<dyn OutputFormatter> {
    match config.format {
        OutputFormat::Text => Box::new(TextFormatter::with_color(config.verbosity, config.color)),
        OutputFormat::Json => Box::new(JsonFormatter::new(config.verbosity)),
    }
}
