//! Diagnostic logging setup
//!
//! Logs go to stderr so text and JSON reports on stdout stay clean.
//! `RUST_LOG` takes precedence over the level picked from the CLI flags.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Log level implied by the verbosity flags
pub fn default_level(verbose: bool, quiet: bool) -> &'static str {
    if quiet {
        "error"
    } else if verbose {
        "info"
    } else {
        "warn"
    }
}

/// Installs the global subscriber
pub fn init(verbose: bool, quiet: bool) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let filter_layer = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level(verbose, quiet)))?;

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(true)
        .compact();

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}
