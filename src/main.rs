//! pydepup - pyproject.toml editor, upgrader and import checker
//!
//! Commands:
//! - bump-version, set-dep, remove-dep, set-python, print: single edits
//! - upgrade: rewrite constraints to the latest registry releases
//! - check-imports: compare imports with declared dependencies

use clap::Parser;
use pydepup::cli::CliArgs;
use pydepup::logging;
use pydepup::orchestrator::Orchestrator;
use pydepup::output::{create_formatter, OutputConfig};
use std::io::{self, Write};
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let args = CliArgs::parse();

    if let Err(e) = logging::init(args.verbose, args.quiet) {
        eprintln!("Warning: logging disabled: {}", e);
    }

    match run(args).await {
        Ok(exit_code) => exit_code,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Main application logic
async fn run(args: CliArgs) -> anyhow::Result<ExitCode> {
    let output_config = OutputConfig::from_cli(args.json, args.verbose, args.quiet);

    let result = Orchestrator::new(args).run().await?;

    let formatter = create_formatter(output_config);
    let mut stdout = io::stdout().lock();
    formatter.format(&result, &mut stdout)?;
    stdout.flush()?;

    Ok(result.status.into())
}
