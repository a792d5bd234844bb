//! CLI argument parsing module for pydepup

use crate::domain::{FailOn, UpgradeStrategy};
use crate::editor::BumpLevel;
use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

/// Parse a timeout in seconds (`30`) or with a unit suffix (`30s`, `2m`)
fn parse_timeout(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty timeout".to_string());
    }

    let (num_str, scale) = if let Some(n) = s.strip_suffix('s') {
        (n, 1)
    } else if let Some(n) = s.strip_suffix('m') {
        (n, 60)
    } else {
        (s, 1)
    };

    let num: u64 = num_str
        .parse()
        .map_err(|_| format!("invalid number in timeout: {}", num_str))?;
    if num == 0 {
        return Err("timeout must be at least 1 second".to_string());
    }
    Ok(Duration::from_secs(num * scale))
}

/// pyproject.toml editor, dependency upgrader and import checker
#[derive(Parser, Debug, Clone)]
#[command(name = "pydepup", version, about = "pyproject.toml editor, upgrader and import checker")]
pub struct CliArgs {
    /// Path to the manifest
    #[arg(short, long, global = true, default_value = "pyproject.toml")]
    pub file: PathBuf,

    /// Show what would change without writing the manifest
    #[arg(long, global = true)]
    pub check: bool,

    /// Enable verbose output
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Enable quiet mode - minimal output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output results in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Bump the project version
    BumpVersion {
        /// major, minor or patch
        level: BumpLevel,
    },

    /// Add or update a dependency
    SetDep {
        /// Package name
        name: String,
        /// Version constraint in the manifest's dialect
        spec: String,
        /// Dependency group
        #[arg(short, long, default_value = "main")]
        group: String,
    },

    /// Remove a dependency
    RemoveDep {
        /// Package name
        name: String,
        /// Dependency group
        #[arg(short, long, default_value = "main")]
        group: String,
    },

    /// Set the supported Python range
    SetPython {
        /// Comparator list, e.g. ">=3.10,<3.13"
        spec: String,
    },

    /// Print the manifest as pydepup renders it
    Print,

    /// Upgrade dependency constraints to the latest releases
    Upgrade(UpgradeArgs),

    /// Compare imports against declared dependencies
    CheckImports(CheckImportsArgs),
}

/// Options of `upgrade`
#[derive(Args, Debug, Clone, Default)]
pub struct UpgradeArgs {
    /// Constraint style: exact, caret, tilde or floor
    #[arg(long)]
    pub strategy: Option<UpgradeStrategy>,

    /// Groups to upgrade (can be specified multiple times)
    #[arg(long = "groups", value_delimiter = ',', action = ArgAction::Append)]
    pub groups: Vec<String>,

    /// Upgrade only specific packages (can be specified multiple times)
    #[arg(long, value_delimiter = ',', action = ArgAction::Append)]
    pub only: Vec<String>,

    /// Allow upgrades across a major version
    #[arg(long)]
    pub allow_major: bool,

    /// Consider pre-releases
    #[arg(long)]
    pub pre: bool,

    /// Registry request timeout (e.g. 30, 30s, 2m)
    #[arg(long, value_parser = parse_timeout)]
    pub timeout: Option<Duration>,

    /// Package index base URL
    #[arg(long)]
    pub index_url: Option<String>,
}

/// Options of `check-imports`
#[derive(Args, Debug, Clone, Default)]
pub struct CheckImportsArgs {
    /// Project root (default: the manifest's directory)
    #[arg(long)]
    pub root: Option<PathBuf>,

    /// Source roots to scan (can be specified multiple times)
    #[arg(long = "src", action = ArgAction::Append)]
    pub src: Vec<PathBuf>,

    /// Groups whose packages count as declared
    #[arg(long = "groups", value_delimiter = ',', action = ArgAction::Append)]
    pub groups: Vec<String>,

    /// Directory names to skip while scanning
    #[arg(long = "exclude-dir", action = ArgAction::Append)]
    pub exclude_dir: Vec<String>,

    /// Packages never reported
    #[arg(long, value_delimiter = ',', action = ArgAction::Append)]
    pub ignore: Vec<String>,

    /// site-packages directories used for module-to-package mapping
    #[arg(long = "site-packages", action = ArgAction::Append)]
    pub site_packages: Vec<PathBuf>,

    /// Which findings fail the check: missing, unused, both or none
    #[arg(long)]
    pub fail_on: Option<FailOn>,

    /// Add missing packages to the manifest
    #[arg(long)]
    pub fix: bool,

    /// Group that receives the added packages
    #[arg(long, requires = "fix")]
    pub fix_to: Option<String>,

    /// Constraint style for added packages
    #[arg(long)]
    pub strategy: Option<UpgradeStrategy>,

    /// Consider pre-releases for added packages
    #[arg(long)]
    pub pre: bool,

    /// Registry request timeout (e.g. 30, 30s, 2m)
    #[arg(long, value_parser = parse_timeout)]
    pub timeout: Option<Duration>,

    /// Package index base URL
    #[arg(long)]
    pub index_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_global_defaults() {
        let args = CliArgs::parse_from(["pydepup", "print"]);
        assert_eq!(args.file, PathBuf::from("pyproject.toml"));
        assert!(!args.check);
        assert!(!args.verbose);
        assert!(!args.quiet);
        assert!(!args.json);
        assert!(matches!(args.command, Command::Print));
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let args = CliArgs::parse_from(["pydepup", "print", "--file", "other.toml", "--json"]);
        assert_eq!(args.file, PathBuf::from("other.toml"));
        assert!(args.json);
    }

    #[test]
    fn test_verbose_conflicts_with_quiet() {
        assert!(CliArgs::try_parse_from(["pydepup", "-v", "-q", "print"]).is_err());
    }

    #[test]
    fn test_bump_version() {
        let args = CliArgs::parse_from(["pydepup", "bump-version", "minor"]);
        assert!(matches!(
            args.command,
            Command::BumpVersion {
                level: BumpLevel::Minor
            }
        ));
        assert!(CliArgs::try_parse_from(["pydepup", "bump-version", "huge"]).is_err());
    }

    #[test]
    fn test_set_dep() {
        let args = CliArgs::parse_from(["pydepup", "set-dep", "requests", ">=2.31", "-g", "dev"]);
        match args.command {
            Command::SetDep { name, spec, group } => {
                assert_eq!(name, "requests");
                assert_eq!(spec, ">=2.31");
                assert_eq!(group, "dev");
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_remove_dep_default_group() {
        let args = CliArgs::parse_from(["pydepup", "remove-dep", "rich"]);
        match args.command {
            Command::RemoveDep { name, group } => {
                assert_eq!(name, "rich");
                assert_eq!(group, "main");
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_upgrade_options() {
        let args = CliArgs::parse_from([
            "pydepup",
            "--check",
            "upgrade",
            "--strategy",
            "tilde",
            "--groups",
            "main,dev",
            "--only",
            "requests",
            "--only",
            "django",
            "--allow-major",
            "--pre",
            "--timeout",
            "2m",
        ]);
        assert!(args.check);
        let Command::Upgrade(upgrade) = args.command else {
            panic!("expected upgrade");
        };
        assert_eq!(upgrade.strategy, Some(UpgradeStrategy::Tilde));
        assert_eq!(upgrade.groups, vec!["main", "dev"]);
        assert_eq!(upgrade.only, vec!["requests", "django"]);
        assert!(upgrade.allow_major);
        assert!(upgrade.pre);
        assert_eq!(upgrade.timeout, Some(Duration::from_secs(120)));
    }

    #[test]
    fn test_check_imports_options() {
        let args = CliArgs::parse_from([
            "pydepup",
            "check-imports",
            "--src",
            "src",
            "--src",
            "scripts",
            "--exclude-dir",
            "generated",
            "--ignore",
            "types-requests",
            "--fail-on",
            "missing",
            "--fix",
            "--fix-to",
            "dev",
        ]);
        let Command::CheckImports(check) = args.command else {
            panic!("expected check-imports");
        };
        assert_eq!(check.src, vec![PathBuf::from("src"), PathBuf::from("scripts")]);
        assert_eq!(check.exclude_dir, vec!["generated"]);
        assert_eq!(check.ignore, vec!["types-requests"]);
        assert_eq!(check.fail_on, Some(FailOn::Missing));
        assert!(check.fix);
        assert_eq!(check.fix_to.as_deref(), Some("dev"));
    }

    #[test]
    fn test_fix_to_requires_fix() {
        assert!(CliArgs::try_parse_from(["pydepup", "check-imports", "--fix-to", "dev"]).is_err());
    }

    #[test]
    fn test_parse_timeout() {
        assert_eq!(parse_timeout("30").unwrap(), Duration::from_secs(30));
        assert_eq!(parse_timeout("45s").unwrap(), Duration::from_secs(45));
        assert_eq!(parse_timeout("2m").unwrap(), Duration::from_secs(120));
        assert!(parse_timeout("").is_err());
        assert!(parse_timeout("0").is_err());
        assert!(parse_timeout("ten").is_err());
    }
}
