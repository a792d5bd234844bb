//! Project settings
//!
//! Settings live in the manifest itself under `[tool.pydepup]` (and
//! `[tool.pydepup.imports]`). Every key is optional; CLI flags override
//! them and built-in defaults fill the rest.

use crate::domain::FailOn;
use crate::domain::UpgradeStrategy;
use crate::error::ConfigError;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// `[tool.pydepup]`
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct Settings {
    /// Constraint style written by `upgrade`
    pub strategy: Option<UpgradeStrategy>,
    /// Groups processed by `upgrade`
    pub groups: Option<Vec<String>>,
    /// Allow upgrades across a major version
    pub allow_major: Option<bool>,
    /// Consider pre-releases
    pub allow_prerelease: Option<bool>,
    /// Package index base URL
    pub index_url: Option<String>,
    /// Registry request timeout in seconds
    pub timeout: Option<u64>,
    /// `[tool.pydepup.imports]`
    pub imports: ImportSettings,
}

/// `[tool.pydepup.imports]`
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct ImportSettings {
    pub source_roots: Option<Vec<PathBuf>>,
    pub exclude_dirs: Vec<String>,
    pub ignore: Vec<String>,
    pub site_packages: Vec<PathBuf>,
    pub declared_groups: Option<Vec<String>>,
    pub fail_on: Option<FailOn>,
    pub fix_to: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawManifest {
    #[serde(default)]
    tool: RawTool,
}

#[derive(Debug, Default, Deserialize)]
struct RawTool {
    pydepup: Option<Settings>,
}

impl Settings {
    /// Reads `[tool.pydepup]` from manifest text; absent means defaults
    pub fn from_manifest(text: &str) -> Result<Self, ConfigError> {
        let raw: RawManifest = toml::from_str(text).map_err(|e| ConfigError::InvalidSettings {
            message: e.message().to_string(),
        })?;
        let settings = raw.tool.pydepup.unwrap_or_default();
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout == Some(0) {
            return Err(ConfigError::InvalidSettings {
                message: "timeout must be at least 1 second".to_string(),
            });
        }
        if let Some(url) = &self.index_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ConfigError::InvalidSettings {
                    message: format!("index-url '{}' is not an http(s) URL", url),
                });
            }
        }
        Ok(())
    }

    /// Registry timeout, if configured
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout.map(Duration::from_secs)
    }
}
