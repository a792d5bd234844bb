//! PyPI JSON API adapter
//!
//! Fetches package release information from PyPI or a compatible index.
//! API endpoint: {index}/pypi/{normalized-name}/json

use crate::domain::{normalize_name, ReleaseVersion};
use crate::error::RegistryError;
use crate::registry::{HttpClient, RegistryAdapter};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::HashMap;
use tracing::debug;

/// Default index base URL
pub const DEFAULT_INDEX_URL: &str = "https://pypi.org";

/// PyPI adapter
pub struct PyPIAdapter {
    client: HttpClient,
    index_url: String,
}

/// PyPI package metadata response
#[derive(Debug, Deserialize)]
struct PyPIResponse {
    /// Release files keyed by version
    #[serde(default)]
    releases: HashMap<String, Vec<ReleaseFile>>,
}

/// Release file information
#[derive(Debug, Deserialize)]
struct ReleaseFile {
    /// Upload time for the release file
    upload_time_iso_8601: Option<String>,
    /// Whether this file was yanked
    #[serde(default)]
    yanked: bool,
}

impl PyPIAdapter {
    /// Create a new PyPI adapter against the public index
    pub fn new(client: HttpClient) -> Self {
        Self {
            client,
            index_url: DEFAULT_INDEX_URL.to_string(),
        }
    }

    /// Use a different index base URL
    pub fn with_index_url(mut self, index_url: impl Into<String>) -> Self {
        self.index_url = index_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Build the URL for a package
    fn build_url(&self, package: &str) -> String {
        format!("{}/pypi/{}/json", self.index_url, normalize_name(package))
    }
}

/// Converts the `releases` map into release versions
///
/// A release with no files is dropped, as is one whose version cannot be
/// read; it counts as yanked only when every file is yanked.
fn releases_from_response(response: PyPIResponse) -> Vec<ReleaseVersion> {
    let mut releases: Vec<ReleaseVersion> = response
        .releases
        .into_iter()
        .filter(|(_, files)| !files.is_empty())
        .filter_map(|(version, files)| {
            let Some(release) = ReleaseVersion::parse(&version) else {
                debug!(version, "ignoring unparseable release");
                return None;
            };
            let yanked = files.iter().all(|f| f.yanked);
            let earliest = files
                .iter()
                .filter_map(|f| f.upload_time_iso_8601.as_deref())
                .filter_map(|t| t.parse::<DateTime<Utc>>().ok())
                .min();
            let release = release.with_yanked(yanked);
            Some(match earliest {
                Some(at) => release.with_released_at(at),
                None => release,
            })
        })
        .collect();

    releases.sort();
    releases
}

#[async_trait]
impl RegistryAdapter for PyPIAdapter {
    fn registry_name(&self) -> &'static str {
        "PyPI"
    }

    async fn fetch_releases(&self, package: &str) -> Result<Vec<ReleaseVersion>, RegistryError> {
        let url = self.build_url(package);
        let response: PyPIResponse = self
            .client
            .get_json(&url, package, self.registry_name())
            .await?;
        Ok(releases_from_response(response))
    }
}
