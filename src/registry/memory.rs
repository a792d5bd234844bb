//! In-memory registry
//!
//! Serves a fixed set of releases per package. Used by tests and anywhere a
//! lookup must not touch the network.

use crate::domain::{normalize_name, ReleaseVersion};
use crate::error::RegistryError;
use crate::registry::RegistryAdapter;
use async_trait::async_trait;
use std::collections::HashMap;

/// Registry backed by a fixed map of releases
#[derive(Debug, Default, Clone)]
pub struct StaticAdapter {
    packages: HashMap<String, Vec<ReleaseVersion>>,
    failures: HashMap<String, RegistryError>,
}

impl StaticAdapter {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a package with the given version strings (builder pattern)
    ///
    /// Strings that are not release versions are ignored.
    pub fn with_package<I, S>(mut self, name: &str, versions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let releases = versions
            .into_iter()
            .filter_map(|v| ReleaseVersion::parse(v.as_ref()))
            .collect();
        self.insert(name, releases);
        self
    }

    /// Adds a package with prepared releases (builder pattern)
    pub fn with_releases(mut self, name: &str, releases: Vec<ReleaseVersion>) -> Self {
        self.insert(name, releases);
        self
    }

    /// Makes lookups of a package fail with `error` (builder pattern)
    pub fn with_failure(mut self, name: &str, error: RegistryError) -> Self {
        self.failures.insert(normalize_name(name), error);
        self
    }

    fn insert(&mut self, name: &str, mut releases: Vec<ReleaseVersion>) {
        releases.sort();
        self.packages.insert(normalize_name(name), releases);
    }
}

#[async_trait]
impl RegistryAdapter for StaticAdapter {
    fn registry_name(&self) -> &'static str {
        "static"
    }

    async fn fetch_releases(&self, package: &str) -> Result<Vec<ReleaseVersion>, RegistryError> {
        let key = normalize_name(package);
        if let Some(error) = self.failures.get(&key) {
            return Err(error.clone());
        }
        self.packages
            .get(&key)
            .cloned()
            .ok_or_else(|| RegistryError::package_not_found(package, self.registry_name()))
    }
}
