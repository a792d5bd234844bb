//! Latest-release resolution
//!
//! Wraps a registry adapter and applies the upgrade policy's release
//! filters: yanked releases never qualify, pre-releases only when allowed.

use crate::domain::{DependencySpec, ReleaseVersion, UpgradePolicy};
use crate::error::RegistryError;
use crate::registry::RegistryAdapter;
use tracing::debug;

/// Resolves packages against one registry
pub struct Resolver {
    adapter: Box<dyn RegistryAdapter>,
}

impl Resolver {
    /// Create a resolver over an adapter
    pub fn new(adapter: impl RegistryAdapter + 'static) -> Self {
        Self {
            adapter: Box::new(adapter),
        }
    }

    /// Create a resolver over a boxed adapter
    pub fn from_boxed(adapter: Box<dyn RegistryAdapter>) -> Self {
        Self { adapter }
    }

    /// Name of the underlying registry
    pub fn registry_name(&self) -> &'static str {
        self.adapter.registry_name()
    }

    /// Lists every release of a package
    pub async fn list_releases(&self, name: &str) -> Result<Vec<ReleaseVersion>, RegistryError> {
        self.adapter.fetch_releases(name).await
    }

    /// Returns the highest release the policy accepts
    pub async fn latest(
        &self,
        name: &str,
        policy: &UpgradePolicy,
    ) -> Result<ReleaseVersion, RegistryError> {
        let releases = self.list_releases(name).await?;
        let total = releases.len();
        let latest = releases
            .into_iter()
            .filter(|r| !r.yanked)
            .filter(|r| policy.allow_prerelease || !r.is_prerelease())
            .max()
            .ok_or_else(|| RegistryError::no_eligible_release(name))?;
        debug!(package = name, latest = %latest, candidates = total, "resolved");
        Ok(latest)
    }

    /// Resolves a declared dependency; `None` when it does not come from the registry
    pub async fn resolve(
        &self,
        spec: &DependencySpec,
        policy: &UpgradePolicy,
    ) -> Result<Option<ReleaseVersion>, RegistryError> {
        if !spec.is_registry() {
            return Ok(None);
        }
        self.latest(&spec.name, policy).await.map(Some)
    }
}
