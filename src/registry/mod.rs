//! Registry adapters for fetching package release information
//!
//! This module provides:
//! - HTTP client shared foundation
//! - PyPI JSON API adapter
//! - In-memory adapter for offline use
//! - Resolver choosing the latest eligible release

mod client;
mod memory;
mod pypi;
mod resolver;

pub use client::{HttpClient, DEFAULT_TIMEOUT};
pub use memory::StaticAdapter;
pub use pypi::{PyPIAdapter, DEFAULT_INDEX_URL};
pub use resolver::Resolver;

use crate::domain::ReleaseVersion;
use crate::error::RegistryError;
use async_trait::async_trait;

/// Trait for registry adapters
#[async_trait]
pub trait RegistryAdapter: Send + Sync {
    /// Get the registry name
    fn registry_name(&self) -> &'static str;

    /// Fetch every published release of a package, sorted ascending
    async fn fetch_releases(&self, package: &str) -> Result<Vec<ReleaseVersion>, RegistryError>;
}
