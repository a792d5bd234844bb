//! Application error types using thiserror
//!
//! Error hierarchy:
//! - ManifestError: Issues with reading, parsing and editing pyproject.toml
//! - ConstraintError: Invalid version constraints, python ranges or names
//! - VersionError: Problems with the project's own version
//! - RegistryError: Issues with package registry communication
//! - ConfigError: Invalid `[tool.pydepup]` settings or CLI combinations
//! - ScanError: Source tree scanning failures

use std::path::PathBuf;
use thiserror::Error;

/// Application-level error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Manifest file related errors
    #[error(transparent)]
    Manifest(#[from] ManifestError),

    /// Version constraint related errors
    #[error(transparent)]
    Constraint(#[from] ConstraintError),

    /// Project version related errors
    #[error(transparent)]
    Version(#[from] VersionError),

    /// Package registry related errors
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Configuration related errors
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Source scanning errors
    #[error(transparent)]
    Scan(#[from] ScanError),
}

/// Errors related to manifest file operations
#[derive(Error, Debug)]
pub enum ManifestError {
    /// Manifest file not found
    #[error("manifest file not found: {path}")]
    NotFound { path: PathBuf },

    /// Failed to read manifest file
    #[error("failed to read manifest file {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to write manifest file
    #[error("failed to write manifest file {path}: {source}")]
    WriteError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Malformed TOML
    #[error("failed to parse TOML: {message}")]
    ParseError { message: String },

    /// Neither or conflicting dependency tables
    #[error("unsupported manifest layout: {message}")]
    SchemaError { message: String },

    /// A table or value has an unexpected shape
    #[error("unexpected structure at '{key}': {message}")]
    InvalidStructure { key: String, message: String },

    /// The entry is not a registry dependency and cannot be edited
    #[error("dependency '{name}' is a {kind} dependency and cannot be edited")]
    NonRegistry { name: String, kind: String },

    /// The edited document no longer parses
    #[error("edited manifest failed to re-parse: {message}")]
    RenderError { message: String },
}

/// Errors related to version constraints
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConstraintError {
    /// Constraint text not understood by the target dialect
    #[error("invalid version constraint '{constraint}': {message}")]
    InvalidConstraint { constraint: String, message: String },

    /// Python interpreter range not understood
    #[error("invalid python range '{range}'")]
    InvalidPythonRange { range: String },

    /// Package name is not a valid distribution name
    #[error("invalid package name '{name}'")]
    InvalidPackageName { name: String },
}

/// Errors related to the project's own version
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VersionError {
    /// No version key in the manifest
    #[error("no project version found in manifest")]
    Missing,

    /// Version is not MAJOR.MINOR.PATCH
    #[error("unsupported project version '{version}': expected MAJOR.MINOR.PATCH")]
    Malformed { version: String },

    /// Bump level not one of major, minor, patch
    #[error("invalid bump level '{level}': expected 'major', 'minor' or 'patch'")]
    InvalidLevel { level: String },
}

/// Errors related to package registry communication
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// Package not found in registry
    #[error("package '{package}' not found in {registry} registry")]
    PackageNotFound { package: String, registry: String },

    /// Network request failed
    #[error("failed to fetch package '{package}' from {registry}: {message}")]
    NetworkError {
        package: String,
        registry: String,
        message: String,
    },

    /// Rate limit exceeded
    #[error("rate limit exceeded for {registry} registry")]
    RateLimitExceeded { registry: String },

    /// Invalid response from registry
    #[error("invalid response from {registry} for '{package}': {message}")]
    InvalidResponse {
        package: String,
        registry: String,
        message: String,
    },

    /// Timeout
    #[error("timeout while fetching '{package}' from {registry}")]
    Timeout { package: String, registry: String },

    /// Every release was filtered out
    #[error("no eligible release for '{package}'")]
    NoEligibleRelease { package: String },
}

/// Errors related to configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    /// `[tool.pydepup]` could not be deserialized
    #[error("invalid [tool.pydepup] settings: {message}")]
    InvalidSettings { message: String },

    /// Unknown strategy name
    #[error("invalid strategy '{value}': expected 'exact', 'caret', 'tilde' or 'floor'")]
    InvalidStrategy { value: String },

    /// Unknown fail-on mode
    #[error("invalid fail-on mode '{value}': expected 'missing', 'unused', 'both' or 'none'")]
    InvalidFailOn { value: String },

    /// Conflicting options
    #[error("conflicting options: {message}")]
    ConflictingOptions { message: String },
}

/// Errors related to scanning the source tree
#[derive(Error, Debug)]
pub enum ScanError {
    /// Project root does not exist
    #[error("directory not found: {path}")]
    DirectoryNotFound { path: PathBuf },

    /// Walking the tree failed
    #[error("failed to scan {path}: {message}")]
    Walk { path: PathBuf, message: String },
}

impl ManifestError {
    /// Creates a new NotFound error
    pub fn not_found(path: impl Into<PathBuf>) -> Self {
        ManifestError::NotFound { path: path.into() }
    }

    /// Creates a new ReadError
    pub fn read_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ManifestError::ReadError {
            path: path.into(),
            source,
        }
    }

    /// Creates a new WriteError
    pub fn write_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ManifestError::WriteError {
            path: path.into(),
            source,
        }
    }

    /// Creates a new ParseError
    pub fn parse_error(message: impl Into<String>) -> Self {
        ManifestError::ParseError {
            message: message.into(),
        }
    }

    /// Creates a new SchemaError
    pub fn schema_error(message: impl Into<String>) -> Self {
        ManifestError::SchemaError {
            message: message.into(),
        }
    }

    /// Creates a new InvalidStructure error
    pub fn invalid_structure(key: impl Into<String>, message: impl Into<String>) -> Self {
        ManifestError::InvalidStructure {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Creates a new NonRegistry error
    pub fn non_registry(name: impl Into<String>, kind: impl Into<String>) -> Self {
        ManifestError::NonRegistry {
            name: name.into(),
            kind: kind.into(),
        }
    }

    /// Creates a new RenderError
    pub fn render_error(message: impl Into<String>) -> Self {
        ManifestError::RenderError {
            message: message.into(),
        }
    }
}

impl ConstraintError {
    /// Creates a new InvalidConstraint error
    pub fn invalid(constraint: impl Into<String>, message: impl Into<String>) -> Self {
        ConstraintError::InvalidConstraint {
            constraint: constraint.into(),
            message: message.into(),
        }
    }
}

impl RegistryError {
    /// Creates a new PackageNotFound error
    pub fn package_not_found(package: impl Into<String>, registry: impl Into<String>) -> Self {
        RegistryError::PackageNotFound {
            package: package.into(),
            registry: registry.into(),
        }
    }

    /// Creates a new NetworkError
    pub fn network_error(
        package: impl Into<String>,
        registry: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        RegistryError::NetworkError {
            package: package.into(),
            registry: registry.into(),
            message: message.into(),
        }
    }

    /// Creates a new RateLimitExceeded error
    pub fn rate_limit_exceeded(registry: impl Into<String>) -> Self {
        RegistryError::RateLimitExceeded {
            registry: registry.into(),
        }
    }

    /// Creates a new Timeout error
    pub fn timeout(package: impl Into<String>, registry: impl Into<String>) -> Self {
        RegistryError::Timeout {
            package: package.into(),
            registry: registry.into(),
        }
    }

    /// Creates a new NoEligibleRelease error
    pub fn no_eligible_release(package: impl Into<String>) -> Self {
        RegistryError::NoEligibleRelease {
            package: package.into(),
        }
    }
}
