//! Manifest file reading and writing
//!
//! This module provides:
//! - ManifestWriter for committing an edited document to disk
//! - Check mode support (diff computed, file left untouched)
//! - Atomic replacement through a temporary file in the same directory

use crate::domain::EditOutcome;
use crate::error::ManifestError;
use crate::output::unified_diff;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;
use tracing::{debug, info};

/// Commits edited manifest text to its file
pub struct ManifestWriter {
    /// Whether to run in check mode (no file modifications)
    check: bool,
}

impl ManifestWriter {
    /// Create a new ManifestWriter
    pub fn new(check: bool) -> Self {
        Self { check }
    }

    /// Create a ManifestWriter in check mode
    pub fn check() -> Self {
        Self { check: true }
    }

    /// Check if this writer is in check mode
    pub fn is_check(&self) -> bool {
        self.check
    }

    /// Writes `after` when it differs from `before`
    ///
    /// In check mode nothing is written; the outcome carries a unified diff
    /// instead.
    pub fn commit(
        &self,
        path: &Path,
        before: &str,
        after: &str,
    ) -> Result<EditOutcome, ManifestError> {
        let mut outcome = EditOutcome {
            path: path.to_path_buf(),
            before: before.to_string(),
            after: after.to_string(),
            diff: None,
            written: false,
        };

        if before == after {
            debug!(path = %path.display(), "manifest unchanged");
            return Ok(outcome);
        }

        if self.check {
            outcome.diff = Some(unified_diff(&path.display().to_string(), before, after));
            info!(path = %path.display(), "check mode: changes pending");
            return Ok(outcome);
        }

        write_atomic(path, after)?;
        outcome.written = true;
        info!(path = %path.display(), "manifest written");
        Ok(outcome)
    }
}

/// Read a manifest file
pub fn read_manifest(path: &Path) -> Result<String, ManifestError> {
    if !path.exists() {
        return Err(ManifestError::not_found(path));
    }
    fs::read_to_string(path).map_err(|e| ManifestError::read_error(path, e))
}

/// Replace a file's content without ever leaving it half-written
///
/// The text goes to a temporary file next to the target, is flushed, then
/// renamed over the target.
pub fn write_atomic(path: &Path, content: &str) -> Result<(), ManifestError> {
    let temp_name = format!(
        ".{}.{}.tmp",
        path.file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default(),
        std::process::id()
    );
    let temp_path = path.with_file_name(temp_name);

    let result = (|| {
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&temp_path)?;
        file.write_all(content.as_bytes())?;
        file.sync_all()?;
        fs::rename(&temp_path, path)
    })();

    if let Err(e) = result {
        let _ = fs::remove_file(&temp_path);
        return Err(ManifestError::write_error(path, e));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn manifest(dir: &TempDir, content: &str) -> std::path::PathBuf {
        let path = dir.path().join("pyproject.toml");
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_writer_modes() {
        assert!(!ManifestWriter::new(false).is_check());
        assert!(ManifestWriter::check().is_check());
    }

    #[test]
    fn test_commit_writes_changes() {
        let dir = TempDir::new().unwrap();
        let path = manifest(&dir, "a = 1\n");

        let outcome = ManifestWriter::new(false)
            .commit(&path, "a = 1\n", "a = 2\n")
            .unwrap();

        assert!(outcome.written);
        assert!(outcome.diff.is_none());
        assert_eq!(fs::read_to_string(&path).unwrap(), "a = 2\n");
    }

    #[test]
    fn test_commit_check_mode_leaves_file() {
        let dir = TempDir::new().unwrap();
        let path = manifest(&dir, "a = 1\n");

        let outcome = ManifestWriter::check()
            .commit(&path, "a = 1\n", "a = 2\n")
            .unwrap();

        assert!(!outcome.written);
        assert!(outcome.is_pending());
        let diff = outcome.diff.unwrap();
        assert!(diff.contains("-a = 1"));
        assert!(diff.contains("+a = 2"));
        assert_eq!(fs::read_to_string(&path).unwrap(), "a = 1\n");
    }

    #[test]
    fn test_commit_unchanged_skips_write() {
        let dir = TempDir::new().unwrap();
        let path = manifest(&dir, "a = 1\n");

        let outcome = ManifestWriter::new(false)
            .commit(&path, "a = 1\n", "a = 1\n")
            .unwrap();

        assert!(!outcome.written);
        assert!(!outcome.changed());
    }

    #[test]
    fn test_write_atomic_leaves_no_temp_file() {
        let dir = TempDir::new().unwrap();
        let path = manifest(&dir, "old\n");

        write_atomic(&path, "new\n").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "new\n");
        let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_read_manifest_missing() {
        let dir = TempDir::new().unwrap();
        let err = read_manifest(&dir.path().join("pyproject.toml")).unwrap_err();
        assert!(matches!(err, ManifestError::NotFound { .. }));
    }
}
