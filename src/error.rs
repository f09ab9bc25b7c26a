//! Error types for session-vault
//!
//! Every storage failure names the file or directory it concerns and a
//! human-readable reason. The variant tells the caller what kind of failure
//! happened so it can decide whether to retry, recover, or report.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// The main error type for storage and backup operations
#[derive(Error, Debug)]
pub enum StorageError {
    /// The file could not be read, is oversized, or failed a safety check
    /// before parsing was attempted
    #[error("Failed to read {}: {reason}", .path.display())]
    Read { path: PathBuf, reason: String },

    /// The file exists but its content is untrustworthy (bad JSON, wrong
    /// structure, checksum mismatch)
    #[error("Corrupted data in {}: {reason}", .path.display())]
    Corrupted { path: PathBuf, reason: String },

    /// Any failure in the save pipeline
    #[error("Failed to write {}: {reason}", .path.display())]
    Write { path: PathBuf, reason: String },

    /// Backup-specific failures not tied to the dataset file
    #[error("Backup error at {}: {reason}", .path.display())]
    Backup { path: PathBuf, reason: String },

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),
}

impl StorageError {
    pub fn read(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Read {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn corrupted(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Corrupted {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn write(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Write {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn backup(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Backup {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// The file or directory the error concerns, if any
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Read { path, .. }
            | Self::Corrupted { path, .. }
            | Self::Write { path, .. }
            | Self::Backup { path, .. } => Some(path),
            Self::Config(_) => None,
        }
    }

    /// The reason without the path prefix
    pub fn reason(&self) -> &str {
        match self {
            Self::Read { reason, .. }
            | Self::Corrupted { reason, .. }
            | Self::Write { reason, .. }
            | Self::Backup { reason, .. } => reason,
            Self::Config(reason) => reason,
        }
    }

    pub fn is_read(&self) -> bool {
        matches!(self, Self::Read { .. })
    }

    pub fn is_corrupted(&self) -> bool {
        matches!(self, Self::Corrupted { .. })
    }

    pub fn is_write(&self) -> bool {
        matches!(self, Self::Write { .. })
    }

    pub fn is_backup(&self) -> bool {
        matches!(self, Self::Backup { .. })
    }
}

/// Result type alias for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StorageError::Config("test error".into());
        assert_eq!(err.to_string(), "Configuration error: test error");
    }

    #[test]
    fn test_read_error_display() {
        let err = StorageError::read("/tmp/sessions.json", "File too large");
        assert_eq!(
            err.to_string(),
            "Failed to read /tmp/sessions.json: File too large"
        );
        assert!(err.is_read());
        assert!(!err.is_corrupted());
    }

    #[test]
    fn test_path_and_reason() {
        let err = StorageError::corrupted("/data/backups/manual_1", "Checksum mismatch");
        assert_eq!(err.path(), Some(Path::new("/data/backups/manual_1")));
        assert_eq!(err.reason(), "Checksum mismatch");

        let err = StorageError::Config("bad".into());
        assert!(err.path().is_none());
        assert_eq!(err.reason(), "bad");
    }

    #[test]
    fn test_kind_predicates() {
        assert!(StorageError::write("a", "b").is_write());
        assert!(StorageError::backup("a", "b").is_backup());
        assert!(!StorageError::backup("a", "b").is_write());
    }
}
