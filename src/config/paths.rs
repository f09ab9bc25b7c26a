//! Path management for session-vault
//!
//! ## Path Resolution Order
//!
//! 1. `SESSION_VAULT_DATA_DIR` environment variable (if set)
//! 2. The platform configuration directory (`~/.config/session-vault` on
//!    Linux, `~/Library/Application Support/session-vault` on macOS,
//!    `%APPDATA%\session-vault\config` on Windows)

use std::path::PathBuf;

use directories::ProjectDirs;

use crate::error::StorageError;

/// Environment variable that overrides the base directory
pub const DATA_DIR_ENV: &str = "SESSION_VAULT_DATA_DIR";

/// File name of the session/folder dataset
pub const SESSIONS_FILE_NAME: &str = "sessions.json";

/// Manages all paths used by session-vault
#[derive(Debug, Clone)]
pub struct VaultPaths {
    /// Base directory for all session-vault data
    base_dir: PathBuf,
}

impl VaultPaths {
    /// Create a new VaultPaths instance
    ///
    /// # Errors
    ///
    /// Returns an error if no platform configuration directory can be
    /// determined and no override is set.
    pub fn new() -> Result<Self, StorageError> {
        let base_dir = if let Ok(custom) = std::env::var(DATA_DIR_ENV) {
            PathBuf::from(custom)
        } else {
            resolve_default_path()?
        };

        Ok(Self { base_dir })
    }

    /// Create VaultPaths with a custom base directory (useful for testing)
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    pub fn base_dir(&self) -> &PathBuf {
        &self.base_dir
    }

    /// The session/folder dataset file
    pub fn sessions_file(&self) -> PathBuf {
        self.base_dir.join(SESSIONS_FILE_NAME)
    }

    /// Root of all backup snapshots and the backup index
    pub fn backup_dir(&self) -> PathBuf {
        self.base_dir.join("backups")
    }

    pub fn settings_file(&self) -> PathBuf {
        self.base_dir.join("config.json")
    }

    /// Append-only journal of storage events
    pub fn event_log(&self) -> PathBuf {
        self.base_dir.join("events.log")
    }

    /// Ensure the base and backup directories exist
    pub fn ensure_directories(&self) -> Result<(), StorageError> {
        crate::platform::ensure_private_dir(&self.base_dir)?;
        crate::platform::ensure_private_dir(&self.backup_dir())?;
        Ok(())
    }
}

fn resolve_default_path() -> Result<PathBuf, StorageError> {
    ProjectDirs::from("", "", "session-vault")
        .map(|dirs| dirs.config_dir().to_path_buf())
        .ok_or_else(|| {
            StorageError::Config("Could not determine a configuration directory".into())
        })
}
