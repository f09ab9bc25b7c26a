//! User settings for session-vault
//!
//! Holds the limits and switches the storage and backup layers consume:
//! maximum dataset size, backup compression, retention limits and the
//! automatic backup interval.

use serde::{Deserialize, Serialize};

use super::paths::VaultPaths;
use crate::error::StorageError;
use crate::storage::file_io::{read_json, write_json_atomic};

/// Dataset file settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageSettings {
    /// Files larger than this are refused on load
    #[serde(default = "default_max_file_size")]
    pub max_file_size_bytes: u64,

    /// Restrict the dataset file to owner read/write
    #[serde(default = "default_true")]
    pub secure_permissions: bool,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            max_file_size_bytes: default_max_file_size(),
            secure_permissions: true,
        }
    }
}

/// Backup and retention settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupSettings {
    /// Take a snapshot of the dataset file before every save
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Gzip each file inside a snapshot
    #[serde(default = "default_true")]
    pub compress: bool,

    /// Snapshots kept per kind
    #[serde(default = "default_max_backups")]
    pub max_backups: usize,

    /// Snapshots kept for the automatic kind (capped by `max_backups`)
    #[serde(default = "default_max_automatic_backups")]
    pub max_automatic_backups: usize,

    /// Minimum seconds between scheduled backups; 0 turns them off
    #[serde(default = "default_auto_backup_interval")]
    pub auto_backup_interval_secs: u64,
}

impl Default for BackupSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            compress: true,
            max_backups: default_max_backups(),
            max_automatic_backups: default_max_automatic_backups(),
            auto_backup_interval_secs: default_auto_backup_interval(),
        }
    }
}

/// User settings for session-vault
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Schema version for migration support
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,

    #[serde(default)]
    pub storage: StorageSettings,

    #[serde(default)]
    pub backup: BackupSettings,

    /// Append storage events to the event journal
    #[serde(default = "default_true")]
    pub event_log: bool,
}

fn default_schema_version() -> u32 {
    1
}

fn default_true() -> bool {
    true
}

fn default_max_file_size() -> u64 {
    50 * 1024 * 1024
}

fn default_max_backups() -> usize {
    10
}

fn default_max_automatic_backups() -> usize {
    5
}

fn default_auto_backup_interval() -> u64 {
    3600
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            schema_version: default_schema_version(),
            storage: StorageSettings::default(),
            backup: BackupSettings::default(),
            event_log: true,
        }
    }
}

impl Settings {
    /// Load settings from disk, or return defaults if the file doesn't exist
    pub fn load_or_create(paths: &VaultPaths) -> Result<Self, StorageError> {
        // Absent file yields defaults; nothing is written until `save`
        read_json(paths.settings_file()).map_err(|e| StorageError::Config(e.to_string()))
    }

    /// Save settings to disk
    pub fn save(&self, paths: &VaultPaths) -> Result<(), StorageError> {
        paths.ensure_directories()?;
        write_json_atomic(paths.settings_file(), self)
    }
}
