//! Backup system for session-vault
//!
//! Snapshots arbitrary files into per-backup directories, tracks them in a
//! durable index and enforces per-kind retention.
//!
//! # Layout
//!
//! ```text
//! backups/
//!   backup_index.json                  id -> metadata
//!   manual_20240101_120000_123/
//!     sessions.json.gz                 compressed copy
//!     backup_metadata.json             metadata copy
//! ```
//!
//! # Retention Policy
//!
//! Each kind keeps its newest `max_backups` snapshots (10 by default).
//! Automatic snapshots are capped lower, at `min(5, max_backups)`.
//! Retention runs in the background after every successful create.
//!
//! # Example
//!
//! ```rust,ignore
//! use session_vault::backup::{BackupConfig, BackupKind, BackupManager};
//!
//! let manager = BackupManager::new("/tmp/backups", BackupConfig::default())?;
//! let id = manager.create_backup(&[path], BackupKind::Manual, "before upgrade")?;
//! assert!(manager.verify_backup(&id));
//! manager.restore_backup(&id, target_dir, true)?;
//! ```

mod archive;
mod checksum;
mod index;
mod manager;
mod metadata;
mod restore;
mod scheduler;

pub use archive::{compress_file, decompress_file, pack_directory, unpack_archive, GZIP_SUFFIX};
pub use checksum::{aggregate_checksum, file_checksum};
pub use index::{BackupIndex, INDEX_FILE_NAME};
pub use manager::{BackupConfig, BackupManager};
pub use metadata::{BackupKind, BackupMetadata, BackupStatus, METADATA_FILE_NAME, TOOL_VERSION};
pub use scheduler::AutoBackupScheduler;
