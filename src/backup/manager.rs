//! Backup manager for session-vault
//!
//! Creates snapshot directories of arbitrary files, keeps the backup index in
//! step with them, applies per-kind retention and moves snapshots in and out
//! of portable zip archives.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use chrono::Utc;
use tracing::{debug, error, info, warn};

use super::archive::{self, GZIP_SUFFIX};
use super::checksum::{aggregate_checksum, file_checksum};
use super::index::{BackupIndex, INDEX_FILE_NAME};
use super::metadata::{BackupKind, BackupMetadata, METADATA_FILE_NAME};
use crate::config::settings::BackupSettings;
use crate::error::{StorageError, StorageResult};
use crate::platform;
use crate::storage::file_io::{read_json_required, write_json_atomic};

/// Snapshot behaviour and retention limits
#[derive(Debug, Clone)]
pub struct BackupConfig {
    /// Gzip each file inside a snapshot
    pub compress: bool,
    /// Snapshots kept per kind
    pub max_backups: usize,
    /// Snapshots kept for the automatic kind, capped by `max_backups`
    pub max_automatic_backups: usize,
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            compress: true,
            max_backups: 10,
            max_automatic_backups: 5,
        }
    }
}

impl From<&BackupSettings> for BackupConfig {
    fn from(settings: &BackupSettings) -> Self {
        Self {
            compress: settings.compress,
            max_backups: settings.max_backups,
            max_automatic_backups: settings.max_automatic_backups,
        }
    }
}

impl BackupConfig {
    /// How many snapshots of `kind` survive a retention pass
    pub fn retention_limit(&self, kind: BackupKind) -> usize {
        match kind {
            BackupKind::Automatic => self.max_automatic_backups.min(self.max_backups),
            _ => self.max_backups,
        }
    }
}

struct Inner {
    backup_dir: PathBuf,
    config: BackupConfig,
    /// Guards index mutation and persistence
    index: Mutex<BackupIndex>,
    /// Serialises whole create/restore/delete sequences
    operation: Mutex<()>,
    /// Background work not yet joined
    workers: Mutex<Vec<JoinHandle<()>>>,
}

/// Manages snapshot creation, retention and portability
///
/// Cloning is cheap; clones share the same index and locks.
#[derive(Clone)]
pub struct BackupManager {
    inner: Arc<Inner>,
}

impl BackupManager {
    /// Open (or create) the backup root at `backup_dir`
    pub fn new(backup_dir: impl Into<PathBuf>, config: BackupConfig) -> StorageResult<Self> {
        let backup_dir = backup_dir.into();
        platform::ensure_private_dir(&backup_dir)
            .map_err(|e| StorageError::backup(&backup_dir, e.reason()))?;

        let index = BackupIndex::load(backup_dir.join(INDEX_FILE_NAME));
        info!(
            backup_dir = %backup_dir.display(),
            backups = index.len(),
            "Backup manager initialized"
        );

        Ok(Self {
            inner: Arc::new(Inner {
                backup_dir,
                config,
                index: Mutex::new(index),
                operation: Mutex::new(()),
                workers: Mutex::new(Vec::new()),
            }),
        })
    }

    pub fn backup_dir(&self) -> &Path {
        &self.inner.backup_dir
    }

    pub fn config(&self) -> &BackupConfig {
        &self.inner.config
    }

    /// Directory holding the snapshot `backup_id`
    pub fn snapshot_dir(&self, backup_id: &str) -> PathBuf {
        self.inner.backup_dir.join(backup_id)
    }

    pub(super) fn index(&self) -> MutexGuard<'_, BackupIndex> {
        self.inner.index.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(super) fn operation_lock(&self) -> MutexGuard<'_, ()> {
        self.inner.operation.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Snapshot `source_files` into a new backup
    ///
    /// Missing sources are skipped. Fails if nothing could be copied; any
    /// other failure is recorded in the index as a failed backup before the
    /// error is returned. Retention cleanup runs afterwards in the background.
    pub fn create_backup(
        &self,
        source_files: &[PathBuf],
        kind: BackupKind,
        description: &str,
    ) -> StorageResult<String> {
        let backup_id = {
            let _guard = self.operation_lock();
            let backup_id = generate_backup_id(kind);
            let backup_path = self.snapshot_dir(&backup_id);

            match self.write_snapshot(&backup_path, source_files, kind, description) {
                Ok(Some(metadata)) => {
                    if let Err(e) = self.register(&backup_id, metadata) {
                        return Err(self.record_failure(&backup_id, kind, description, e));
                    }
                }
                Ok(None) => {
                    let _ = fs::remove_dir_all(&backup_path);
                    return Err(StorageError::backup(
                        &backup_path,
                        "No files were successfully backed up",
                    ));
                }
                Err(e) => return Err(self.record_failure(&backup_id, kind, description, e)),
            }

            info!(%backup_id, %kind, "Backup created");
            backup_id
        };

        self.schedule_cleanup();
        Ok(backup_id)
    }

    /// Run `create_backup` on a background thread
    ///
    /// Completion is observable through `list_backups`; errors are logged.
    pub fn create_backup_async(&self, source_files: Vec<PathBuf>, kind: BackupKind, description: String) {
        let manager = self.clone();
        self.spawn(move || {
            if let Err(e) = manager.create_backup(&source_files, kind, &description) {
                error!(error = %e, "Async backup task failed");
            }
        });
    }

    fn write_snapshot(
        &self,
        backup_path: &Path,
        source_files: &[PathBuf],
        kind: BackupKind,
        description: &str,
    ) -> StorageResult<Option<BackupMetadata>> {
        // Same-millisecond ids overwrite the earlier snapshot
        if backup_path.exists() {
            fs::remove_dir_all(backup_path).map_err(|e| {
                StorageError::backup(backup_path, format!("Failed to replace snapshot: {}", e))
            })?;
        }
        fs::create_dir_all(backup_path).map_err(|e| {
            StorageError::backup(backup_path, format!("Failed to create snapshot directory: {}", e))
        })?;

        let compress = self.inner.config.compress;
        let mut stored_names = HashSet::new();
        let mut checksums = Vec::new();
        let mut total_size = 0u64;

        for source in source_files {
            if !source.is_file() {
                warn!(source = %source.display(), "Source file not found, skipping");
                continue;
            }
            let Some(file_name) = source.file_name().map(|n| n.to_string_lossy().to_string())
            else {
                warn!(source = %source.display(), "Source has no file name, skipping");
                continue;
            };
            // Snapshot entries are flat, so the first source with a name wins
            if !stored_names.insert(file_name.clone()) {
                warn!(
                    source = %source.display(),
                    %file_name,
                    "Duplicate file name in snapshot, skipping"
                );
                continue;
            }

            let result = if compress {
                let target = backup_path.join(format!("{}{}", file_name, GZIP_SUFFIX));
                archive::compress_file(source, &target).map(|size| (target, size))
            } else {
                let target = backup_path.join(&file_name);
                archive::copy_file(source, &target).map(|size| (target, size))
            };

            match result {
                Ok((target, size)) => {
                    let checksum = file_checksum(&target).map_err(|e| {
                        StorageError::backup(&target, format!("Failed to checksum: {}", e))
                    })?;
                    debug!(source = %source.display(), size, "File added to snapshot");
                    checksums.push(checksum);
                    total_size += size;
                }
                Err(e) => {
                    error!(source = %source.display(), error = %e, "Failed to back up file");
                }
            }
        }

        if checksums.is_empty() {
            return Ok(None);
        }

        let metadata = BackupMetadata::success(
            kind,
            checksums.len(),
            total_size,
            aggregate_checksum(&checksums),
            description,
        );
        write_json_atomic(backup_path.join(METADATA_FILE_NAME), &metadata)
            .map_err(|e| StorageError::backup(backup_path, e.reason()))?;

        Ok(Some(metadata))
    }

    fn register(&self, backup_id: &str, metadata: BackupMetadata) -> StorageResult<()> {
        let mut index = self.index();
        index.insert(backup_id, metadata);
        index.save()
    }

    /// Remove a partial snapshot and keep the failed attempt visible in the index
    fn record_failure(
        &self,
        backup_id: &str,
        kind: BackupKind,
        description: &str,
        cause: StorageError,
    ) -> StorageError {
        let backup_path = self.snapshot_dir(backup_id);
        if backup_path.exists() {
            let _ = fs::remove_dir_all(&backup_path);
        }
        error!(%backup_id, error = %cause, "Failed to create backup");

        let mut index = self.index();
        index.insert(backup_id, BackupMetadata::failed(kind, description, cause.to_string()));
        if let Err(e) = index.save() {
            error!(%backup_id, error = %e, "Failed to record failed backup");
        }

        cause
    }

    /// Backups newest first, optionally restricted to one kind
    pub fn list_backups(&self, kind: Option<BackupKind>) -> Vec<(String, BackupMetadata)> {
        self.index().sorted(kind)
    }

    pub fn get_backup(&self, backup_id: &str) -> Option<BackupMetadata> {
        self.index().get(backup_id).cloned()
    }

    /// Whether `backup_id` is indexed as successful and its directory exists
    pub fn is_available(&self, backup_id: &str) -> bool {
        self.get_backup(backup_id)
            .map_or(false, |meta| meta.is_success() && self.snapshot_dir(backup_id).is_dir())
    }

    /// Remove a snapshot and its index entry; unknown ids return false
    pub fn delete_backup(&self, backup_id: &str) -> bool {
        let _guard = self.operation_lock();
        self.delete_unlocked(backup_id)
    }

    fn delete_unlocked(&self, backup_id: &str) -> bool {
        if !self.index().contains(backup_id) {
            return false;
        }

        let backup_path = self.snapshot_dir(backup_id);
        if backup_path.exists() {
            if let Err(e) = fs::remove_dir_all(&backup_path) {
                error!(%backup_id, error = %e, "Failed to delete backup");
                return false;
            }
        }

        let mut index = self.index();
        index.remove(backup_id);
        if let Err(e) = index.save() {
            error!(%backup_id, error = %e, "Failed to persist index after delete");
            return false;
        }

        info!(%backup_id, "Backup deleted");
        true
    }

    /// Apply per-kind retention, deleting the oldest excess snapshots
    ///
    /// Returns the ids that were removed. Safe to run concurrently with
    /// itself; a second pass finds nothing left to delete.
    pub fn cleanup_retention(&self) -> Vec<String> {
        let _guard = self.operation_lock();
        let groups = self.index().grouped_by_kind();

        let mut deleted = Vec::new();
        for (kind, entries) in groups {
            let limit = self.inner.config.retention_limit(kind);
            for (backup_id, _) in entries.into_iter().skip(limit) {
                info!(%backup_id, %kind, "Cleaning up old backup");
                if self.delete_unlocked(&backup_id) {
                    deleted.push(backup_id);
                }
            }
        }
        deleted
    }

    fn schedule_cleanup(&self) {
        let manager = self.clone();
        self.spawn(move || {
            manager.cleanup_retention();
        });
    }

    fn spawn<F>(&self, task: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let handle = thread::spawn(task);
        let finished = {
            let mut workers = self.inner.workers.lock().unwrap_or_else(PoisonError::into_inner);
            let (finished, running): (Vec<_>, Vec<_>) =
                workers.drain(..).partition(|worker| worker.is_finished());
            *workers = running;
            workers.push(handle);
            finished
        };

        for worker in finished {
            if worker.join().is_err() {
                error!("Background backup task panicked");
            }
        }
    }

    /// Block until all background backups and cleanups have finished
    pub fn wait_idle(&self) {
        loop {
            let pending: Vec<_> = self
                .inner
                .workers
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .drain(..)
                .collect();
            if pending.is_empty() {
                return;
            }
            for handle in pending {
                if handle.join().is_err() {
                    error!("Background backup task panicked");
                }
            }
        }
    }

    /// Pack a snapshot into a single zip archive at `dest_path`
    pub fn export_backup(&self, backup_id: &str, dest_path: &Path) -> StorageResult<usize> {
        let _guard = self.operation_lock();
        let backup_path = self.snapshot_dir(backup_id);

        if !self.index().contains(backup_id) || !backup_path.is_dir() {
            return Err(StorageError::backup(&backup_path, "Backup not found"));
        }

        let packed = archive::pack_directory(&backup_path, dest_path).map_err(|e| {
            StorageError::backup(dest_path, format!("Failed to export backup: {}", e))
        })?;

        info!(%backup_id, dest = %dest_path.display(), files = packed, "Backup exported");
        Ok(packed)
    }

    /// Unpack an exported archive as a new manual backup
    ///
    /// The imported backup is dated at import time; the original snapshot
    /// time moves into its description. Archives without a metadata file get
    /// one computed from their content.
    pub fn import_backup(&self, archive_path: &Path, description: &str) -> StorageResult<String> {
        let backup_id = {
            let _guard = self.operation_lock();

            if !archive_path.is_file() {
                return Err(StorageError::backup(archive_path, "Archive not found"));
            }

            let backup_id = generate_backup_id(BackupKind::Manual);
            let backup_path = self.snapshot_dir(&backup_id);
            if backup_path.exists() {
                let _ = fs::remove_dir_all(&backup_path);
            }

            if let Err(e) = self.unpack_import(archive_path, &backup_path, description, &backup_id) {
                let _ = fs::remove_dir_all(&backup_path);
                return Err(e);
            }

            info!(%backup_id, archive = %archive_path.display(), "Backup imported");
            backup_id
        };

        self.schedule_cleanup();
        Ok(backup_id)
    }

    fn unpack_import(
        &self,
        archive_path: &Path,
        backup_path: &Path,
        description: &str,
        backup_id: &str,
    ) -> StorageResult<()> {
        let extracted = archive::unpack_archive(archive_path, backup_path).map_err(|e| {
            StorageError::backup(archive_path, format!("Failed to unpack archive: {}", e))
        })?;

        if !extracted.iter().any(|name| name != METADATA_FILE_NAME) {
            return Err(StorageError::backup(
                archive_path,
                "Archive contains no backup files",
            ));
        }

        let metadata_path = backup_path.join(METADATA_FILE_NAME);
        let metadata = match read_json_required::<BackupMetadata, _>(&metadata_path) {
            Ok(mut metadata) => {
                // Imports are dated now so retention ranks them as the newest manual backup
                let taken = metadata.timestamp.format("%Y-%m-%d %H:%M:%S UTC");
                metadata.timestamp = Utc::now();
                metadata.kind = BackupKind::Manual;
                metadata.description = if !description.is_empty() {
                    description.to_string()
                } else if metadata.description.is_empty() {
                    format!("Imported backup taken {}", taken)
                } else {
                    format!("{} (imported, taken {})", metadata.description, taken)
                };
                metadata
            }
            Err(e) => {
                if metadata_path.exists() {
                    warn!(error = %e, "Archive metadata unreadable, rebuilding it");
                    let _ = fs::remove_file(&metadata_path);
                }
                let digest = snapshot_digest(backup_path).map_err(|e| {
                    StorageError::backup(backup_path, format!("Failed to checksum import: {}", e))
                })?;
                let description = if description.is_empty() {
                    "Imported backup"
                } else {
                    description
                };
                BackupMetadata::success(
                    BackupKind::Manual,
                    digest.file_count,
                    digest.total_size,
                    digest.checksum,
                    description,
                )
            }
        };

        write_json_atomic(&metadata_path, &metadata)
            .map_err(|e| StorageError::backup(backup_path, e.reason()))?;
        self.register(backup_id, metadata)
    }
}

/// File count, size and aggregate checksum of a snapshot directory
pub(super) struct SnapshotDigest {
    pub file_count: usize,
    pub total_size: u64,
    pub checksum: String,
}

/// Every regular file in the snapshot except its metadata copy, sorted
pub(super) fn snapshot_files(backup_path: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(backup_path)? {
        let path = entry?.path();
        let is_metadata = path
            .file_name()
            .map_or(false, |name| name == METADATA_FILE_NAME);
        if path.is_file() && !is_metadata {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

pub(super) fn snapshot_digest(backup_path: &Path) -> std::io::Result<SnapshotDigest> {
    let files = snapshot_files(backup_path)?;
    let mut checksums = Vec::with_capacity(files.len());
    let mut total_size = 0u64;
    for file in &files {
        checksums.push(file_checksum(file)?);
        total_size += fs::metadata(file)?.len();
    }

    Ok(SnapshotDigest {
        file_count: files.len(),
        total_size,
        checksum: aggregate_checksum(&checksums),
    })
}

/// `<kind>_<UTC timestamp with milliseconds>`
fn generate_backup_id(kind: BackupKind) -> String {
    format!("{}_{}", kind, Utc::now().format("%Y%m%d_%H%M%S_%3f"))
}
