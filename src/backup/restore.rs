//! Snapshot verification and restoration
//!
//! Restored files are staged beside their destination and renamed into place,
//! so an interrupted restore leaves the previous file intact.

use std::fs;
use std::path::Path;

use tracing::{error, info, warn};

use super::archive::{self, GZIP_SUFFIX};
use super::manager::{snapshot_digest, snapshot_files, BackupManager};
use crate::error::{StorageError, StorageResult};
use crate::models::Dataset;
use crate::platform;
use crate::storage::file_io::temp_path_for;

impl BackupManager {
    /// Recompute a snapshot's checksum and compare it with the index
    ///
    /// Unknown ids, missing directories and unreadable files all report false.
    pub fn verify_backup(&self, backup_id: &str) -> bool {
        let Some(metadata) = self.get_backup(backup_id) else {
            warn!(%backup_id, "Backup not found in index");
            return false;
        };

        let backup_path = self.snapshot_dir(backup_id);
        if !backup_path.is_dir() {
            warn!(%backup_id, "Backup directory missing");
            return false;
        }

        let digest = match snapshot_digest(&backup_path) {
            Ok(digest) => digest,
            Err(e) => {
                error!(%backup_id, error = %e, "Failed to checksum backup");
                return false;
            }
        };

        if digest.file_count != metadata.file_count {
            warn!(
                %backup_id,
                expected = metadata.file_count,
                found = digest.file_count,
                "Backup file count mismatch"
            );
            return false;
        }

        if digest.checksum != metadata.checksum {
            warn!(%backup_id, "Backup checksum mismatch");
            return false;
        }

        true
    }

    /// Restore the files of `backup_id` into `target_dir`
    ///
    /// Compressed files are decompressed and lose their `.gz` suffix. Returns
    /// the number of files restored; individual file failures are logged and
    /// skipped, but restoring nothing at all is an error.
    pub fn restore_backup(
        &self,
        backup_id: &str,
        target_dir: &Path,
        verify_first: bool,
    ) -> StorageResult<usize> {
        let _guard = self.operation_lock();
        let backup_path = self.snapshot_dir(backup_id);

        if self.get_backup(backup_id).is_none() {
            return Err(StorageError::backup(&backup_path, "Backup not found"));
        }
        if !backup_path.is_dir() {
            return Err(StorageError::backup(&backup_path, "Backup directory missing"));
        }
        if verify_first && !self.verify_backup(backup_id) {
            return Err(StorageError::corrupted(
                &backup_path,
                "Backup integrity check failed",
            ));
        }

        fs::create_dir_all(target_dir).map_err(|e| {
            StorageError::backup(target_dir, format!("Failed to create target directory: {}", e))
        })?;

        let files = snapshot_files(&backup_path).map_err(|e| {
            StorageError::backup(&backup_path, format!("Failed to list backup: {}", e))
        })?;

        let mut restored = 0;
        for file in files {
            match restore_file(&file, target_dir) {
                Ok(()) => restored += 1,
                Err(e) => error!(file = %file.display(), error = %e, "Failed to restore file"),
            }
        }

        if restored == 0 {
            return Err(StorageError::backup(
                &backup_path,
                "No files were successfully restored",
            ));
        }

        info!(%backup_id, files = restored, target = %target_dir.display(), "Backup restored");
        Ok(restored)
    }

    /// Restore the newest successful snapshot and parse `file_name` from it
    ///
    /// Returns `None` when no usable snapshot exists or the restored file
    /// cannot be parsed.
    pub fn restore_latest_into(&self, target_dir: &Path, file_name: &str) -> Option<Dataset> {
        let backup_id = self
            .list_backups(None)
            .into_iter()
            .map(|(id, _)| id)
            .find(|id| self.is_available(id))?;

        if let Err(e) = self.restore_backup(&backup_id, target_dir, true) {
            error!(%backup_id, error = %e, "Failed to restore latest backup");
            return None;
        }

        let restored = target_dir.join(file_name);
        let bytes = match fs::read(&restored) {
            Ok(bytes) => bytes,
            Err(e) => {
                error!(file = %restored.display(), error = %e, "Restored file unreadable");
                return None;
            }
        };

        match Dataset::parse(&bytes) {
            Ok((dataset, warnings)) => {
                for warning in warnings {
                    warn!(%backup_id, "{}", warning);
                }
                Some(dataset)
            }
            Err(e) => {
                error!(%backup_id, error = %e, "Restored file is not a valid dataset");
                None
            }
        }
    }
}

fn restore_file(file: &Path, target_dir: &Path) -> std::io::Result<()> {
    let name = file
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    let (target_name, compressed) = match name.strip_suffix(GZIP_SUFFIX) {
        Some(stem) => (stem.to_string(), true),
        None => (name, false),
    };
    let target = target_dir.join(target_name);
    let staged = temp_path_for(&target);

    let result = if compressed {
        archive::decompress_file(file, &staged)
    } else {
        archive::copy_file(file, &staged)
    };

    if let Err(e) = result.and_then(|_| platform::replace_file(&staged, &target)) {
        let _ = fs::remove_file(&staged);
        return Err(e);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::super::manager::BackupConfig;
    use super::super::metadata::BackupKind;
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    const DATA: &str = r#"{"sessions": [{"name": "web"}], "folders": []}"#;

    fn setup(compress: bool) -> (BackupManager, TempDir, PathBuf) {
        let temp_dir = TempDir::new().unwrap();
        let config = BackupConfig {
            compress,
            ..BackupConfig::default()
        };
        let manager = BackupManager::new(temp_dir.path().join("backups"), config).unwrap();
        let source = temp_dir.path().join("sessions.json");
        fs::write(&source, DATA).unwrap();
        (manager, temp_dir, source)
    }

    #[test]
    fn test_verify_fresh_backup() {
        let (manager, _temp, source) = setup(true);
        let backup_id = manager
            .create_backup(&[source], BackupKind::Manual, "")
            .unwrap();
        manager.wait_idle();

        assert!(manager.verify_backup(&backup_id));
        assert!(!manager.verify_backup("manual_unknown"));
    }

    #[test]
    fn test_tampered_backup_fails_verification_and_restore() {
        let (manager, temp, source) = setup(true);
        let backup_id = manager
            .create_backup(&[source], BackupKind::Manual, "")
            .unwrap();
        manager.wait_idle();

        let stored = manager.snapshot_dir(&backup_id).join("sessions.json.gz");
        let mut bytes = fs::read(&stored).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xff;
        fs::write(&stored, bytes).unwrap();

        assert!(!manager.verify_backup(&backup_id));

        let err = manager
            .restore_backup(&backup_id, &temp.path().join("out"), true)
            .unwrap_err();
        assert!(err.is_corrupted());
    }

    #[test]
    fn test_extra_file_fails_verification() {
        let (manager, _temp, source) = setup(false);
        let backup_id = manager
            .create_backup(&[source], BackupKind::Manual, "")
            .unwrap();
        manager.wait_idle();

        fs::write(manager.snapshot_dir(&backup_id).join("stray.txt"), "x").unwrap();
        assert!(!manager.verify_backup(&backup_id));
    }

    #[test]
    fn test_restore_decompresses() {
        let (manager, temp, source) = setup(true);
        let backup_id = manager
            .create_backup(&[source], BackupKind::Manual, "")
            .unwrap();
        manager.wait_idle();

        let target = temp.path().join("restored");
        assert_eq!(manager.restore_backup(&backup_id, &target, true).unwrap(), 1);
        assert_eq!(fs::read_to_string(target.join("sessions.json")).unwrap(), DATA);
        assert!(!target.join("backup_metadata.json").exists());
        assert!(!target.join("sessions.json.tmp").exists());
    }

    #[test]
    fn test_restore_uncompressed_overwrites() {
        let (manager, temp, source) = setup(false);
        let backup_id = manager
            .create_backup(&[source.clone()], BackupKind::Manual, "")
            .unwrap();
        manager.wait_idle();

        fs::write(&source, "changed").unwrap();
        manager
            .restore_backup(&backup_id, temp.path(), false)
            .unwrap();
        assert_eq!(fs::read_to_string(&source).unwrap(), DATA);
    }

    #[test]
    fn test_restore_unknown_backup() {
        let (manager, temp, _source) = setup(true);
        let err = manager
            .restore_backup("manual_nope", temp.path(), true)
            .unwrap_err();
        assert!(err.is_backup());
    }

    #[test]
    fn test_restore_with_no_restorable_files() {
        let (manager, temp, source) = setup(true);
        let backup_id = manager
            .create_backup(&[source], BackupKind::Manual, "")
            .unwrap();
        manager.wait_idle();

        // Replace the compressed payload with something that will not gunzip
        fs::write(manager.snapshot_dir(&backup_id).join("sessions.json.gz"), "plain").unwrap();
        let err = manager
            .restore_backup(&backup_id, &temp.path().join("out"), false)
            .unwrap_err();
        assert!(err.is_backup());
    }

    #[test]
    fn test_restore_latest_into() {
        let (manager, temp, source) = setup(true);
        manager
            .create_backup(&[source.clone()], BackupKind::Automatic, "")
            .unwrap();
        std::thread::sleep(std::time::Duration::from_millis(5));
        fs::write(&source, r#"{"sessions": [], "folders": [{"name": "f", "path": "/f"}]}"#)
            .unwrap();
        manager
            .create_backup(&[source], BackupKind::Automatic, "")
            .unwrap();
        manager.wait_idle();

        let scratch = temp.path().join("scratch");
        let dataset = manager
            .restore_latest_into(&scratch, "sessions.json")
            .unwrap();
        assert_eq!(dataset.counts(), (0, 1));
    }

    #[test]
    fn test_restore_latest_skips_missing_directories() {
        let (manager, temp, source) = setup(true);
        let older = manager
            .create_backup(&[source.clone()], BackupKind::Automatic, "")
            .unwrap();
        std::thread::sleep(std::time::Duration::from_millis(5));
        let newer = manager
            .create_backup(&[source], BackupKind::Automatic, "")
            .unwrap();
        manager.wait_idle();

        fs::remove_dir_all(manager.snapshot_dir(&newer)).unwrap();
        assert!(manager.is_available(&older));

        let dataset = manager
            .restore_latest_into(&temp.path().join("scratch"), "sessions.json")
            .unwrap();
        assert_eq!(dataset.counts(), (1, 0));
    }

    #[test]
    fn test_restore_latest_without_backups() {
        let (manager, temp, _source) = setup(true);
        assert!(manager
            .restore_latest_into(temp.path(), "sessions.json")
            .is_none());
    }
}
