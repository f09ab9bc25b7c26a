//! Interval-driven scheduled backups

use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, error, info};

use super::manager::BackupManager;
use super::metadata::BackupKind;

/// Takes a scheduled snapshot when the configured interval has elapsed
///
/// The interval is measured from the newest successful scheduled backup in
/// the index, so separate processes sharing a backup directory share the
/// schedule.
pub struct AutoBackupScheduler {
    manager: BackupManager,
    interval: Duration,
    enabled: bool,
    last_backup: Option<DateTime<Utc>>,
}

impl AutoBackupScheduler {
    pub fn new(manager: BackupManager, interval: Duration) -> Self {
        let last_backup = manager
            .list_backups(Some(BackupKind::Scheduled))
            .into_iter()
            .find(|(_, meta)| meta.is_success())
            .map(|(_, meta)| meta.timestamp);

        Self {
            manager,
            interval,
            enabled: true,
            last_backup,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn enable(&mut self) {
        self.enabled = true;
        info!("Automatic backups enabled");
    }

    pub fn disable(&mut self) {
        self.enabled = false;
        info!("Automatic backups disabled");
    }

    /// True when enabled and no backup has run within the interval
    pub fn should_backup(&self) -> bool {
        let Some(last) = self.last_backup else {
            return self.enabled;
        };
        // A backup dated in the future (clock change) is not yet due
        self.enabled
            && Utc::now()
                .signed_duration_since(last)
                .to_std()
                .map_or(false, |elapsed| elapsed >= self.interval)
    }

    /// Snapshot `source_files` if a backup is due
    ///
    /// Returns the new backup id, or `None` if nothing was due or the
    /// snapshot failed.
    pub fn perform_auto_backup(&mut self, source_files: &[PathBuf]) -> Option<String> {
        if !self.should_backup() {
            debug!("Scheduled backup not due");
            return None;
        }

        match self
            .manager
            .create_backup(source_files, BackupKind::Scheduled, "Automatic scheduled backup")
        {
            Ok(backup_id) => {
                self.last_backup = Some(Utc::now());
                info!(%backup_id, "Scheduled backup completed");
                Some(backup_id)
            }
            Err(e) => {
                error!(error = %e, "Scheduled backup failed");
                None
            }
        }
    }
}
