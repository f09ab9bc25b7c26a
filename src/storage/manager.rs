//! Safe save/load of the session and folder dataset
//!
//! Every save snapshots the previous file, validates what it is about to
//! write, replaces the file atomically and reads it back to confirm the
//! record counts. Every load tolerates bad records and falls back to the
//! newest backup when the file itself cannot be parsed.

use std::fs;
use std::io;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, error, info, warn};

use super::audit::{DatasetAuditor, SessionAuditor};
use super::file_io::write_bytes_atomic_with;
use crate::backup::{AutoBackupScheduler, BackupConfig, BackupKind, BackupManager};
use crate::config::{Settings, StorageSettings, VaultPaths};
use crate::error::{StorageError, StorageResult};
use crate::events::{EventLog, StorageEvent};
use crate::models::dataset::validate_structure;
use crate::models::record::{collect_valid, retain_valid};
use crate::models::{Dataset, Folder, Record, Session};
use crate::platform;

/// Counters and file facts reported by `StorageManager::statistics`
#[derive(Debug, Clone, Serialize)]
pub struct StorageStats {
    pub loads: u64,
    pub saves: u64,
    pub load_errors: u64,
    pub save_errors: u64,
    pub backups_created: u64,
    pub validations_performed: u64,
    pub recoveries: u64,
    pub dataset_file: PathBuf,
    pub file_exists: bool,
    pub file_size: u64,
    pub platform: String,
}

#[derive(Debug, Default)]
struct Counters {
    loads: AtomicU64,
    saves: AtomicU64,
    load_errors: AtomicU64,
    save_errors: AtomicU64,
    backups_created: AtomicU64,
    validations_performed: AtomicU64,
    recoveries: AtomicU64,
}

fn bump(counter: &AtomicU64, by: u64) {
    counter.fetch_add(by, Ordering::Relaxed);
}

/// Result of the unlocked load pipeline
struct Loaded {
    dataset: Dataset,
    /// Parse failure that forced a recovery, if any
    recovered_from: Option<String>,
}

/// Reads and writes the dataset file
///
/// `S` and `F` are the session and folder record types; the manager only
/// uses them through the `Record` trait.
pub struct StorageManager<S: Record = Session, F: Record = Folder> {
    file_path: PathBuf,
    settings: StorageSettings,
    backup_before_save: bool,
    backups: BackupManager,
    /// Guards the whole save/load sequence on the dataset file
    file_lock: Mutex<()>,
    /// Serialises pre-save and emergency snapshots
    backup_lock: Mutex<()>,
    stats: Counters,
    auditor: Option<Box<dyn DatasetAuditor>>,
    events: Option<EventLog>,
    scheduler: Option<Mutex<AutoBackupScheduler>>,
    /// Final step of the atomic write
    replace: fn(&Path, &Path) -> io::Result<()>,
    _records: PhantomData<fn() -> (S, F)>,
}

impl StorageManager<Session, Folder> {
    /// Wire a manager for the standard layout under `paths`
    ///
    /// Creates the data and backup directories, attaches the session auditor
    /// and, when enabled in `settings`, the event journal and the scheduled
    /// backup timer.
    pub fn open(paths: &VaultPaths, settings: &Settings) -> StorageResult<Self> {
        paths.ensure_directories()?;
        let backups = BackupManager::new(paths.backup_dir(), BackupConfig::from(&settings.backup))?;

        let interval = settings.backup.auto_backup_interval_secs;
        let scheduler = (settings.backup.enabled && interval > 0)
            .then(|| AutoBackupScheduler::new(backups.clone(), Duration::from_secs(interval)));

        let mut manager =
            Self::new(paths.sessions_file(), backups, settings).with_auditor(SessionAuditor);
        if settings.event_log {
            manager = manager.with_event_log(EventLog::new(paths.event_log()));
        }
        if let Some(scheduler) = scheduler {
            manager = manager.with_scheduler(scheduler);
        }
        Ok(manager)
    }
}

impl<S: Record, F: Record> StorageManager<S, F> {
    pub fn new(file_path: PathBuf, backups: BackupManager, settings: &Settings) -> Self {
        Self {
            file_path,
            settings: settings.storage.clone(),
            backup_before_save: settings.backup.enabled,
            backups,
            file_lock: Mutex::new(()),
            backup_lock: Mutex::new(()),
            stats: Counters::default(),
            auditor: None,
            events: None,
            scheduler: None,
            replace: platform::replace_file,
            _records: PhantomData,
        }
    }

    pub fn with_auditor(mut self, auditor: impl DatasetAuditor + 'static) -> Self {
        self.auditor = Some(Box::new(auditor));
        self
    }

    pub fn with_event_log(mut self, events: EventLog) -> Self {
        self.events = Some(events);
        self
    }

    /// Take scheduled snapshots after saves that allow backups
    pub fn with_scheduler(mut self, scheduler: AutoBackupScheduler) -> Self {
        self.scheduler = Some(Mutex::new(scheduler));
        self
    }

    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    pub fn backups(&self) -> &BackupManager {
        &self.backups
    }

    fn lock_file(&self) -> MutexGuard<'_, ()> {
        self.file_lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Persist the dataset
    ///
    /// A `None` collection keeps whatever is currently on disk for that half.
    /// Invalid records are dropped with a warning. With `make_backup` and an
    /// existing file, a pre-save snapshot is taken first; its failure is
    /// logged but does not stop the save. A due scheduled snapshot is taken
    /// after a successful save with `make_backup`.
    pub fn save(
        &self,
        sessions: Option<&[S]>,
        folders: Option<&[F]>,
        make_backup: bool,
    ) -> StorageResult<()> {
        let _guard = self.lock_file();

        match self.save_unlocked(sessions, folders, make_backup) {
            Ok(event) => {
                bump(&self.stats.saves, 1);
                self.emit(event);
                if make_backup {
                    self.run_scheduler();
                }
                Ok(())
            }
            Err(e) => {
                bump(&self.stats.save_errors, 1);
                self.emit(StorageEvent::save_failed(e.reason()));
                Err(e)
            }
        }
    }

    fn save_unlocked(
        &self,
        sessions: Option<&[S]>,
        folders: Option<&[F]>,
        make_backup: bool,
    ) -> StorageResult<StorageEvent> {
        let path = &self.file_path;
        platform::validate_file_path(path).map_err(|reason| StorageError::write(path, reason))?;

        let existing = if sessions.is_none() || folders.is_none() {
            self.load_unlocked()
                .map_err(|e| {
                    StorageError::write(
                        path,
                        format!("Failed to read existing dataset: {}", e.reason()),
                    )
                })?
                .dataset
        } else {
            Dataset::default()
        };

        let session_maps = match sessions {
            Some(records) => {
                bump(&self.stats.validations_performed, records.len() as u64);
                collect_valid(records)
            }
            None => existing.sessions,
        };
        let folder_maps = match folders {
            Some(records) => {
                bump(&self.stats.validations_performed, records.len() as u64);
                collect_valid(records)
            }
            None => existing.folders,
        };

        let backup_id = if make_backup && self.backup_before_save && path.exists() {
            self.pre_save_backup()
        } else {
            None
        };

        let dataset = Dataset::new(session_maps, folder_maps);
        let payload = dataset.to_value();
        validate_structure(&payload).map_err(|reason| {
            StorageError::write(path, format!("Invalid data structure: {}", reason))
        })?;

        let bytes = serde_json::to_vec_pretty(&payload)
            .map_err(|e| StorageError::write(path, format!("Failed to serialize data: {}", e)))?;
        write_bytes_atomic_with(path, &bytes, self.replace)?;

        if self.settings.secure_permissions {
            if let Err(e) = platform::set_owner_only(path) {
                warn!(path = %path.display(), error = %e, "Failed to restrict file permissions");
            }
        }

        let (session_count, folder_count) = dataset.counts();
        if let Err(reason) = self.verify_written(session_count, folder_count) {
            let reason = match backup_id.as_deref() {
                Some(id) if self.rollback(id) => {
                    format!("Post-write verification failed ({}); restored backup {}", reason, id)
                }
                _ => format!("Post-write verification failed ({})", reason),
            };
            return Err(StorageError::write(path, reason));
        }

        Ok(StorageEvent::saved(
            session_count,
            folder_count,
            backup_id.as_deref(),
        ))
    }

    fn pre_save_backup(&self) -> Option<String> {
        let _guard = self.backup_lock.lock().unwrap_or_else(PoisonError::into_inner);
        match self.backups.create_backup(
            &[self.file_path.clone()],
            BackupKind::Automatic,
            "Automatic backup before save",
        ) {
            Ok(backup_id) => {
                bump(&self.stats.backups_created, 1);
                debug!(%backup_id, "Pre-save backup created");
                Some(backup_id)
            }
            Err(e) => {
                warn!(error = %e, "Pre-save backup failed, saving anyway");
                None
            }
        }
    }

    fn run_scheduler(&self) {
        let Some(scheduler) = &self.scheduler else {
            return;
        };
        let mut scheduler = scheduler.lock().unwrap_or_else(PoisonError::into_inner);
        if scheduler
            .perform_auto_backup(&[self.file_path.clone()])
            .is_some()
        {
            bump(&self.stats.backups_created, 1);
        }
    }

    /// Re-read the written file and compare record counts
    fn verify_written(&self, sessions: usize, folders: usize) -> Result<(), String> {
        let bytes = fs::read(&self.file_path).map_err(|e| e.to_string())?;
        let (written, _) = Dataset::parse(&bytes)?;
        let counts = written.counts();
        if counts != (sessions, folders) {
            return Err(format!(
                "expected {} sessions and {} folders, found {} and {}",
                sessions, folders, counts.0, counts.1
            ));
        }
        Ok(())
    }

    /// Put the pre-save snapshot back over the dataset file
    fn rollback(&self, backup_id: &str) -> bool {
        let Some(target_dir) = self.file_path.parent() else {
            return false;
        };
        match self.backups.restore_backup(backup_id, target_dir, true) {
            Ok(_) => {
                warn!(%backup_id, "Rolled back dataset file from backup");
                true
            }
            Err(e) => {
                error!(%backup_id, error = %e, "Rollback failed");
                false
            }
        }
    }

    /// Read the dataset
    ///
    /// A missing file yields an empty dataset. Oversized or unsafe paths are
    /// read errors. Unparseable content is recovered from the newest backup;
    /// if that fails too the file is reported corrupted.
    pub fn load(&self) -> StorageResult<Dataset> {
        let _guard = self.lock_file();

        match self.load_unlocked() {
            Ok(loaded) => {
                bump(&self.stats.loads, 1);
                let (sessions, folders) = loaded.dataset.counts();
                match loaded.recovered_from {
                    Some(reason) => {
                        bump(&self.stats.recoveries, 1);
                        self.emit(StorageEvent::recovered(sessions, folders, &reason));
                    }
                    None => self.emit(StorageEvent::loaded(sessions, folders)),
                }
                self.run_audit(&loaded.dataset);
                Ok(loaded.dataset)
            }
            Err(e) => {
                bump(&self.stats.load_errors, 1);
                error!(error = %e, "Failed to load dataset");
                Err(e)
            }
        }
    }

    /// Load and rebuild both collections as typed records
    pub fn load_records(&self) -> StorageResult<(Vec<S>, Vec<F>)> {
        let dataset = self.load()?;
        let sessions = dataset
            .sessions
            .iter()
            .filter_map(|map| S::from_map(map).ok())
            .collect();
        let folders = dataset
            .folders
            .iter()
            .filter_map(|map| F::from_map(map).ok())
            .collect();
        Ok((sessions, folders))
    }

    fn load_unlocked(&self) -> StorageResult<Loaded> {
        let path = &self.file_path;
        if !path.exists() {
            debug!(path = %path.display(), "Dataset file absent, starting empty");
            return Ok(Loaded {
                dataset: Dataset::default(),
                recovered_from: None,
            });
        }

        platform::validate_file_path(path).map_err(|reason| StorageError::read(path, reason))?;

        let size = fs::metadata(path)
            .map_err(|e| StorageError::read(path, format!("Failed to stat: {}", e)))?
            .len();
        if size > self.settings.max_file_size_bytes {
            return Err(StorageError::read(
                path,
                format!(
                    "File too large: {} bytes (limit {})",
                    size, self.settings.max_file_size_bytes
                ),
            ));
        }

        let bytes = fs::read(path)
            .map_err(|e| StorageError::read(path, format!("Failed to read: {}", e)))?;

        let (dataset, warnings) = match Dataset::parse(&bytes) {
            Ok(parsed) => parsed,
            Err(reason) => {
                error!(path = %path.display(), %reason, "Dataset file unreadable, trying backups");
                let Some(recovered) = self.recover() else {
                    return Err(StorageError::corrupted(path, reason));
                };
                info!("Dataset recovered from backup");
                return Ok(Loaded {
                    dataset: self.validate_dataset(recovered),
                    recovered_from: Some(reason),
                });
            }
        };

        for warning in warnings {
            warn!(path = %path.display(), "{}", warning);
        }

        Ok(Loaded {
            dataset: self.validate_dataset(dataset),
            recovered_from: None,
        })
    }

    fn recover(&self) -> Option<Dataset> {
        let file_name = self.file_path.file_name()?.to_string_lossy().to_string();
        let scratch = match tempfile::TempDir::new() {
            Ok(dir) => dir,
            Err(e) => {
                error!(error = %e, "Failed to create recovery directory");
                return None;
            }
        };
        self.backups.restore_latest_into(scratch.path(), &file_name)
    }

    fn validate_dataset(&self, dataset: Dataset) -> Dataset {
        let (sessions, folders) = dataset.counts();
        bump(&self.stats.validations_performed, (sessions + folders) as u64);
        Dataset::new(
            retain_valid::<S>(dataset.sessions),
            retain_valid::<F>(dataset.folders),
        )
    }

    fn run_audit(&self, dataset: &Dataset) {
        let Some(auditor) = &self.auditor else {
            return;
        };
        match auditor.audit(&dataset.sessions, &dataset.folders) {
            Ok(findings) => {
                for finding in findings.iter().filter(|f| f.is_serious()) {
                    warn!(
                        record = %finding.record,
                        severity = %finding.severity,
                        "{}",
                        finding.message
                    );
                }
            }
            Err(e) => warn!(error = %e, "Dataset audit failed"),
        }
    }

    fn emit(&self, event: StorageEvent) {
        event.trace();
        if let Some(events) = &self.events {
            if let Err(e) = events.append(&event) {
                warn!(error = %e, "Failed to journal storage event");
            }
        }
    }

    /// Manual snapshot of the dataset file, if one exists
    pub fn create_emergency_backup(&self) -> StorageResult<Option<String>> {
        if !self.file_path.exists() {
            return Ok(None);
        }

        let _guard = self.backup_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let backup_id = self.backups.create_backup(
            &[self.file_path.clone()],
            BackupKind::Manual,
            "Emergency backup",
        )?;
        bump(&self.stats.backups_created, 1);
        info!(%backup_id, "Emergency backup created");
        Ok(Some(backup_id))
    }

    pub fn statistics(&self) -> StorageStats {
        let read = |counter: &AtomicU64| counter.load(Ordering::Relaxed);
        let file_size = fs::metadata(&self.file_path).map(|m| m.len()).ok();

        StorageStats {
            loads: read(&self.stats.loads),
            saves: read(&self.stats.saves),
            load_errors: read(&self.stats.load_errors),
            save_errors: read(&self.stats.save_errors),
            backups_created: read(&self.stats.backups_created),
            validations_performed: read(&self.stats.validations_performed),
            recoveries: read(&self.stats.recoveries),
            dataset_file: self.file_path.clone(),
            file_exists: file_size.is_some(),
            file_size: file_size.unwrap_or(0),
            platform: platform::platform_name().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;
    use crate::models::record::map_name;
    use crate::storage::audit::AuditFinding;
    use serde_json::json;
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn create_test_manager() -> (StorageManager, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let paths = VaultPaths::with_base_dir(temp_dir.path().to_path_buf());
        let manager = StorageManager::open(&paths, &Settings::default()).unwrap();
        (manager, temp_dir)
    }

    fn names(maps: &[crate::models::RecordMap]) -> Vec<&str> {
        maps.iter().filter_map(map_name).collect()
    }

    #[test]
    fn test_load_without_file_is_empty() {
        let (manager, _temp) = create_test_manager();
        let dataset = manager.load().unwrap();
        assert!(dataset.is_empty());
        assert_eq!(manager.statistics().loads, 1);
    }

    #[test]
    fn test_everyday_save() {
        let (manager, _temp) = create_test_manager();
        let sessions = vec![Session::ssh("WebServer", "example.com")];
        let folders = vec![Folder::new("Work", "/Work")];

        manager.save(Some(&sessions), Some(&folders), true).unwrap();
        let dataset = manager.load().unwrap();

        assert_eq!(names(&dataset.sessions), vec!["WebServer"]);
        assert_eq!(dataset.sessions[0]["session_type"], "ssh");
        assert_eq!(dataset.sessions[0]["host"], "example.com");
        assert_eq!(names(&dataset.folders), vec!["Work"]);
        assert_eq!(dataset.folders[0]["path"], "/Work");
    }

    #[test]
    fn test_round_trip_records() {
        let (manager, _temp) = create_test_manager();
        let sessions = vec![
            Session::local("Shell"),
            Session::ssh("Db", "db.internal").in_folder("/Work"),
            Session::ssh("Edge", "edge.example.com"),
        ];
        let folders = vec![Folder::new("Work", "/Work"), Folder::new("Prod", "/Work/Prod")];

        manager.save(Some(&sessions), Some(&folders), true).unwrap();
        let (loaded_sessions, loaded_folders) = manager.load_records().unwrap();

        assert_eq!(loaded_sessions, sessions);
        assert_eq!(loaded_folders, folders);
    }

    #[test]
    fn test_save_is_idempotent() {
        let (manager, _temp) = create_test_manager();
        let sessions = vec![Session::local("Shell")];
        let folders = vec![Folder::new("Work", "/Work")];

        manager.save(Some(&sessions), Some(&folders), true).unwrap();
        let first = manager.load().unwrap();
        manager.save(Some(&sessions), Some(&folders), true).unwrap();
        let second = manager.load().unwrap();
        manager.backups().wait_idle();

        assert_eq!(first, second);
    }

    #[test]
    fn test_invalid_records_dropped_on_save() {
        let (manager, _temp) = create_test_manager();
        let sessions = vec![
            Session::local("Good"),
            Session::local(""),
            Session::ssh("NoHost", ""),
        ];

        manager.save(Some(&sessions), Some(&[]), false).unwrap();
        let dataset = manager.load().unwrap();
        assert_eq!(names(&dataset.sessions), vec!["Good"]);
    }

    #[test]
    fn test_lenient_load() {
        let (manager, _temp) = create_test_manager();
        let content = json!({
            "sessions": [
                {"name": "A", "session_type": "local"},
                {"name": "B", "session_type": "ssh", "host": "b.example"},
                {"name": "", "session_type": "local"},
                {"name": "C", "session_type": "local"}
            ],
            "folders": []
        });
        fs::write(manager.file_path(), content.to_string()).unwrap();

        let dataset = manager.load().unwrap();
        assert_eq!(names(&dataset.sessions), vec!["A", "B", "C"]);
    }

    #[test]
    fn test_wrong_shape_is_coerced() {
        let (manager, _temp) = create_test_manager();
        let content = json!({
            "sessions": "not a list",
            "folders": [{"name": "Work", "path": "/Work"}, 42]
        });
        fs::write(manager.file_path(), content.to_string()).unwrap();

        let dataset = manager.load().unwrap();
        assert!(dataset.sessions.is_empty());
        assert_eq!(names(&dataset.folders), vec!["Work"]);
    }

    #[test]
    fn test_saving_one_half_keeps_the_other() {
        let (manager, _temp) = create_test_manager();
        manager
            .save(
                Some(&[Session::local("Shell")]),
                Some(&[Folder::new("Work", "/Work")]),
                false,
            )
            .unwrap();

        manager
            .save(Some(&[Session::local("Other")]), None, false)
            .unwrap();
        let dataset = manager.load().unwrap();
        assert_eq!(names(&dataset.sessions), vec!["Other"]);
        assert_eq!(names(&dataset.folders), vec!["Work"]);

        manager
            .save(None, Some(&[Folder::new("Home", "/Home")]), false)
            .unwrap();
        let dataset = manager.load().unwrap();
        assert_eq!(names(&dataset.sessions), vec!["Other"]);
        assert_eq!(names(&dataset.folders), vec!["Home"]);
    }

    #[test]
    fn test_pre_save_backup_only_when_file_exists() {
        let (manager, _temp) = create_test_manager();
        let sessions = vec![Session::local("Shell")];

        manager.save(Some(&sessions), Some(&[]), true).unwrap();
        assert!(manager
            .backups()
            .list_backups(Some(BackupKind::Automatic))
            .is_empty());

        manager.save(Some(&sessions), Some(&[]), true).unwrap();
        manager.save(Some(&sessions), Some(&[]), false).unwrap();
        manager.backups().wait_idle();

        // One pre-save snapshot plus the first scheduled one
        assert_eq!(manager.statistics().backups_created, 2);
        let backups = manager.backups().list_backups(Some(BackupKind::Automatic));
        assert_eq!(backups.len(), 1);
    }

    #[test]
    fn test_backups_disabled_in_settings() {
        let temp_dir = TempDir::new().unwrap();
        let paths = VaultPaths::with_base_dir(temp_dir.path().to_path_buf());
        let mut settings = Settings::default();
        settings.backup.enabled = false;
        let manager = StorageManager::open(&paths, &settings).unwrap();

        manager.save(Some(&[Session::local("A")]), Some(&[]), true).unwrap();
        manager.save(Some(&[Session::local("A")]), Some(&[]), true).unwrap();

        assert!(manager.backups().list_backups(None).is_empty());
    }

    #[test]
    fn test_corruption_recovery() {
        let (manager, _temp) = create_test_manager();
        let sessions = vec![Session::ssh("WebServer", "example.com")];
        let folders = vec![Folder::new("Work", "/Work")];

        manager.save(Some(&sessions), Some(&folders), true).unwrap();
        // Second save snapshots the first file
        manager.save(Some(&sessions), Some(&folders), true).unwrap();
        manager.backups().wait_idle();
        let good = manager.load().unwrap();

        fs::write(manager.file_path(), b"").unwrap();
        let recovered = manager.load().unwrap();

        assert_eq!(recovered, good);
        assert_eq!(manager.statistics().recoveries, 1);

        let events = EventLog::new(manager.file_path().with_file_name("events.log"))
            .read_all()
            .unwrap();
        assert!(events.iter().any(|e| e.kind == EventKind::StorageRecovered));
    }

    #[test]
    fn test_corruption_without_backups() {
        let (manager, _temp) = create_test_manager();
        fs::write(manager.file_path(), b"{ not json").unwrap();

        let err = manager.load().unwrap_err();
        assert!(err.is_corrupted());
        assert_eq!(manager.statistics().load_errors, 1);
    }

    #[test]
    fn test_oversized_file_is_a_read_error() {
        let temp_dir = TempDir::new().unwrap();
        let paths = VaultPaths::with_base_dir(temp_dir.path().to_path_buf());
        let mut settings = Settings::default();
        settings.storage.max_file_size_bytes = 16;
        let manager = StorageManager::open(&paths, &settings).unwrap();

        fs::write(manager.file_path(), r#"{"sessions": [], "folders": [], "pad": "xxxxxxxx"}"#)
            .unwrap();
        assert!(manager.load().unwrap_err().is_read());
    }

    #[test]
    fn test_verify_written_detects_mismatch() {
        let (manager, _temp) = create_test_manager();
        manager
            .save(Some(&[Session::local("A")]), Some(&[]), false)
            .unwrap();

        assert!(manager.verify_written(1, 0).is_ok());
        assert!(manager.verify_written(2, 0).is_err());
    }

    #[test]
    fn test_rollback_restores_previous_file() {
        let (manager, _temp) = create_test_manager();
        manager
            .save(Some(&[Session::local("Before")]), Some(&[]), false)
            .unwrap();
        let backup_id = manager.pre_save_backup().unwrap();
        manager
            .save(Some(&[Session::local("After")]), Some(&[]), false)
            .unwrap();
        manager.backups().wait_idle();

        assert!(manager.rollback(&backup_id));
        let dataset = manager.load().unwrap();
        assert_eq!(names(&dataset.sessions), vec!["Before"]);
        assert!(!manager.rollback("automatic_unknown"));
    }

    #[test]
    fn test_emergency_backup() {
        let (manager, _temp) = create_test_manager();
        assert!(manager.create_emergency_backup().unwrap().is_none());

        manager
            .save(Some(&[Session::local("A")]), Some(&[]), false)
            .unwrap();
        let backup_id = manager.create_emergency_backup().unwrap().unwrap();
        manager.backups().wait_idle();

        assert!(backup_id.starts_with("manual_"));
        assert!(manager.backups().verify_backup(&backup_id));
    }

    #[test]
    fn test_statistics() {
        let (manager, _temp) = create_test_manager();
        manager
            .save(Some(&[Session::local("A"), Session::local("B")]), Some(&[]), false)
            .unwrap();
        manager.load().unwrap();

        let stats = manager.statistics();
        assert_eq!(stats.saves, 1);
        assert_eq!(stats.loads, 1);
        assert_eq!(stats.save_errors, 0);
        assert!(stats.file_exists);
        assert!(stats.file_size > 0);
        assert_eq!(stats.validations_performed, 4);
        assert_eq!(stats.platform, platform::platform_name());
    }

    #[test]
    fn test_events_are_journaled() {
        let (manager, temp) = create_test_manager();
        manager
            .save(Some(&[Session::local("A")]), Some(&[]), false)
            .unwrap();
        manager.load().unwrap();

        let events = EventLog::new(temp.path().join("events.log"))
            .read_all()
            .unwrap();
        let kinds: Vec<_> = events.iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![EventKind::StorageSaved, EventKind::StorageLoaded]);
    }

    struct FailingAuditor(Arc<AtomicBool>);

    impl DatasetAuditor for FailingAuditor {
        fn audit(
            &self,
            _sessions: &[crate::models::RecordMap],
            _folders: &[crate::models::RecordMap],
        ) -> Result<Vec<AuditFinding>, String> {
            self.0.store(true, Ordering::SeqCst);
            Err("auditor exploded".into())
        }
    }

    #[test]
    fn test_audit_failure_does_not_fail_load() {
        let (manager, _temp) = create_test_manager();
        let called = Arc::new(AtomicBool::new(false));
        let manager = manager.with_auditor(FailingAuditor(called.clone()));

        manager
            .save(Some(&[Session::local("A")]), Some(&[]), false)
            .unwrap();
        assert_eq!(manager.load().unwrap().sessions.len(), 1);
        assert!(called.load(Ordering::SeqCst));
    }

    #[test]
    fn test_concurrent_saves() {
        let (manager, _temp) = create_test_manager();
        let manager = Arc::new(manager);

        let handles: Vec<_> = (0..4)
            .map(|i| {
                let manager = Arc::clone(&manager);
                std::thread::spawn(move || {
                    let sessions = vec![Session::local(format!("S{}", i))];
                    manager.save(Some(&sessions), None, true).unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        manager.backups().wait_idle();

        assert_eq!(manager.load().unwrap().sessions.len(), 1);
        assert_eq!(manager.statistics().save_errors, 0);
    }

    #[test]
    fn test_scheduled_backup_follows_interval() {
        let (manager, _temp) = create_test_manager();
        let sessions = vec![Session::local("Shell")];

        manager.save(Some(&sessions), Some(&[]), false).unwrap();
        assert!(manager
            .backups()
            .list_backups(Some(BackupKind::Scheduled))
            .is_empty());

        manager.save(Some(&sessions), Some(&[]), true).unwrap();
        manager.save(Some(&sessions), Some(&[]), true).unwrap();
        manager.backups().wait_idle();

        let scheduled = manager.backups().list_backups(Some(BackupKind::Scheduled));
        assert_eq!(scheduled.len(), 1);
        assert_eq!(scheduled[0].1.description, "Automatic scheduled backup");
    }

    #[test]
    fn test_zero_interval_disables_scheduled_backups() {
        let temp_dir = TempDir::new().unwrap();
        let paths = VaultPaths::with_base_dir(temp_dir.path().to_path_buf());
        let mut settings = Settings::default();
        settings.backup.auto_backup_interval_secs = 0;
        let manager = StorageManager::open(&paths, &settings).unwrap();

        manager.save(Some(&[Session::local("A")]), Some(&[]), true).unwrap();
        manager.save(Some(&[Session::local("A")]), Some(&[]), true).unwrap();
        manager.backups().wait_idle();

        assert!(manager
            .backups()
            .list_backups(Some(BackupKind::Scheduled))
            .is_empty());
        assert_eq!(manager.backups().list_backups(None).len(), 1);
    }

    fn replace_then_truncate(source: &Path, target: &Path) -> io::Result<()> {
        platform::replace_file(source, target)?;
        fs::write(target, r#"{"sessions": [], "folders": []}"#)
    }

    #[test]
    fn test_save_rolls_back_when_written_file_disagrees() {
        let (mut manager, _temp) = create_test_manager();
        manager
            .save(Some(&[Session::local("Before")]), Some(&[]), false)
            .unwrap();

        manager.replace = replace_then_truncate;
        let err = manager
            .save(Some(&[Session::local("After")]), Some(&[]), true)
            .unwrap_err();
        manager.backups().wait_idle();

        assert!(err.is_write());
        assert!(err.reason().contains("Post-write verification failed"));
        assert!(err.reason().contains("restored backup"));
        assert_eq!(manager.statistics().save_errors, 1);

        manager.replace = platform::replace_file;
        let dataset = manager.load().unwrap();
        assert_eq!(names(&dataset.sessions), vec!["Before"]);
    }
}
