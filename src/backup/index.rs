//! Durable index of snapshots
//!
//! Maps backup ids to their metadata and persists the map as
//! `backup_index.json` in the backup root.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tracing::{error, warn};

use super::metadata::{BackupKind, BackupMetadata};
use crate::error::{StorageError, StorageResult};
use crate::storage::file_io::write_json_atomic;

pub const INDEX_FILE_NAME: &str = "backup_index.json";

#[derive(Debug, Clone)]
pub struct BackupIndex {
    path: PathBuf,
    entries: BTreeMap<String, BackupMetadata>,
}

impl BackupIndex {
    /// An empty index that will persist to `path`
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            entries: BTreeMap::new(),
        }
    }

    /// Load the index, skipping entries that cannot be parsed
    ///
    /// An unreadable index file yields an empty index; the error is logged.
    pub fn load(path: PathBuf) -> Self {
        let mut index = Self::new(path);
        if !index.path.exists() {
            return index;
        }

        let raw: Map<String, Value> = match fs::read(&index.path)
            .map_err(|e| e.to_string())
            .and_then(|bytes| serde_json::from_slice(&bytes).map_err(|e| e.to_string()))
        {
            Ok(raw) => raw,
            Err(e) => {
                error!(path = %index.path.display(), error = %e, "Failed to load backup index");
                return index;
            }
        };

        for (backup_id, value) in raw {
            match serde_json::from_value::<BackupMetadata>(value) {
                Ok(metadata) => {
                    index.entries.insert(backup_id, metadata);
                }
                Err(e) => {
                    warn!(%backup_id, error = %e, "Skipping unreadable backup index entry");
                }
            }
        }

        index
    }

    pub fn save(&self) -> StorageResult<()> {
        write_json_atomic(&self.path, &self.entries).map_err(|e| {
            StorageError::backup(&self.path, format!("Failed to persist backup index: {}", e.reason()))
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn insert(&mut self, backup_id: impl Into<String>, metadata: BackupMetadata) {
        self.entries.insert(backup_id.into(), metadata);
    }

    pub fn remove(&mut self, backup_id: &str) -> Option<BackupMetadata> {
        self.entries.remove(backup_id)
    }

    pub fn get(&self, backup_id: &str) -> Option<&BackupMetadata> {
        self.entries.get(backup_id)
    }

    pub fn contains(&self, backup_id: &str) -> bool {
        self.entries.contains_key(backup_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries newest first, optionally restricted to one kind
    pub fn sorted(&self, kind: Option<BackupKind>) -> Vec<(String, BackupMetadata)> {
        let mut entries: Vec<_> = self
            .entries
            .iter()
            .filter(|(_, meta)| kind.map_or(true, |k| meta.kind == k))
            .map(|(id, meta)| (id.clone(), meta.clone()))
            .collect();
        entries.sort_by(|a, b| b.1.timestamp.cmp(&a.1.timestamp).then_with(|| b.0.cmp(&a.0)));
        entries
    }

    /// Entries grouped by kind, each group newest first
    pub fn grouped_by_kind(&self) -> BTreeMap<BackupKind, Vec<(String, BackupMetadata)>> {
        let mut groups: BTreeMap<BackupKind, Vec<(String, BackupMetadata)>> = BTreeMap::new();
        for (id, meta) in self.sorted(None) {
            groups.entry(meta.kind).or_default().push((id, meta));
        }
        groups
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use tempfile::TempDir;

    fn meta(kind: BackupKind, minutes_ago: i64) -> BackupMetadata {
        let mut meta = BackupMetadata::success(kind, 1, 10, "abc".into(), "");
        meta.timestamp = Utc::now() - Duration::minutes(minutes_ago);
        meta
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(INDEX_FILE_NAME);

        let mut index = BackupIndex::new(path.clone());
        index.insert("manual_1", meta(BackupKind::Manual, 5));
        index.insert("automatic_1", meta(BackupKind::Automatic, 1));
        index.save().unwrap();

        let loaded = BackupIndex::load(path);
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.get("manual_1").unwrap().kind, BackupKind::Manual);
    }

    #[test]
    fn test_load_skips_bad_entries() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(INDEX_FILE_NAME);

        let mut index = BackupIndex::new(path.clone());
        index.insert("manual_1", meta(BackupKind::Manual, 5));
        index.save().unwrap();

        let mut raw: Map<String, Value> =
            serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
        raw.insert("broken".into(), serde_json::json!({"kind": "nope"}));
        fs::write(&path, serde_json::to_vec(&raw).unwrap()).unwrap();

        let loaded = BackupIndex::load(path);
        assert_eq!(loaded.len(), 1);
        assert!(loaded.contains("manual_1"));
    }

    #[test]
    fn test_load_garbage_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(INDEX_FILE_NAME);
        fs::write(&path, "garbage").unwrap();

        assert!(BackupIndex::load(path).is_empty());
    }

    #[test]
    fn test_sorted_newest_first_with_filter() {
        let temp_dir = TempDir::new().unwrap();
        let mut index = BackupIndex::new(temp_dir.path().join(INDEX_FILE_NAME));
        index.insert("old", meta(BackupKind::Manual, 30));
        index.insert("new", meta(BackupKind::Manual, 1));
        index.insert("auto", meta(BackupKind::Automatic, 10));

        let all: Vec<_> = index.sorted(None).into_iter().map(|(id, _)| id).collect();
        assert_eq!(all, vec!["new", "auto", "old"]);

        let manual: Vec<_> = index
            .sorted(Some(BackupKind::Manual))
            .into_iter()
            .map(|(id, _)| id)
            .collect();
        assert_eq!(manual, vec!["new", "old"]);

        let groups = index.grouped_by_kind();
        assert_eq!(groups[&BackupKind::Manual].len(), 2);
        assert_eq!(groups[&BackupKind::Automatic].len(), 1);
    }
}
