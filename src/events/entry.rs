//! Storage event records
//!
//! Defines the events emitted by the storage layer and the shape they take
//! in the event journal.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// What happened to the dataset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// Dataset written and verified
    StorageSaved,
    /// Dataset read from disk
    StorageLoaded,
    /// Dataset reconstructed from a backup
    StorageRecovered,
    /// Save pipeline failed; the previous file is untouched
    SaveFailed,
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventKind::StorageSaved => write!(f, "SAVED"),
            EventKind::StorageLoaded => write!(f, "LOADED"),
            EventKind::StorageRecovered => write!(f, "RECOVERED"),
            EventKind::SaveFailed => write!(f, "SAVE FAILED"),
        }
    }
}

/// A single storage event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageEvent {
    /// When the event occurred (UTC)
    pub timestamp: DateTime<Utc>,

    pub kind: EventKind,

    /// One-line human-readable description
    pub summary: String,

    /// Structured context such as record counts or the backup id involved
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub details: Value,
}

impl StorageEvent {
    pub fn new(kind: EventKind, summary: impl Into<String>, details: Value) -> Self {
        Self {
            timestamp: Utc::now(),
            kind,
            summary: summary.into(),
            details,
        }
    }

    pub fn saved(sessions: usize, folders: usize, backup_id: Option<&str>) -> Self {
        Self::new(
            EventKind::StorageSaved,
            format!("Saved {} sessions and {} folders", sessions, folders),
            json!({ "sessions": sessions, "folders": folders, "backup_id": backup_id }),
        )
    }

    pub fn loaded(sessions: usize, folders: usize) -> Self {
        Self::new(
            EventKind::StorageLoaded,
            format!("Loaded {} sessions and {} folders", sessions, folders),
            json!({ "sessions": sessions, "folders": folders }),
        )
    }

    pub fn recovered(sessions: usize, folders: usize, reason: &str) -> Self {
        Self::new(
            EventKind::StorageRecovered,
            format!(
                "Recovered {} sessions and {} folders from backup",
                sessions, folders
            ),
            json!({ "sessions": sessions, "folders": folders, "reason": reason }),
        )
    }

    pub fn save_failed(reason: &str) -> Self {
        Self::new(
            EventKind::SaveFailed,
            format!("Save failed: {}", reason),
            json!({ "reason": reason }),
        )
    }

    /// Emit the event through `tracing`
    pub fn trace(&self) {
        match self.kind {
            EventKind::SaveFailed => tracing::error!(event = %self.kind, "{}", self.summary),
            EventKind::StorageRecovered => tracing::warn!(event = %self.kind, "{}", self.summary),
            _ => tracing::info!(event = %self.kind, "{}", self.summary),
        }
    }

    /// Single-line rendering for terminal output
    pub fn format_human_readable(&self) -> String {
        format!(
            "[{}] {} {}",
            self.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
            self.kind,
            self.summary
        )
    }
}
