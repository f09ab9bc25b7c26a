//! Backup metadata
//!
//! One `BackupMetadata` describes one snapshot attempt, successful or not.
//! It is written once and never changed afterwards.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// File name of the metadata copy kept inside each snapshot directory
pub const METADATA_FILE_NAME: &str = "backup_metadata.json";

/// Version string recorded in every snapshot
pub const TOOL_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Why a snapshot was taken
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackupKind {
    Manual,
    Automatic,
    Scheduled,
    Export,
}

impl BackupKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::Automatic => "automatic",
            Self::Scheduled => "scheduled",
            Self::Export => "export",
        }
    }

    pub fn all() -> [BackupKind; 4] {
        [Self::Manual, Self::Automatic, Self::Scheduled, Self::Export]
    }
}

impl fmt::Display for BackupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackupKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("Unknown backup kind: {}", s))
    }
}

/// Outcome of a snapshot attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackupStatus {
    Success,
    Failed,
    Partial,
    Corrupted,
}

impl fmt::Display for BackupStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Success => "success",
            Self::Failed => "failed",
            Self::Partial => "partial",
            Self::Corrupted => "corrupted",
        };
        f.write_str(s)
    }
}

/// Record describing one snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackupMetadata {
    /// When the attempt finished
    pub timestamp: DateTime<Utc>,
    pub kind: BackupKind,
    pub tool_version: String,
    /// Operating system the snapshot was taken on
    pub platform: String,
    pub file_count: usize,
    /// Size of the processed files inside the snapshot
    pub total_size_bytes: u64,
    /// Aggregate hex checksum over the snapshot files
    pub checksum: String,
    pub description: String,
    pub status: BackupStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl BackupMetadata {
    /// Metadata for a completed snapshot
    pub fn success(
        kind: BackupKind,
        file_count: usize,
        total_size_bytes: u64,
        checksum: String,
        description: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            kind,
            tool_version: TOOL_VERSION.to_string(),
            platform: crate::platform::platform_name().to_string(),
            file_count,
            total_size_bytes,
            checksum,
            description: description.into(),
            status: BackupStatus::Success,
            error_message: None,
        }
    }

    /// Metadata recording a failed attempt
    pub fn failed(kind: BackupKind, description: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            kind,
            tool_version: TOOL_VERSION.to_string(),
            platform: crate::platform::platform_name().to_string(),
            file_count: 0,
            total_size_bytes: 0,
            checksum: String::new(),
            description: description.into(),
            status: BackupStatus::Failed,
            error_message: Some(error.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == BackupStatus::Success
    }
}
