//! Append-only event journal
//!
//! Each event is written as a single JSON line and flushed immediately.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use crate::error::{StorageError, StorageResult};

use super::entry::StorageEvent;

/// Line-delimited JSON journal of storage events
#[derive(Debug, Clone)]
pub struct EventLog {
    log_path: PathBuf,
}

impl EventLog {
    pub fn new(log_path: PathBuf) -> Self {
        Self { log_path }
    }

    /// Append one event to the journal
    pub fn append(&self, event: &StorageEvent) -> StorageResult<()> {
        let path = &self.log_path;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| StorageError::write(path, format!("Failed to open event log: {}", e)))?;

        let json = serde_json::to_string(event)
            .map_err(|e| StorageError::write(path, format!("Failed to serialize event: {}", e)))?;

        writeln!(file, "{}", json)
            .map_err(|e| StorageError::write(path, format!("Failed to write event: {}", e)))?;

        file.flush()
            .map_err(|e| StorageError::write(path, format!("Failed to flush event log: {}", e)))?;

        Ok(())
    }

    /// Read all events, oldest first
    ///
    /// Lines that fail to parse are skipped.
    pub fn read_all(&self) -> StorageResult<Vec<StorageEvent>> {
        let path = &self.log_path;
        if !path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(path)
            .map_err(|e| StorageError::read(path, format!("Failed to open event log: {}", e)))?;

        let mut events = Vec::new();
        for (line_num, line) in BufReader::new(file).lines().enumerate() {
            let line = line.map_err(|e| {
                StorageError::read(path, format!("Failed to read line {}: {}", line_num + 1, e))
            })?;

            if line.trim().is_empty() {
                continue;
            }

            match serde_json::from_str(&line) {
                Ok(event) => events.push(event),
                Err(e) => tracing::warn!(line = line_num + 1, error = %e, "Skipping bad event line"),
            }
        }

        Ok(events)
    }

    /// The most recent `count` events, oldest first
    pub fn read_recent(&self, count: usize) -> StorageResult<Vec<StorageEvent>> {
        let mut events = self.read_all()?;
        let start = events.len().saturating_sub(count);
        Ok(events.split_off(start))
    }

    pub fn path(&self) -> &Path {
        &self.log_path
    }
}
