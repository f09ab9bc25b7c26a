//! File I/O utilities with atomic writes
//!
//! Provides safe file operations that won't corrupt data on failure. Writers
//! stage content in a temporary file beside the target and rename it into
//! place, so a reader sees either the old file or the new one, never a mix.

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Serialize};

use crate::error::StorageError;
use crate::platform;

/// Read JSON from a file, returning a default value if file doesn't exist
pub fn read_json<T, P>(path: P) -> Result<T, StorageError>
where
    T: DeserializeOwned + Default,
    P: AsRef<Path>,
{
    let path = path.as_ref();

    if !path.exists() {
        return Ok(T::default());
    }

    read_json_required(path)
}

/// Read JSON from a file, returning an error if file doesn't exist
pub fn read_json_required<T, P>(path: P) -> Result<T, StorageError>
where
    T: DeserializeOwned,
    P: AsRef<Path>,
{
    let path = path.as_ref();

    if !path.exists() {
        return Err(StorageError::read(path, "File not found"));
    }

    let file = File::open(path)
        .map_err(|e| StorageError::read(path, format!("Failed to open: {}", e)))?;

    let reader = BufReader::new(file);
    serde_json::from_reader(reader)
        .map_err(|e| StorageError::corrupted(path, format!("Failed to parse: {}", e)))
}

/// Path of the staging file used when writing `path`
///
/// Lives in the same directory so the final rename never crosses filesystems.
pub fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Write JSON to a file atomically (write to temp, then rename)
pub fn write_json_atomic<T, P>(path: P, data: &T) -> Result<(), StorageError>
where
    T: Serialize,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let bytes = serde_json::to_vec_pretty(data)
        .map_err(|e| StorageError::write(path, format!("Failed to serialize data: {}", e)))?;
    write_bytes_atomic(path, &bytes)
}

/// Write raw bytes to a file atomically
pub fn write_bytes_atomic(path: &Path, bytes: &[u8]) -> Result<(), StorageError> {
    write_bytes_atomic_with(path, bytes, platform::replace_file)
}

/// Atomic write with a caller-supplied replace step
///
/// `replace` moves the fully written and synced temp file over the target.
/// If it fails, the temp file is removed and the target is left as it was.
pub fn write_bytes_atomic_with<F>(path: &Path, bytes: &[u8], replace: F) -> Result<(), StorageError>
where
    F: FnOnce(&Path, &Path) -> io::Result<()>,
{
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| {
                StorageError::write(
                    path,
                    format!("Failed to create directory {}: {}", parent.display(), e),
                )
            })?;
        }
    }

    let temp_path = temp_path_for(path);

    if let Err(err) = stage_temp_file(path, &temp_path, bytes) {
        let _ = fs::remove_file(&temp_path);
        return Err(err);
    }

    replace(&temp_path, path).map_err(|e| {
        let _ = fs::remove_file(&temp_path);
        StorageError::write(path, format!("Failed to rename temp file: {}", e))
    })?;

    Ok(())
}

fn stage_temp_file(path: &Path, temp_path: &Path, bytes: &[u8]) -> Result<(), StorageError> {
    let file = File::create(temp_path)
        .map_err(|e| StorageError::write(path, format!("Failed to create temp file: {}", e)))?;

    let mut writer = BufWriter::new(file);
    writer
        .write_all(bytes)
        .map_err(|e| StorageError::write(path, format!("Failed to write temp file: {}", e)))?;

    writer
        .flush()
        .map_err(|e| StorageError::write(path, format!("Failed to flush data: {}", e)))?;

    // Sync to disk before rename
    writer
        .get_ref()
        .sync_all()
        .map_err(|e| StorageError::write(path, format!("Failed to sync data: {}", e)))?;

    let written = fs::metadata(temp_path)
        .map(|m| m.len())
        .map_err(|e| StorageError::write(path, format!("Failed to stat temp file: {}", e)))?;
    if written == 0 {
        return Err(StorageError::write(
            path,
            "Temporary file was not written correctly",
        ));
    }

    Ok(())
}
