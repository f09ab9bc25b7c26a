//! Platform helpers for file safety
//!
//! Path sanity checks, owner-only permissions and the replace-over-existing
//! primitive used by atomic writes.

use std::fs;
use std::io;
use std::path::{Component, Path};

use crate::error::StorageError;

/// Name of the running platform, recorded in backup metadata
pub fn platform_name() -> &'static str {
    std::env::consts::OS
}

/// Whether `rename` atomically replaces an existing destination file
pub fn supports_atomic_replace() -> bool {
    !cfg!(windows)
}

/// Move `source` over `target`.
///
/// Where rename cannot replace an existing file the target is removed first.
/// A crash between the removal and the rename leaves neither file in place;
/// the pre-save backup is the only copy in that window.
pub fn replace_file(source: &Path, target: &Path) -> io::Result<()> {
    if !supports_atomic_replace() && target.exists() {
        fs::remove_file(target)?;
    }
    fs::rename(source, target)
}

/// Reject paths that are empty, contain NUL bytes or climb out with `..`
pub fn validate_file_path(path: &Path) -> Result<(), String> {
    if path.as_os_str().is_empty() {
        return Err("Path is empty".into());
    }

    if path.to_string_lossy().contains('\0') {
        return Err("Path contains a NUL byte".into());
    }

    if path.components().any(|c| matches!(c, Component::ParentDir)) {
        return Err(format!(
            "Path {} contains a parent directory reference",
            path.display()
        ));
    }

    Ok(())
}

/// Restrict a file to owner read/write
#[cfg(unix)]
pub fn set_owner_only(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
pub fn set_owner_only(_path: &Path) -> io::Result<()> {
    Ok(())
}

/// Create a directory (and parents) readable only by the owner
pub fn ensure_private_dir(path: &Path) -> Result<(), StorageError> {
    fs::create_dir_all(path).map_err(|e| {
        StorageError::write(path, format!("Failed to create directory: {}", e))
    })?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o700)).map_err(|e| {
            StorageError::write(path, format!("Failed to set directory permissions: {}", e))
        })?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_validate_file_path() {
        assert!(validate_file_path(Path::new("/home/user/sessions.json")).is_ok());
        assert!(validate_file_path(Path::new("")).is_err());
        assert!(validate_file_path(Path::new("/home/user/../root/sessions.json")).is_err());
    }

    #[test]
    fn test_replace_file_overwrites_target() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("new.tmp");
        let target = temp_dir.path().join("data.json");
        fs::write(&source, "new").unwrap();
        fs::write(&target, "old").unwrap();

        replace_file(&source, &target).unwrap();

        assert_eq!(fs::read_to_string(&target).unwrap(), "new");
        assert!(!source.exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_set_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("secret.json");
        fs::write(&path, "{}").unwrap();

        set_owner_only(&path).unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_ensure_private_dir_nested() {
        let temp_dir = TempDir::new().unwrap();
        let nested = temp_dir.path().join("a").join("b");

        ensure_private_dir(&nested).unwrap();
        assert!(nested.is_dir());
    }
}
