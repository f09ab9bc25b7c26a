//! Compression helpers for snapshots
//!
//! Individual files inside a snapshot are gzip-compressed. Whole snapshots
//! are packed into a zip archive for export and unpacked on import.

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::Path;

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use zip::result::{ZipError, ZipResult};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Suffix appended to compressed snapshot files
pub const GZIP_SUFFIX: &str = ".gz";

/// Gzip `source` into `target`, returning the compressed size
pub fn compress_file(source: &Path, target: &Path) -> io::Result<u64> {
    let mut input = BufReader::new(File::open(source)?);
    let output = BufWriter::new(File::create(target)?);

    let mut encoder = GzEncoder::new(output, Compression::default());
    io::copy(&mut input, &mut encoder)?;
    let mut output = encoder.finish()?;
    output.flush()?;

    Ok(fs::metadata(target)?.len())
}

/// Gunzip `source` into `target`, returning the decompressed size
pub fn decompress_file(source: &Path, target: &Path) -> io::Result<u64> {
    let mut decoder = GzDecoder::new(BufReader::new(File::open(source)?));
    let mut output = BufWriter::new(File::create(target)?);

    let written = io::copy(&mut decoder, &mut output)?;
    output.flush()?;

    Ok(written)
}

/// Copy `source` verbatim into `target`, returning the size
pub fn copy_file(source: &Path, target: &Path) -> io::Result<u64> {
    fs::copy(source, target)
}

/// Pack every regular file directly inside `dir` into a zip at `archive_path`
///
/// Returns the number of files packed.
pub fn pack_directory(dir: &Path, archive_path: &Path) -> ZipResult<usize> {
    let mut entries: Vec<_> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .collect();
    entries.sort();

    if let Some(parent) = archive_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let mut zip = ZipWriter::new(File::create(archive_path)?);
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

    for path in &entries {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or(ZipError::FileNotFound)?;
        zip.start_file(name, options)?;
        let mut input = BufReader::new(File::open(path)?);
        io::copy(&mut input, &mut zip)?;
    }

    zip.finish()?;
    Ok(entries.len())
}

/// Extract a zip into `dest_dir`, flattening any directory structure
///
/// Entries whose names would escape `dest_dir` are skipped. Returns the names
/// of the extracted files.
pub fn unpack_archive(archive_path: &Path, dest_dir: &Path) -> ZipResult<Vec<String>> {
    let mut archive = ZipArchive::new(File::open(archive_path)?)?;
    fs::create_dir_all(dest_dir)?;

    let mut extracted = Vec::new();
    for index in 0..archive.len() {
        let mut entry = archive.by_index(index)?;
        if entry.is_dir() {
            continue;
        }

        let Some(name) = entry
            .enclosed_name()
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().to_string())
        else {
            tracing::warn!(entry = entry.name(), "Skipping unsafe archive entry");
            continue;
        };

        let mut output = BufWriter::new(File::create(dest_dir.join(&name))?);
        io::copy(&mut entry, &mut output)?;
        output.flush()?;
        extracted.push(name);
    }

    Ok(extracted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_compress_then_decompress() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("sessions.json");
        let packed = temp_dir.path().join("sessions.json.gz");
        let restored = temp_dir.path().join("restored.json");
        let content = r#"{"sessions": [], "folders": []}"#.repeat(50);
        fs::write(&source, &content).unwrap();

        let compressed_size = compress_file(&source, &packed).unwrap();
        assert!(compressed_size > 0);
        assert!(compressed_size < content.len() as u64);

        decompress_file(&packed, &restored).unwrap();
        assert_eq!(fs::read_to_string(&restored).unwrap(), content);
    }

    #[test]
    fn test_decompress_rejects_plain_file() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("plain.gz");
        fs::write(&source, "definitely not gzip").unwrap();

        assert!(decompress_file(&source, &temp_dir.path().join("out")).is_err());
    }

    #[test]
    fn test_pack_and_unpack_directory() {
        let temp_dir = TempDir::new().unwrap();
        let snapshot = temp_dir.path().join("snapshot");
        fs::create_dir(&snapshot).unwrap();
        fs::write(snapshot.join("a.json.gz"), b"aaaa").unwrap();
        fs::write(snapshot.join("backup_metadata.json"), b"{}").unwrap();

        let archive = temp_dir.path().join("out").join("snapshot.zip");
        assert_eq!(pack_directory(&snapshot, &archive).unwrap(), 2);

        let dest = temp_dir.path().join("imported");
        let mut names = unpack_archive(&archive, &dest).unwrap();
        names.sort();
        assert_eq!(names, vec!["a.json.gz", "backup_metadata.json"]);
        assert_eq!(fs::read(dest.join("a.json.gz")).unwrap(), b"aaaa");
    }
}
