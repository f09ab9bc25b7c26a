//! SHA-256 checksums for snapshot files
//!
//! A snapshot's checksum is the digest of its per-file digests taken in
//! sorted order, so the result does not depend on directory iteration order.

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

use sha2::{Digest, Sha256};

/// Hex-encoded SHA-256 of a file's content
pub fn file_checksum(path: &Path) -> io::Result<String> {
    if !path.is_file() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{} is not a file", path.display()),
        ));
    }

    let mut reader = BufReader::new(File::open(path)?);
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8 * 1024];

    loop {
        let n = reader.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}

/// Digest over a set of per-file digests, independent of their order
pub fn aggregate_checksum<I, S>(checksums: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut sorted: Vec<String> = checksums
        .into_iter()
        .map(|c| c.as_ref().to_string())
        .collect();
    sorted.sort();

    let mut hasher = Sha256::new();
    for checksum in &sorted {
        hasher.update(checksum.as_bytes());
    }
    format!("{:x}", hasher.finalize())
}
