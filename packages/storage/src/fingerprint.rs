//! Content fingerprinting.
//!
//! A fingerprint is computed in one sequential pass over the file in
//! [`CHUNK_SIZE`] pieces, folding every chunk through SHA-256 and MD5 at
//! once. Memory use is bounded regardless of file size.

use std::io::Read;
use std::path::Path;

use sauce_storage_models::{ContentHash, HashAlgorithm, LocalFingerprint};
use sha2::{Digest, Sha256};

use crate::StorageError;

/// Read buffer size for streaming hashes.
pub const CHUNK_SIZE: usize = 256 * 1024;

/// Incremental hasher producing a [`LocalFingerprint`].
struct Hasher {
    sha256: Sha256,
    md5: md5::Context,
    size: u64,
}

impl Hasher {
    fn new() -> Self {
        Self {
            sha256: Sha256::new(),
            md5: md5::Context::new(),
            size: 0,
        }
    }

    fn update(&mut self, chunk: &[u8]) {
        self.sha256.update(chunk);
        self.md5.consume(chunk);
        self.size += chunk.len() as u64;
    }

    fn finish(self) -> LocalFingerprint {
        LocalFingerprint {
            size: self.size,
            sha256: ContentHash::new(
                HashAlgorithm::Sha256,
                &hex::encode(self.sha256.finalize()),
            ),
            md5: ContentHash::new(HashAlgorithm::Md5, &format!("{:x}", self.md5.finalize())),
        }
    }
}

/// Fingerprints an in-memory buffer.
#[must_use]
pub fn fingerprint_bytes(bytes: &[u8]) -> LocalFingerprint {
    let mut hasher = Hasher::new();
    hasher.update(bytes);
    hasher.finish()
}

/// Fingerprints a file on the blocking thread pool.
///
/// # Errors
///
/// Returns [`StorageError::Io`] if the file cannot be opened or read to
/// the end.
pub async fn fingerprint(path: &Path) -> Result<LocalFingerprint, StorageError> {
    let owned = path.to_path_buf();
    tokio::task::spawn_blocking(move || fingerprint_sync(&owned))
        .await
        .map_err(|e| StorageError::io(path, std::io::Error::other(e)))?
}

/// Synchronous streaming fingerprint (runs in a blocking thread).
///
/// # Errors
///
/// Returns [`StorageError::Io`] if the file cannot be opened or read to
/// the end.
pub fn fingerprint_sync(path: &Path) -> Result<LocalFingerprint, StorageError> {
    let mut file = std::fs::File::open(path).map_err(|e| StorageError::io(path, e))?;
    let mut hasher = Hasher::new();
    let mut buffer = vec![0u8; CHUNK_SIZE];
    loop {
        let n = match file.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(StorageError::io(path, e)),
        };
        hasher.update(&buffer[..n]);
    }

    let fingerprint = hasher.finish();
    log::debug!(
        "fingerprinted {} ({} bytes, {})",
        path.display(),
        fingerprint.size,
        fingerprint.sha256
    );
    Ok(fingerprint)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch(name: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join("sauce_storage_fingerprint_test");
        std::fs::create_dir_all(&dir).unwrap();
        dir.join(name)
    }

    #[test]
    fn known_digests() {
        let fp = fingerprint_bytes(b"hello world");
        assert_eq!(fp.size, 11);
        assert_eq!(fp.md5.hex, "5eb63bbbe01eeed093cb22bb8f5acdc3");
        assert_eq!(
            fp.sha256.hex,
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }

    #[tokio::test]
    async fn streamed_matches_in_memory_across_chunk_boundaries() {
        let data: Vec<u8> = (0..(CHUNK_SIZE * 3 + 17))
            .map(|i| u8::try_from(i % 251).unwrap())
            .collect();
        let path = scratch("multi_chunk.bin");
        std::fs::write(&path, &data).unwrap();

        let streamed = fingerprint(&path).await.unwrap();
        assert_eq!(streamed, fingerprint_bytes(&data));

        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn empty_file_has_stable_fingerprint() {
        let path = scratch("empty.bin");
        std::fs::write(&path, b"").unwrap();

        let fp = fingerprint(&path).await.unwrap();
        assert_eq!(fp.size, 0);
        assert_eq!(fp.md5.hex, "d41d8cd98f00b204e9800998ecf8427e");

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn same_size_different_content_differs() {
        let a = fingerprint_bytes(b"report-v1");
        let b = fingerprint_bytes(b"report-v2");
        assert_eq!(a.size, b.size);
        assert!(!a.sha256.matches(&b.sha256));
        assert!(!a.md5.matches(&b.md5));
    }

    #[tokio::test]
    async fn missing_file_is_io_error() {
        let path = scratch("does_not_exist.bin");
        let _ = std::fs::remove_file(&path);

        match fingerprint(&path).await {
            Err(StorageError::Io { path: p, .. }) => assert_eq!(p, path),
            other => panic!("expected Io error, got {other:?}"),
        }
    }
}
