//! Local file descriptor with a memoised fingerprint.

use std::path::{Path, PathBuf};

use sauce_storage_models::LocalFingerprint;
use tokio::sync::OnceCell;

use crate::{StorageError, fingerprint};

/// A local file about to be compared with or uploaded to storage.
///
/// The fingerprint is computed on first use and then reused for the life
/// of the descriptor, including across a caller's retry after a cancelled
/// or failed operation.
#[derive(Debug)]
pub struct LocalFile {
    path: PathBuf,
    name: String,
    fingerprint: OnceCell<LocalFingerprint>,
}

impl LocalFile {
    /// Resolves `path` to an absolute path and names the remote object
    /// after the file's base name.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Io`] if the path does not exist or is not a
    /// regular file.
    pub fn new(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref();
        let absolute = std::fs::canonicalize(path).map_err(|e| StorageError::io(path, e))?;
        let metadata = std::fs::metadata(&absolute).map_err(|e| StorageError::io(path, e))?;
        if !metadata.is_file() {
            return Err(StorageError::io(
                path,
                std::io::Error::new(std::io::ErrorKind::InvalidInput, "not a regular file"),
            ));
        }

        let name = absolute
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| {
                StorageError::io(
                    path,
                    std::io::Error::new(std::io::ErrorKind::InvalidInput, "path has no file name"),
                )
            })?;

        Ok(Self {
            path: absolute,
            name,
            fingerprint: OnceCell::new(),
        })
    }

    /// Overrides the remote object name. `None` or an empty name keeps the
    /// base name.
    #[must_use]
    pub fn with_name(mut self, name: Option<impl Into<String>>) -> Self {
        if let Some(name) = name.map(Into::<String>::into).filter(|n| !n.is_empty()) {
            self.name = name;
        }
        self
    }

    /// Absolute path of the file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Name the file is stored under remotely.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the fingerprint, computing it on first call.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Io`] if the file cannot be read.
    pub async fn fingerprint(&self) -> Result<&LocalFingerprint, StorageError> {
        self.fingerprint
            .get_or_try_init(|| fingerprint::fingerprint(&self.path))
            .await
    }

    /// The fingerprint, if it has already been computed.
    #[must_use]
    pub fn cached_fingerprint(&self) -> Option<&LocalFingerprint> {
        self.fingerprint.get()
    }
}
