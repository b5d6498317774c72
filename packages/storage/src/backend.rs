//! Storage backend abstraction.
//!
//! A [`StorageBackend`] performs single network operations against an
//! object store: list, look up, upload once. It never retries; the
//! transfer executor layers retry and confirmation on top.

use std::path::Path;
use std::sync::Arc;

use sauce_storage_models::{ContentHash, RemoteObject};

use crate::{StorageError, TransferProgress};

/// What the backend reported after accepting an upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReceipt {
    /// Name the object was stored under.
    pub name: String,
    /// Size the backend recorded.
    pub size: u64,
    /// Digest the backend computed over the received bytes, if reported.
    pub fingerprint: Option<ContentHash>,
}

/// Operations a remote object store must provide.
#[async_trait::async_trait]
pub trait StorageBackend: Send + Sync {
    /// Lists every object in the namespace, in backend order.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Auth`] if the credentials are rejected and
    /// [`StorageError::RemoteUnavailable`] on any other failure.
    async fn list(&self) -> Result<Vec<RemoteObject>, StorageError>;

    /// Looks up one object by name.
    ///
    /// The default implementation filters [`Self::list`].
    ///
    /// # Errors
    ///
    /// Same as [`Self::list`].
    async fn find(&self, name: &str) -> Result<Option<RemoteObject>, StorageError> {
        Ok(self.list().await?.into_iter().find(|o| o.name == name))
    }

    /// Obtains a content digest for an object whose catalog entry lacks
    /// one (a dedicated verification call, or download-and-hash).
    ///
    /// Returns `Ok(None)` when the backend offers no such facility, which
    /// is the default.
    ///
    /// # Errors
    ///
    /// Same as [`Self::list`].
    async fn content_fingerprint(&self, _name: &str) -> Result<Option<ContentHash>, StorageError> {
        Ok(None)
    }

    /// Streams the file at `path` to the object `name`, replacing any
    /// existing object. Makes exactly one attempt.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Io`] if the file cannot be read,
    /// [`StorageError::Auth`] or [`StorageError::UploadRejected`] on a
    /// definitive refusal, and [`StorageError::RemoteUnavailable`] on a
    /// transient failure.
    async fn upload(
        &self,
        name: &str,
        path: &Path,
        size: u64,
        progress: Arc<dyn TransferProgress>,
    ) -> Result<UploadReceipt, StorageError>;

    /// URL by which callers refer to the stored object `name`.
    fn url_for(&self, name: &str) -> String;
}
