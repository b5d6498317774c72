//! Read-only access to the remote catalog.

use sauce_storage_models::{ContentHash, RemoteObject};

use crate::{StorageBackend, StorageError};

/// Lists all remote objects sorted by name, ascending.
///
/// Nothing is cached: every call re-queries the backend.
///
/// # Errors
///
/// Propagates [`StorageError::Auth`] and [`StorageError::RemoteUnavailable`]
/// from the backend unchanged.
pub async fn list_all(backend: &dyn StorageBackend) -> Result<Vec<RemoteObject>, StorageError> {
    let mut objects = backend.list().await?;
    objects.sort_by(|a, b| a.name.cmp(&b.name));
    log::debug!("catalog holds {} object(s)", objects.len());
    Ok(objects)
}

/// Looks up `name`; `Ok(None)` means the name is absent.
///
/// # Errors
///
/// Same as [`list_all`].
pub async fn find(
    backend: &dyn StorageBackend,
    name: &str,
) -> Result<Option<RemoteObject>, StorageError> {
    backend.find(name).await
}

/// Returns the remote object's digest, asking the backend for one when
/// the catalog entry does not carry it.
///
/// # Errors
///
/// Same as [`list_all`].
pub async fn remote_fingerprint(
    backend: &dyn StorageBackend,
    remote: &RemoteObject,
) -> Result<Option<ContentHash>, StorageError> {
    if let Some(hash) = &remote.fingerprint {
        return Ok(Some(hash.clone()));
    }
    log::debug!(
        "catalog entry for {} has no digest, asking the backend",
        remote.name
    );
    backend.content_fingerprint(&remote.name).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryBackend;

    #[tokio::test]
    async fn list_is_sorted_regardless_of_upload_order() {
        let backend = MemoryBackend::new();
        for name in ["zeta.apk", "alpha.zip", "Mid.ipa", "beta.zip"] {
            backend.insert(name, name.as_bytes());
        }

        let names: Vec<String> = list_all(&backend)
            .await
            .unwrap()
            .into_iter()
            .map(|o| o.name)
            .collect();
        assert_eq!(names, ["Mid.ipa", "alpha.zip", "beta.zip", "zeta.apk"]);
    }

    #[tokio::test]
    async fn find_distinguishes_absent_names() {
        let backend = MemoryBackend::new();
        backend.insert("present.bin", b"data");

        assert!(find(&backend, "present.bin").await.unwrap().is_some());
        assert!(find(&backend, "missing.bin").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn remote_fingerprint_falls_back_to_backend_call() {
        let backend = MemoryBackend::new().without_listing_hashes();
        backend.insert("a.bin", b"abc");
        let remote = find(&backend, "a.bin").await.unwrap().unwrap();
        assert!(remote.fingerprint.is_none());
        assert!(remote_fingerprint(&backend, &remote).await.unwrap().is_none());

        let backend = MemoryBackend::new()
            .without_listing_hashes()
            .with_verification_call();
        backend.insert("a.bin", b"abc");
        let remote = find(&backend, "a.bin").await.unwrap().unwrap();
        assert!(remote_fingerprint(&backend, &remote).await.unwrap().is_some());
    }
}
