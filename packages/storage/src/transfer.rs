//! Transfer executor: streamed upload with retry and confirmation.

use std::sync::Arc;

use sauce_storage_models::{ContentHash, LocalFingerprint};

use crate::{
    LocalFile, Operation, RetryPolicy, StorageBackend, StorageError, TransferProgress,
    UploadReceipt, retry,
};

/// Uploads files through a [`StorageBackend`].
///
/// Transient failures (transport errors, 429, 5xx, failed confirmation)
/// are retried per the [`RetryPolicy`]; definitive rejections surface
/// immediately.
pub struct TransferExecutor<'a> {
    backend: &'a dyn StorageBackend,
    policy: RetryPolicy,
    progress: Arc<dyn TransferProgress>,
}

impl<'a> TransferExecutor<'a> {
    /// Creates an executor over `backend`.
    #[must_use]
    pub fn new(
        backend: &'a dyn StorageBackend,
        policy: RetryPolicy,
        progress: Arc<dyn TransferProgress>,
    ) -> Self {
        Self {
            backend,
            policy,
            progress,
        }
    }

    /// Uploads `local` as `name` and confirms the stored content.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Io`] if the file cannot be read,
    /// [`StorageError::Auth`] / [`StorageError::UploadRejected`] on a
    /// definitive refusal, and the last transient error
    /// ([`StorageError::RemoteUnavailable`] or
    /// [`StorageError::Unconfirmed`]) once retries are exhausted.
    pub async fn upload(
        &self,
        local: &LocalFile,
        name: &str,
    ) -> Result<UploadReceipt, StorageError> {
        let fingerprint = local.fingerprint().await?;

        #[allow(clippy::cast_precision_loss)] // display-only MB value
        let mb = fingerprint.size as f64 / 1_048_576.0;
        log::info!(
            "Pushing {} -> {name} ({mb:.1} MB)",
            local.path().display()
        );

        self.progress.begin(name, fingerprint.size);

        let receipt = retry::with_retry(&self.policy, name, |attempt| async move {
            if attempt > 1 {
                self.progress.restart();
            }
            let receipt = self
                .backend
                .upload(name, local.path(), fingerprint.size, self.progress.clone())
                .await?;
            self.confirm(name, fingerprint, &receipt).await?;
            Ok(receipt)
        })
        .await;

        match &receipt {
            Ok(_) => self.progress.complete(name),
            Err(_) => self.progress.abandon(),
        }

        let receipt = receipt?;
        log::info!("  uploaded {name}");
        Ok(receipt)
    }

    /// Checks that the backend holds the content that was sent.
    ///
    /// The receipt's digest must match. The catalog is then re-queried;
    /// if it cannot be queried, or does not show the object or its digest
    /// yet, the transfer response is trusted.
    async fn confirm(
        &self,
        name: &str,
        local: &LocalFingerprint,
        receipt: &UploadReceipt,
    ) -> Result<(), StorageError> {
        if let Some(reported) = &receipt.fingerprint {
            ensure_match(name, local, reported)?;
        }

        match self.backend.find(name).await {
            Ok(Some(remote)) => {
                if let Some(stored) = &remote.fingerprint {
                    ensure_match(name, local, stored)?;
                } else if remote.size != local.size {
                    return Err(StorageError::Unconfirmed {
                        name: name.to_string(),
                        expected: format!("{} bytes", local.size),
                        found: format!("{} bytes", remote.size),
                    });
                }
                Ok(())
            }
            Ok(None) => {
                log::warn!("  {name} not yet visible in the catalog; trusting transfer response");
                Ok(())
            }
            Err(e @ StorageError::Auth { .. }) => Err(e),
            Err(e) => {
                log::warn!(
                    "  could not {} {name} ({e}); trusting transfer response",
                    Operation::Confirm
                );
                Ok(())
            }
        }
    }
}

fn ensure_match(
    name: &str,
    local: &LocalFingerprint,
    remote: &ContentHash,
) -> Result<(), StorageError> {
    let expected = local.digest(remote.algorithm);
    if expected.matches(remote) {
        Ok(())
    } else {
        Err(StorageError::Unconfirmed {
            name: name.to_string(),
            expected: expected.to_string(),
            found: remote.to_string(),
        })
    }
}
