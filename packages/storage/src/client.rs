//! The storage client facade.
//!
//! [`StorageClient`] is the only surface front ends use. It composes the
//! fingerprinter, catalog, decision engine and transfer executor into
//! `list`, `put`, `update` and `verify`, and passes their typed errors
//! through untouched.

use std::future::Future;
use std::sync::Arc;

use sauce_storage_models::{PutOutcome, RemoteObject, UpdateOutcome, VerifyOutcome};

use crate::sauce::SauceBackend;
use crate::transfer::TransferExecutor;
use crate::{
    ClientConfig, Credentials, LocalFile, StorageBackend, StorageError, TransferProgress,
    catalog, decision, null_progress,
};

/// Content-aware client for one storage namespace.
///
/// Holds no mutable state besides the configuration it was built with, so
/// a shared reference can serve concurrent operations.
pub struct StorageClient {
    backend: Arc<dyn StorageBackend>,
    config: ClientConfig,
    progress: Arc<dyn TransferProgress>,
}

impl StorageClient {
    /// Creates a client talking to the Sauce Labs storage API.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::RemoteUnavailable`] if the HTTP client
    /// cannot be constructed.
    pub fn new(credentials: Credentials, config: ClientConfig) -> Result<Self, StorageError> {
        let backend = SauceBackend::new(credentials, config.request_timeout)?;
        Ok(Self::with_backend(Arc::new(backend), config))
    }

    /// Creates a client over an arbitrary backend.
    #[must_use]
    pub fn with_backend(backend: Arc<dyn StorageBackend>, config: ClientConfig) -> Self {
        Self {
            backend,
            config,
            progress: null_progress(),
        }
    }

    /// Reports upload progress to `progress`.
    #[must_use]
    pub fn with_progress(mut self, progress: Arc<dyn TransferProgress>) -> Self {
        self.progress = progress;
        self
    }

    /// The configuration in effect.
    #[must_use]
    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Lists stored objects sorted by name.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Auth`], [`StorageError::RemoteUnavailable`]
    /// or [`StorageError::DeadlineExceeded`].
    pub async fn list(&self) -> Result<Vec<RemoteObject>, StorageError> {
        self.bounded(catalog::list_all(self.backend.as_ref())).await
    }

    /// Uploads `file` unconditionally.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Io`] before any network call if the file is
    /// unreadable, otherwise whatever the transfer executor surfaces.
    pub async fn put(&self, file: &LocalFile) -> Result<PutOutcome, StorageError> {
        self.bounded(async {
            let fingerprint = file.fingerprint().await?.clone();
            let name = file.name();
            self.executor().upload(file, name).await?;

            Ok(PutOutcome {
                name: name.to_string(),
                url: self.backend.url_for(name),
                fingerprint,
            })
        })
        .await
    }

    /// Uploads `file` only if its content is not already stored under its
    /// name.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Io`] before any network call if the file is
    /// unreadable, read errors from the catalog, or whatever the transfer
    /// executor surfaces.
    pub async fn update(&self, file: &LocalFile) -> Result<UpdateOutcome, StorageError> {
        self.bounded(async {
            let fingerprint = file.fingerprint().await?.clone();
            let name = file.name();
            let remote = catalog::find(self.backend.as_ref(), name).await?;
            let verdict = decision::decide(
                file,
                remote.as_ref(),
                self.backend.as_ref(),
                self.config.trust_metadata_match,
            )
            .await?;

            let skipped = !verdict.decision.needs_transfer();
            if skipped {
                log::info!(
                    "  {} -> {name}: skipped (unchanged)",
                    file.path().display()
                );
            } else {
                log::debug!("{name}: {}", verdict.decision);
                self.executor().upload(file, name).await?;
            }

            Ok(UpdateOutcome {
                name: name.to_string(),
                url: self.backend.url_for(name),
                skipped,
                verdict,
                fingerprint,
            })
        })
        .await
    }

    /// Compares `file` with the object stored under its name without ever
    /// transferring. An absent name is "not verified", not an error.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Io`] if the file is unreadable, or read
    /// errors from the catalog.
    pub async fn verify(&self, file: &LocalFile) -> Result<VerifyOutcome, StorageError> {
        self.bounded(async {
            file.fingerprint().await?;
            let name = file.name();
            let remote = catalog::find(self.backend.as_ref(), name).await?;
            let verdict = decision::decide(
                file,
                remote.as_ref(),
                self.backend.as_ref(),
                self.config.trust_metadata_match,
            )
            .await?;

            Ok(VerifyOutcome {
                name: name.to_string(),
                verified: !verdict.decision.needs_transfer(),
                verdict,
            })
        })
        .await
    }

    /// `true` iff identical content is stored under the file's name.
    ///
    /// # Errors
    ///
    /// Same as [`Self::verify`].
    pub async fn is_verified(&self, file: &LocalFile) -> Result<bool, StorageError> {
        Ok(self.verify(file).await?.verified)
    }

    fn executor(&self) -> TransferExecutor<'_> {
        TransferExecutor::new(
            self.backend.as_ref(),
            self.config.retry.bounded_by(self.config.operation_timeout),
            self.progress.clone(),
        )
    }

    /// Applies the operation deadline, if any. The inner future is dropped
    /// on expiry, abandoning any in-flight request.
    async fn bounded<T>(
        &self,
        operation: impl Future<Output = Result<T, StorageError>>,
    ) -> Result<T, StorageError> {
        match self.config.operation_timeout {
            Some(timeout) => tokio::time::timeout(timeout, operation)
                .await
                .map_err(|_| StorageError::DeadlineExceeded { timeout })?,
            None => operation.await,
        }
    }
}
