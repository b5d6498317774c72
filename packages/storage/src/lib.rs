#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Content-addressed client for the Sauce Labs storage API.
//!
//! Uploads local files to the account's storage namespace, lists stored
//! objects, and checks whether a local file is already stored under a
//! given name.
//!
//! ## Smart upload
//!
//! [`StorageClient::update`] fingerprints the local file (SHA-256 + MD5 in
//! one streamed pass), compares it against the catalog, and only transfers
//! when the content differs. Size is used as a pre-filter; equal sizes are
//! never taken as proof of equal content. [`StorageClient::put`] always
//! transfers.
//!
//! # Environment Variables
//!
//! Read only by [`Credentials::from_env`], which front ends call once at
//! start-up:
//!
//! | Variable | Required | Description |
//! |---|---|---|
//! | `SAUCE_USERNAME` | Yes | Sauce Labs account name |
//! | `SAUCE_ACCESS_KEY` | Yes | Sauce Labs access key |
//! | `SAUCE_STORAGE_ENDPOINT` | No | Override of the storage REST endpoint |

pub mod backend;
pub mod catalog;
pub mod client;
pub mod config;
pub mod decision;
pub mod fingerprint;
pub mod local;
pub mod progress;
pub mod retry;
pub mod sauce;
pub mod transfer;

#[cfg(test)]
mod memory;

use std::path::PathBuf;
use std::time::Duration;

use strum_macros::{AsRefStr, Display};

pub use backend::{StorageBackend, UploadReceipt};
pub use client::StorageClient;
pub use config::{ClientConfig, Credentials, RetryPolicy};
pub use local::LocalFile;
pub use progress::{NullProgress, TransferProgress, null_progress};
pub use sauce_storage_models as models;

/// Network operation a failure happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum Operation {
    /// Listing the catalog.
    List,
    /// Transferring an object.
    Upload,
    /// Re-querying the catalog after a transfer.
    Confirm,
}

/// Errors that can occur during storage operations.
///
/// A missing remote object is not an error; lookups return `Option`.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Credentials are missing or were rejected by the backend.
    #[error("Authentication failed: {message}")]
    Auth {
        /// What was missing or what the backend said.
        message: String,
    },

    /// Network failure, timeout, rate limiting or a server error.
    #[error("Storage backend unavailable during {operation}: {message}")]
    RemoteUnavailable {
        /// Operation that failed.
        operation: Operation,
        /// HTTP status, when a response was received.
        status: Option<u16>,
        /// Description of the failure.
        message: String,
    },

    /// The backend definitively refused a write.
    #[error("Upload of {name} rejected (HTTP {status}): {message}")]
    UploadRejected {
        /// Remote object name.
        name: String,
        /// HTTP status returned by the backend.
        status: u16,
        /// Backend-provided detail.
        message: String,
    },

    /// A local file could not be opened or read.
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        /// File being accessed.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A transfer was accepted but the stored content does not match.
    #[error("Upload of {name} could not be confirmed: expected {expected}, found {found}")]
    Unconfirmed {
        /// Remote object name.
        name: String,
        /// Digest of the local content.
        expected: String,
        /// Digest reported by the backend.
        found: String,
    },

    /// The operation ran past its deadline and was abandoned.
    #[error("Operation exceeded its deadline of {timeout:?}")]
    DeadlineExceeded {
        /// The configured operation timeout.
        timeout: Duration,
    },
}

impl StorageError {
    /// Whether retrying the same request may succeed.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::RemoteUnavailable { .. } | Self::Unconfirmed { .. }
        )
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_network_and_confirmation_failures_are_transient() {
        let unavailable = StorageError::RemoteUnavailable {
            operation: Operation::Upload,
            status: Some(503),
            message: "HTTP 503".to_string(),
        };
        let rejected = StorageError::UploadRejected {
            name: "a.apk".to_string(),
            status: 413,
            message: "too large".to_string(),
        };
        let auth = StorageError::Auth {
            message: "bad key".to_string(),
        };

        assert!(unavailable.is_transient());
        assert!(!rejected.is_transient());
        assert!(!auth.is_transient());
    }

    #[test]
    fn operation_displays_snake_case() {
        assert_eq!(Operation::Confirm.to_string(), "confirm");
        assert_eq!(
            StorageError::RemoteUnavailable {
                operation: Operation::List,
                status: None,
                message: "connection refused".to_string(),
            }
            .to_string(),
            "Storage backend unavailable during list: connection refused"
        );
    }
}
