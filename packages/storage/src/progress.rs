//! Upload progress reporting.
//!
//! The transfer executor reports byte counts through [`TransferProgress`];
//! front ends decide how (and whether) to render them.

use std::sync::Arc;

/// Receives the lifecycle of one upload.
///
/// Implementations must be `Send + Sync`: the upload body stream reports
/// from whatever task the HTTP client polls it on. Nothing is reported
/// for operations that end without a transfer.
pub trait TransferProgress: Send + Sync {
    /// A transfer of `total` bytes to `name` is starting.
    fn begin(&self, name: &str, total: u64);

    /// A retry is sending the file again from the first byte.
    fn restart(&self);

    /// `bytes` more bytes were handed to the transport.
    fn advance(&self, bytes: u64);

    /// The transfer was stored and confirmed.
    fn complete(&self, name: &str);

    /// The transfer failed for good.
    fn abandon(&self);
}

/// A [`TransferProgress`] that ignores all updates.
pub struct NullProgress;

impl TransferProgress for NullProgress {
    fn begin(&self, _name: &str, _total: u64) {}
    fn restart(&self) {}
    fn advance(&self, _bytes: u64) {}
    fn complete(&self, _name: &str) {}
    fn abandon(&self) {}
}

/// Returns a shared [`NullProgress`].
#[must_use]
pub fn null_progress() -> Arc<dyn TransferProgress> {
    Arc::new(NullProgress)
}
