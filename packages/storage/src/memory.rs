//! In-memory [`StorageBackend`] used by the unit tests.
//!
//! Objects are kept in upload order (not sorted) so that ordering done by
//! the catalog is actually exercised.

use std::collections::VecDeque;
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use sauce_storage_models::{ContentHash, RemoteObject};

use crate::fingerprint::fingerprint_bytes;
use crate::{Operation, StorageBackend, StorageError, TransferProgress, UploadReceipt};

#[derive(Clone, Copy)]
enum Damage {
    FlipLastByte,
    DropLastByte,
}

struct Stored {
    name: String,
    bytes: Vec<u8>,
    modified_at: DateTime<Utc>,
}

pub struct MemoryBackend {
    objects: Mutex<Vec<Stored>>,
    uploads: AtomicU32,
    failures: Mutex<VecDeque<StorageError>>,
    listing_hashes: bool,
    verification_call: bool,
    damage: Option<Damage>,
    receipts_from_sent_bytes: bool,
    hidden_from_listing: bool,
    listing_status: Option<u16>,
    upload_delay: Option<Duration>,
    fixed_mtime: Option<DateTime<Utc>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self {
            objects: Mutex::new(Vec::new()),
            uploads: AtomicU32::new(0),
            failures: Mutex::new(VecDeque::new()),
            listing_hashes: true,
            verification_call: false,
            damage: None,
            receipts_from_sent_bytes: false,
            hidden_from_listing: false,
            listing_status: None,
            upload_delay: None,
            fixed_mtime: None,
        }
    }

    /// Listings omit digests.
    pub const fn without_listing_hashes(mut self) -> Self {
        self.listing_hashes = false;
        self
    }

    /// `content_fingerprint` answers with the stored SHA-256.
    pub const fn with_verification_call(mut self) -> Self {
        self.verification_call = true;
        self
    }

    /// Stored bytes get their last byte flipped.
    pub const fn corrupting_uploads(mut self) -> Self {
        self.damage = Some(Damage::FlipLastByte);
        self
    }

    /// Stored bytes lose their last byte.
    pub const fn truncating_uploads(mut self) -> Self {
        self.damage = Some(Damage::DropLastByte);
        self
    }

    /// Receipts describe the bytes that were sent rather than the bytes
    /// that ended up stored, and carry no digest.
    pub const fn with_receipts_from_sent_bytes(mut self) -> Self {
        self.receipts_from_sent_bytes = true;
        self
    }

    /// Listings never show any object.
    pub const fn hiding_objects_from_listing(mut self) -> Self {
        self.hidden_from_listing = true;
        self
    }

    /// Listings fail with the given HTTP status.
    pub const fn failing_listing(mut self, status: u16) -> Self {
        self.listing_status = Some(status);
        self
    }

    pub const fn with_upload_delay(mut self, delay: Duration) -> Self {
        self.upload_delay = Some(delay);
        self
    }

    /// Every stored object reports the same modification time.
    pub const fn with_fixed_mtime(mut self, mtime: DateTime<Utc>) -> Self {
        self.fixed_mtime = Some(mtime);
        self
    }

    /// Queues errors returned by the next upload attempts.
    pub fn fail_next_uploads(&self, errors: impl IntoIterator<Item = StorageError>) {
        self.failures.lock().unwrap().extend(errors);
    }

    /// Stores an object directly, bypassing the upload counter.
    pub fn insert(&self, name: &str, bytes: &[u8]) {
        self.store(name, bytes.to_vec());
    }

    pub fn upload_count(&self) -> u32 {
        self.uploads.load(Ordering::SeqCst)
    }

    pub fn stored(&self, name: &str) -> Option<Vec<u8>> {
        self.objects
            .lock()
            .unwrap()
            .iter()
            .find(|o| o.name == name)
            .map(|o| o.bytes.clone())
    }

    pub fn object_count(&self) -> usize {
        self.objects.lock().unwrap().len()
    }

    fn store(&self, name: &str, bytes: Vec<u8>) {
        let modified_at = self.fixed_mtime.unwrap_or_else(Utc::now);
        let mut objects = self.objects.lock().unwrap();
        if let Some(existing) = objects.iter_mut().find(|o| o.name == name) {
            existing.bytes = bytes;
            existing.modified_at = modified_at;
        } else {
            objects.push(Stored {
                name: name.to_string(),
                bytes,
                modified_at,
            });
        }
    }
}

#[async_trait::async_trait]
impl StorageBackend for MemoryBackend {
    async fn list(&self) -> Result<Vec<RemoteObject>, StorageError> {
        match self.listing_status {
            Some(status @ (401 | 403)) => {
                return Err(StorageError::Auth {
                    message: format!("HTTP {status}"),
                });
            }
            Some(status) => {
                return Err(StorageError::RemoteUnavailable {
                    operation: Operation::List,
                    status: Some(status),
                    message: format!("HTTP {status}"),
                });
            }
            None => {}
        }
        if self.hidden_from_listing {
            return Ok(Vec::new());
        }

        Ok(self
            .objects
            .lock()
            .unwrap()
            .iter()
            .map(|o| RemoteObject {
                name: o.name.clone(),
                size: o.bytes.len() as u64,
                modified_at: o.modified_at,
                fingerprint: self
                    .listing_hashes
                    .then(|| fingerprint_bytes(&o.bytes).md5),
            })
            .collect())
    }

    async fn content_fingerprint(&self, name: &str) -> Result<Option<ContentHash>, StorageError> {
        if !self.verification_call {
            return Ok(None);
        }
        Ok(self.stored(name).map(|bytes| fingerprint_bytes(&bytes).sha256))
    }

    async fn upload(
        &self,
        name: &str,
        path: &Path,
        _size: u64,
        progress: Arc<dyn TransferProgress>,
    ) -> Result<UploadReceipt, StorageError> {
        self.uploads.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.upload_delay {
            tokio::time::sleep(delay).await;
        }
        let failure = self.failures.lock().unwrap().pop_front();
        if let Some(err) = failure {
            return Err(err);
        }

        let mut bytes = tokio::fs::read(path)
            .await
            .map_err(|e| StorageError::io(path, e))?;
        progress.advance(bytes.len() as u64);
        let sent = bytes.len() as u64;

        match self.damage {
            Some(Damage::FlipLastByte) => {
                if let Some(last) = bytes.last_mut() {
                    *last ^= 0xff;
                }
            }
            Some(Damage::DropLastByte) => {
                bytes.pop();
            }
            None => {}
        }

        let receipt = if self.receipts_from_sent_bytes {
            UploadReceipt {
                name: name.to_string(),
                size: sent,
                fingerprint: None,
            }
        } else {
            UploadReceipt {
                name: name.to_string(),
                size: bytes.len() as u64,
                fingerprint: Some(fingerprint_bytes(&bytes).md5),
            }
        };
        self.store(name, bytes);
        Ok(receipt)
    }

    fn url_for(&self, name: &str) -> String {
        format!("memory:{name}")
    }
}
