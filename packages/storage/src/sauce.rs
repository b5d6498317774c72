//! Sauce Labs storage REST backend.
//!
//! | Operation | Request |
//! |---|---|
//! | list | `GET {endpoint}/{username}` |
//! | upload | `POST {endpoint}/{username}/{name}?overwrite=true` (octet-stream body) |
//!
//! Requests use HTTP basic auth. There is no per-object metadata
//! endpoint, so lookups filter the listing. Stored objects are referred to
//! as `sauce-storage:{name}`.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::StreamExt as _;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use sauce_storage_models::{ContentHash, HashAlgorithm, RemoteObject};
use serde::Deserialize;
use tokio_util::io::ReaderStream;

use crate::fingerprint::CHUNK_SIZE;
use crate::retry::{check_status, transport_error};
use crate::{
    Credentials, Operation, StorageBackend, StorageError, TransferProgress, UploadReceipt,
};

/// URL scheme for stored objects.
pub const URL_SCHEME: &str = "sauce-storage";

/// Client for one account's Sauce Labs storage namespace.
pub struct SauceBackend {
    client: reqwest::Client,
    credentials: Credentials,
}

impl SauceBackend {
    /// Creates a backend; no request is made until first use.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::RemoteUnavailable`] if the HTTP client
    /// cannot be constructed (e.g. TLS backend initialisation failure).
    pub fn new(
        credentials: Credentials,
        request_timeout: Option<Duration>,
    ) -> Result<Self, StorageError> {
        let mut builder = reqwest::Client::builder()
            .user_agent(concat!("sauce-storage/", env!("CARGO_PKG_VERSION")));
        if let Some(timeout) = request_timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(|e| StorageError::RemoteUnavailable {
            operation: Operation::List,
            status: None,
            message: format!("failed to build HTTP client: {e}"),
        })?;

        Ok(Self {
            client,
            credentials,
        })
    }

    fn namespace_url(&self) -> String {
        format!(
            "{}/{}",
            self.credentials.endpoint(),
            urlencoding::encode(self.credentials.username())
        )
    }

    fn object_url(&self, name: &str) -> String {
        format!("{}/{}", self.namespace_url(), urlencoding::encode(name))
    }
}

/// Body of the list response.
#[derive(Debug, Deserialize)]
struct ListResponse {
    #[serde(default)]
    files: Vec<StoredFile>,
}

/// One entry of the list response.
#[derive(Debug, Deserialize)]
struct StoredFile {
    name: String,
    #[serde(default)]
    size: u64,
    /// Unix seconds, possibly fractional.
    #[serde(default)]
    mtime: f64,
    #[serde(default)]
    md5: Option<String>,
}

impl StoredFile {
    fn into_remote_object(self) -> RemoteObject {
        RemoteObject {
            modified_at: unix_to_datetime(self.mtime),
            fingerprint: self
                .md5
                .as_deref()
                .and_then(|md5| ContentHash::parse(HashAlgorithm::Md5, md5)),
            size: self.size,
            name: self.name,
        }
    }
}

/// Body of the upload response.
#[derive(Debug, Deserialize)]
struct UploadResponse {
    filename: Option<String>,
    size: Option<u64>,
    md5: Option<String>,
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)] // clamped below
fn unix_to_datetime(secs: f64) -> DateTime<Utc> {
    if !secs.is_finite() || secs < 0.0 {
        return DateTime::<Utc>::default();
    }
    let whole = secs.trunc();
    let nanos = ((secs - whole) * 1e9).round().min(999_999_999.0) as u32;
    DateTime::from_timestamp(whole as i64, nanos).unwrap_or_default()
}

fn parse_listing(body: &str) -> Result<Vec<RemoteObject>, StorageError> {
    let response: ListResponse =
        serde_json::from_str(body).map_err(|e| StorageError::RemoteUnavailable {
            operation: Operation::List,
            status: None,
            message: format!("malformed listing: {e}"),
        })?;
    Ok(response
        .files
        .into_iter()
        .map(StoredFile::into_remote_object)
        .collect())
}

fn parse_receipt(name: &str, size: u64, body: &str) -> UploadReceipt {
    match serde_json::from_str::<UploadResponse>(body) {
        Ok(response) => UploadReceipt {
            name: response.filename.unwrap_or_else(|| name.to_string()),
            size: response.size.unwrap_or(size),
            fingerprint: response
                .md5
                .as_deref()
                .and_then(|md5| ContentHash::parse(HashAlgorithm::Md5, md5)),
        },
        Err(e) => {
            log::warn!("  unexpected upload response for {name} ({e}); trusting status code");
            UploadReceipt {
                name: name.to_string(),
                size,
                fingerprint: None,
            }
        }
    }
}

#[async_trait::async_trait]
impl StorageBackend for SauceBackend {
    async fn list(&self) -> Result<Vec<RemoteObject>, StorageError> {
        let url = self.namespace_url();
        log::debug!("Listing {url}");

        let response = self
            .client
            .get(&url)
            .basic_auth(self.credentials.username(), Some(self.credentials.access_key()))
            .send()
            .await
            .map_err(|e| transport_error(Operation::List, &e))?;
        let response = check_status(response, Operation::List, None).await?;
        let body = response
            .text()
            .await
            .map_err(|e| transport_error(Operation::List, &e))?;

        let objects = parse_listing(&body)?;
        log::debug!("  found {} objects", objects.len());
        Ok(objects)
    }

    async fn upload(
        &self,
        name: &str,
        path: &Path,
        size: u64,
        progress: Arc<dyn TransferProgress>,
    ) -> Result<UploadReceipt, StorageError> {
        let file = tokio::fs::File::open(path)
            .await
            .map_err(|e| StorageError::io(path, e))?;

        let stream = ReaderStream::with_capacity(file, CHUNK_SIZE).inspect(move |chunk| {
            if let Ok(bytes) = chunk {
                progress.advance(bytes.len() as u64);
            }
        });

        let response = self
            .client
            .post(self.object_url(name))
            .query(&[("overwrite", "true")])
            .basic_auth(self.credentials.username(), Some(self.credentials.access_key()))
            .header(CONTENT_TYPE, "application/octet-stream")
            .header(CONTENT_LENGTH, size)
            .body(reqwest::Body::wrap_stream(stream))
            .send()
            .await
            .map_err(|e| transport_error(Operation::Upload, &e))?;
        let response = check_status(response, Operation::Upload, Some(name)).await?;
        let body = response
            .text()
            .await
            .map_err(|e| transport_error(Operation::Upload, &e))?;

        Ok(parse_receipt(name, size, &body))
    }

    fn url_for(&self, name: &str) -> String {
        format!("{URL_SCHEME}:{name}")
    }
}
