#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Data types shared by the Sauce Labs storage client and its front ends.
//!
//! Everything here is a plain, serializable snapshot: remote catalog
//! entries, content fingerprints, and the outcomes of the `put`, `update`
//! and `verify` operations. None of it is persisted by the client.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Digest algorithm a [`ContentHash`] was produced with.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum HashAlgorithm {
    /// MD5, the digest the storage backend reports for stored objects.
    Md5,
    /// SHA-256, the collision-resistant local identity.
    Sha256,
}

impl HashAlgorithm {
    /// Length of the lowercase hex encoding of a digest.
    #[must_use]
    pub const fn hex_len(self) -> usize {
        match self {
            Self::Md5 => 32,
            Self::Sha256 => 64,
        }
    }
}

/// A content digest, hex encoded.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentHash {
    /// Algorithm that produced the digest.
    pub algorithm: HashAlgorithm,
    /// Lowercase hex digest.
    pub hex: String,
}

impl ContentHash {
    /// Creates a hash from a hex digest as reported by a backend.
    ///
    /// Surrounding whitespace and `ETag`-style quotes are stripped and the
    /// digest is lowercased.
    #[must_use]
    pub fn new(algorithm: HashAlgorithm, hex: &str) -> Self {
        Self {
            algorithm,
            hex: hex.trim().trim_matches('"').to_ascii_lowercase(),
        }
    }

    /// Parses a backend-reported digest, rejecting values that are not a
    /// well-formed hex digest for `algorithm` (e.g. empty strings or
    /// multipart `ETag`s such as `"abc123-5"`).
    #[must_use]
    pub fn parse(algorithm: HashAlgorithm, hex: &str) -> Option<Self> {
        let hash = Self::new(algorithm, hex);
        let well_formed = hash.hex.len() == algorithm.hex_len()
            && hash.hex.bytes().all(|b| b.is_ascii_hexdigit());
        well_formed.then_some(hash)
    }

    /// Whether both digests use the same algorithm and have equal bytes.
    #[must_use]
    pub fn matches(&self, other: &Self) -> bool {
        self.algorithm == other.algorithm && self.hex == other.hex
    }
}

impl std::fmt::Display for ContentHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.algorithm, self.hex)
    }
}

/// Fingerprint of a local file, computed in a single streaming pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalFingerprint {
    /// Number of bytes hashed.
    pub size: u64,
    /// SHA-256 digest of the content.
    pub sha256: ContentHash,
    /// MD5 digest of the content (comparable with backend listings).
    pub md5: ContentHash,
}

impl LocalFingerprint {
    /// Returns the digest computed with `algorithm`.
    #[must_use]
    pub const fn digest(&self, algorithm: HashAlgorithm) -> &ContentHash {
        match algorithm {
            HashAlgorithm::Md5 => &self.md5,
            HashAlgorithm::Sha256 => &self.sha256,
        }
    }
}

/// An object in the remote storage namespace.
///
/// `name` is the only identity key; there is no path hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteObject {
    /// Object name, unique within the account's namespace.
    pub name: String,
    /// Size in bytes.
    pub size: u64,
    /// Last modification time reported by the backend.
    pub modified_at: DateTime<Utc>,
    /// Content digest, when the backend exposes one.
    pub fingerprint: Option<ContentHash>,
}

/// What the decision engine concluded for a local file and a remote name.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum UploadDecision {
    /// Identical content is already stored under the name.
    Skip,
    /// The name exists but holds different content.
    Replace,
    /// The name does not exist remotely.
    Create,
}

impl UploadDecision {
    /// Whether this decision requires a transfer.
    #[must_use]
    pub const fn needs_transfer(self) -> bool {
        !matches!(self, Self::Skip)
    }
}

/// Evidence a decision was based on.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MatchBasis {
    /// No remote object with that name.
    Absent,
    /// Sizes differ, so the content cannot be identical.
    Size,
    /// Content digests were compared.
    Content,
    /// No remote digest was obtainable; only size/mtime were compared.
    /// Such a result is best effort, not proof of identical content.
    Metadata,
}

/// Decision together with the evidence it rests on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    /// The chosen action.
    pub decision: UploadDecision,
    /// What the decision was based on.
    pub basis: MatchBasis,
}

/// Result of an unconditional upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PutOutcome {
    /// Remote object name.
    pub name: String,
    /// URL that refers to the stored object.
    pub url: String,
    /// Fingerprint of the uploaded content.
    pub fingerprint: LocalFingerprint,
}

/// Result of a conditional upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateOutcome {
    /// Remote object name.
    pub name: String,
    /// URL that refers to the stored object.
    pub url: String,
    /// `true` when no transfer happened because the content was present.
    pub skipped: bool,
    /// The decision and its basis.
    pub verdict: Verdict,
    /// Fingerprint of the local content.
    pub fingerprint: LocalFingerprint,
}

/// Result of comparing a local file with a remote object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyOutcome {
    /// Remote object name that was checked.
    pub name: String,
    /// `true` iff identical content is stored under `name`.
    pub verified: bool,
    /// The decision and its basis.
    pub verdict: Verdict,
}
