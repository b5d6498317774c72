//! Upload decision engine.
//!
//! Maps a local fingerprint and the catalog's view of the same name onto
//! an [`UploadDecision`]:
//!
//! 1. Name absent → `CREATE`.
//! 2. Sizes differ → `REPLACE` (no remote digest needed).
//! 3. Digests compared (the catalog's, or one fetched from the backend)
//!    → `SKIP` if equal, `REPLACE` otherwise.
//! 4. No digest obtainable → best effort on metadata, flagged with
//!    [`MatchBasis::Metadata`]. Equal size is only treated as a match when
//!    the caller opted in.

use sauce_storage_models::{
    ContentHash, LocalFingerprint, MatchBasis, RemoteObject, UploadDecision, Verdict,
};

use crate::{LocalFile, StorageBackend, StorageError, catalog};

/// Decides what to do with `local` given the remote state of its name.
///
/// The local fingerprint is computed (or reused) before anything else,
/// so an unreadable file fails before further network traffic.
///
/// # Errors
///
/// Returns [`StorageError::Io`] if the local file cannot be read, and
/// propagates backend errors from the digest fallback.
pub async fn decide(
    local: &LocalFile,
    remote: Option<&RemoteObject>,
    backend: &dyn StorageBackend,
    trust_metadata_match: bool,
) -> Result<Verdict, StorageError> {
    let fingerprint = local.fingerprint().await?;

    let Some(remote) = remote else {
        return Ok(absent());
    };

    let remote_hash = if fingerprint.size == remote.size {
        catalog::remote_fingerprint(backend, remote).await?
    } else {
        None
    };

    let verdict = compare(fingerprint, remote, remote_hash.as_ref(), trust_metadata_match);
    log::debug!(
        "{} vs remote {}: {} ({})",
        local.path().display(),
        remote.name,
        verdict.decision,
        verdict.basis
    );
    Ok(verdict)
}

/// Verdict for a name that does not exist remotely.
#[must_use]
pub const fn absent() -> Verdict {
    Verdict {
        decision: UploadDecision::Create,
        basis: MatchBasis::Absent,
    }
}

/// Pure comparison of a local fingerprint with an existing remote object.
///
/// `remote_hash` is the best digest known for the remote object.
#[must_use]
pub fn compare(
    local: &LocalFingerprint,
    remote: &RemoteObject,
    remote_hash: Option<&ContentHash>,
    trust_metadata_match: bool,
) -> Verdict {
    if local.size != remote.size {
        return Verdict {
            decision: UploadDecision::Replace,
            basis: MatchBasis::Size,
        };
    }

    if let Some(remote_hash) = remote_hash {
        let decision = if local.digest(remote_hash.algorithm).matches(remote_hash) {
            UploadDecision::Skip
        } else {
            UploadDecision::Replace
        };
        return Verdict {
            decision,
            basis: MatchBasis::Content,
        };
    }

    log::warn!(
        "no content digest available for {}; comparing by size only (best effort)",
        remote.name
    );
    Verdict {
        decision: if trust_metadata_match {
            UploadDecision::Skip
        } else {
            UploadDecision::Replace
        },
        basis: MatchBasis::Metadata,
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use sauce_storage_models::HashAlgorithm;

    use super::*;
    use crate::fingerprint::fingerprint_bytes;

    fn remote(name: &str, bytes: &[u8], hash: Option<ContentHash>) -> RemoteObject {
        RemoteObject {
            name: name.to_string(),
            size: bytes.len() as u64,
            modified_at: Utc::now(),
            fingerprint: hash,
        }
    }

    #[test]
    fn equal_digests_skip() {
        let local = fingerprint_bytes(b"payload");
        let obj = remote("p.bin", b"payload", Some(local.md5.clone()));
        let verdict = compare(&local, &obj, obj.fingerprint.as_ref(), false);
        assert_eq!(verdict.decision, UploadDecision::Skip);
        assert_eq!(verdict.basis, MatchBasis::Content);
    }

    #[test]
    fn sha256_remote_digests_are_compared_as_sha256() {
        let local = fingerprint_bytes(b"payload");
        let obj = remote("p.bin", b"payload", Some(local.sha256.clone()));
        let verdict = compare(&local, &obj, obj.fingerprint.as_ref(), false);
        assert_eq!(verdict.decision, UploadDecision::Skip);
    }

    #[test]
    fn same_size_different_content_replaces() {
        let local = fingerprint_bytes(b"version-1");
        let other = fingerprint_bytes(b"version-2");
        let obj = remote("v.txt", b"version-2", Some(other.md5));
        let verdict = compare(&local, &obj, obj.fingerprint.as_ref(), true);
        assert_eq!(verdict.decision, UploadDecision::Replace);
        assert_eq!(verdict.basis, MatchBasis::Content);
    }

    #[test]
    fn size_mismatch_short_circuits() {
        let local = fingerprint_bytes(b"short");
        let obj = remote("s.txt", b"much longer", None);
        let verdict = compare(&local, &obj, None, true);
        assert_eq!(verdict.decision, UploadDecision::Replace);
        assert_eq!(verdict.basis, MatchBasis::Size);
    }

    #[test]
    fn missing_digest_is_flagged_and_conservative_by_default() {
        let local = fingerprint_bytes(b"same-size");
        let obj = remote("m.bin", b"same-size", None);

        let strict = compare(&local, &obj, None, false);
        assert_eq!(strict.decision, UploadDecision::Replace);
        assert_eq!(strict.basis, MatchBasis::Metadata);

        let trusting = compare(&local, &obj, None, true);
        assert_eq!(trusting.decision, UploadDecision::Skip);
        assert_eq!(trusting.basis, MatchBasis::Metadata);
    }

    #[test]
    fn malformed_remote_digest_never_matches() {
        let local = fingerprint_bytes(b"payload");
        let bogus = ContentHash::new(HashAlgorithm::Md5, "not-a-digest");
        let obj = remote("p.bin", b"payload", Some(bogus));
        let verdict = compare(&local, &obj, obj.fingerprint.as_ref(), false);
        assert_eq!(verdict.decision, UploadDecision::Replace);
    }
}
