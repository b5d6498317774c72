//! Failure classification and bounded retry for storage requests.
//!
//! Every HTTP failure is mapped onto the [`StorageError`] taxonomy by
//! [`status_error`] / [`transport_error`]. Only uploads are retried, via
//! [`with_retry`]; reads surface their first failure so the caller
//! decides.
//!
//! # Classification
//!
//! | Failure | Result |
//! |---|---|
//! | connect, timeout, body, request transport errors | transient |
//! | HTTP 429, HTTP 5xx | transient |
//! | HTTP 401, HTTP 403 | [`StorageError::Auth`] |
//! | other HTTP 4xx on upload | [`StorageError::UploadRejected`] |
//! | other HTTP 4xx on reads | [`StorageError::RemoteUnavailable`] |

use std::future::Future;

use crate::{Operation, RetryPolicy, StorageError};

/// Maximum length of the response body preview kept in error messages.
const BODY_PREVIEW_LEN: usize = 500;

/// Maps a non-success HTTP status onto the error taxonomy.
///
/// `name` is the object being written, if any; rejections of writes
/// carry it.
#[must_use]
pub fn status_error(
    status: u16,
    operation: Operation,
    name: Option<&str>,
    body: &str,
) -> StorageError {
    let message = preview(body, status);

    match status {
        401 | 403 => StorageError::Auth { message },
        429 | 500..=599 => StorageError::RemoteUnavailable {
            operation,
            status: Some(status),
            message,
        },
        _ => match (operation, name) {
            (Operation::Upload, Some(name)) => StorageError::UploadRejected {
                name: name.to_string(),
                status,
                message,
            },
            _ => StorageError::RemoteUnavailable {
                operation,
                status: Some(status),
                message,
            },
        },
    }
}

/// Maps a transport-level `reqwest` failure onto the error taxonomy.
#[must_use]
pub fn transport_error(operation: Operation, e: &reqwest::Error) -> StorageError {
    if let Some(status) = e.status() {
        return status_error(status.as_u16(), operation, None, &e.to_string());
    }
    StorageError::RemoteUnavailable {
        operation,
        status: None,
        message: e.to_string(),
    }
}

/// Returns the response if its status is a success, otherwise reads the
/// body for context and classifies the status.
///
/// # Errors
///
/// See [`status_error`].
pub async fn check_status(
    response: reqwest::Response,
    operation: Operation,
    name: Option<&str>,
) -> Result<reqwest::Response, StorageError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    log::debug!("{operation} failed with HTTP {status}: {body}");
    Err(status_error(status.as_u16(), operation, name, &body))
}

/// Runs `attempt` until it succeeds, fails definitively, or the policy is
/// exhausted.
///
/// `attempt` receives the 1-based attempt number. Only errors for which
/// [`StorageError::is_transient`] holds are retried, with exponential
/// backoff. A retry is abandoned rather than started when its delay would
/// carry the loop past [`RetryPolicy::max_elapsed`]. The last error is
/// returned unchanged.
///
/// # Errors
///
/// Returns the first non-transient error, or the last transient one once
/// attempts or time run out.
pub async fn with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    label: &str,
    mut attempt: F,
) -> Result<T, StorageError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, StorageError>>,
{
    let started = tokio::time::Instant::now();
    let max_attempts = policy.max_attempts.max(1);

    for attempt_no in 1..=max_attempts {
        let err = match attempt(attempt_no).await {
            Ok(value) => return Ok(value),
            Err(e) => e,
        };

        if !err.is_transient() || attempt_no == max_attempts {
            if err.is_transient() {
                log::warn!("  {label}: giving up after {attempt_no} attempt(s): {err}");
            }
            return Err(err);
        }

        let delay = policy.delay_after(attempt_no);
        if started.elapsed() + delay > policy.max_elapsed {
            log::warn!(
                "  {label}: retry budget of {:?} exhausted after {attempt_no} attempt(s): {err}",
                policy.max_elapsed
            );
            return Err(err);
        }

        log::warn!(
            "  {label}: attempt {attempt_no}/{max_attempts} failed ({err}), retrying in {delay:.1?}..."
        );
        tokio::time::sleep(delay).await;
    }

    unreachable!("with_retry loop exited without returning")
}

fn preview(body: &str, status: u16) -> String {
    let body = body.trim();
    if body.is_empty() {
        return format!("HTTP {status}");
    }
    if body.len() > BODY_PREVIEW_LEN {
        let mut end = BODY_PREVIEW_LEN;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &body[..end])
    } else {
        body.to_string()
    }
}
