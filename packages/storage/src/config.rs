//! Credentials and client configuration.
//!
//! Both are plain values built once by the caller and handed to
//! [`crate::StorageClient`]; nothing in the core reads the environment.

use std::time::Duration;

use crate::StorageError;

/// Default Sauce Labs storage REST endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://saucelabs.com/rest/v1/storage";

/// Environment variable holding the account name.
pub const USERNAME_VAR: &str = "SAUCE_USERNAME";

/// Environment variable holding the access key.
pub const ACCESS_KEY_VAR: &str = "SAUCE_ACCESS_KEY";

/// Environment variable overriding [`DEFAULT_ENDPOINT`].
pub const ENDPOINT_VAR: &str = "SAUCE_STORAGE_ENDPOINT";

/// Account credentials and the endpoint they apply to.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    username: String,
    access_key: String,
    endpoint: String,
}

impl Credentials {
    /// Creates credentials for `endpoint`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Auth`] if the username or access key is
    /// empty.
    pub fn new(
        username: impl Into<String>,
        access_key: impl Into<String>,
        endpoint: impl Into<String>,
    ) -> Result<Self, StorageError> {
        let username = username.into().trim().to_string();
        let access_key = access_key.into().trim().to_string();
        let endpoint = endpoint.into().trim().trim_end_matches('/').to_string();

        if username.is_empty() {
            return Err(StorageError::Auth {
                message: "no username configured".to_string(),
            });
        }
        if access_key.is_empty() {
            return Err(StorageError::Auth {
                message: "no access key configured".to_string(),
            });
        }

        let endpoint = if endpoint.is_empty() {
            DEFAULT_ENDPOINT.to_string()
        } else {
            endpoint
        };

        Ok(Self {
            username,
            access_key,
            endpoint,
        })
    }

    /// Reads credentials from `SAUCE_USERNAME`, `SAUCE_ACCESS_KEY` and the
    /// optional `SAUCE_STORAGE_ENDPOINT`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Auth`] naming the first missing variable.
    pub fn from_env() -> Result<Self, StorageError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds credentials from an arbitrary variable lookup, so callers can
    /// layer flags over the environment.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Auth`] naming the first missing variable.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, StorageError> {
        let require = |name: &str| {
            lookup(name)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| StorageError::Auth {
                    message: format!("missing environment variable {name}"),
                })
        };

        let username = require(USERNAME_VAR)?;
        let access_key = require(ACCESS_KEY_VAR)?;
        let endpoint = lookup(ENDPOINT_VAR).unwrap_or_default();

        Self::new(username, access_key, endpoint)
    }

    /// Account name.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Access key.
    #[must_use]
    pub fn access_key(&self) -> &str {
        &self.access_key
    }

    /// Endpoint without a trailing slash.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("access_key", &"<redacted>")
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

/// Bounded exponential backoff for transient upload failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles for each further one.
    pub base_delay: Duration,
    /// Upper bound for a single delay.
    pub max_delay: Duration,
    /// Wall-clock budget for the whole retry loop. No sleep starts that
    /// would end past it.
    pub max_elapsed: Duration,
}

impl RetryPolicy {
    /// Delay to wait after failed attempt number `attempt` (1-based).
    #[must_use]
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }

    /// Returns a copy whose wall-clock budget does not exceed `limit`.
    #[must_use]
    pub fn bounded_by(mut self, limit: Option<Duration>) -> Self {
        if let Some(limit) = limit {
            self.max_elapsed = self.max_elapsed.min(limit);
        }
        self
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            max_elapsed: Duration::from_secs(120),
        }
    }
}

/// Tunables for [`crate::StorageClient`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientConfig {
    /// Retry behaviour for uploads.
    pub retry: RetryPolicy,
    /// Timeout for each HTTP request.
    pub request_timeout: Option<Duration>,
    /// Deadline for each facade operation as a whole.
    pub operation_timeout: Option<Duration>,
    /// When no remote digest can be obtained, treat equal sizes as a
    /// match. Off by default: such comparisons are only best effort.
    pub trust_metadata_match: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            request_timeout: Some(Duration::from_secs(300)),
            operation_timeout: None,
            trust_metadata_match: false,
        }
    }
}
