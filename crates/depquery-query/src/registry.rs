//! Registry metadata client for `:outdated` and `:published`.
//!
//! Fetches packuments (`GET {registry}{name}`) with bounded retries and
//! doubling backoff. Every request and every backoff sleep races the query's
//! cancellation token. Failures come back as [`RemoteLookup::Unavailable`]
//! so callers can degrade instead of failing the query.

use crate::error::QueryError;
use parking_lot::Mutex;
use reqwest::header::ACCEPT;
use reqwest::{Client, StatusCode};
use serde::de::IgnoredAny;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Default maximum retry attempts for transient failures
pub const DEFAULT_RETRIES: u32 = 3;

/// Base delay for exponential backoff (milliseconds)
pub const RETRY_BASE_DELAY_MS: u64 = 500;

/// Abbreviated metadata: versions and dist-tags only
const ABBREVIATED_ACCEPT: &str =
    "application/vnd.npm.install-v1+json; q=1.0, application/json; q=0.8, */*";

const FULL_ACCEPT: &str = "application/json";

/// Registry request failures.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RegistryError {
    /// The registry does not know the package
    #[error("package not found in registry: {0}")]
    NotFound(String),

    /// Unexpected HTTP status
    #[error("registry returned {status} for {url}")]
    Status { status: u16, url: String },

    /// Transport failure (connect, timeout, ...)
    #[error("registry request failed: {0}")]
    Request(String),

    /// Body could not be decoded as a packument
    #[error("invalid registry response: {0}")]
    InvalidResponse(String),
}

impl RegistryError {
    /// Transport errors, timeouts, throttling and server errors are retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            RegistryError::Request(_) => true,
            RegistryError::Status { status, .. } => {
                matches!(*status, 408 | 429) || (*status >= 500 && *status != 501)
            }
            RegistryError::NotFound(_) | RegistryError::InvalidResponse(_) => false,
        }
    }
}

/// Outcome of a remote lookup that is allowed to fail softly.
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteLookup<T> {
    Fetched(T),
    Unavailable(RegistryError),
}

/// Registry document for one package.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Packument {
    #[serde(default)]
    pub name: String,

    /// Published versions; manifests are not needed
    #[serde(default)]
    pub versions: BTreeMap<String, IgnoredAny>,

    #[serde(default, rename = "dist-tags")]
    pub dist_tags: BTreeMap<String, String>,

    /// Publish timestamps by version (full metadata only)
    #[serde(default)]
    pub time: BTreeMap<String, String>,
}

impl Packument {
    pub fn version_strings(&self) -> impl Iterator<Item = &str> {
        self.versions.keys().map(String::as_str)
    }

    pub fn published(&self, version: &str) -> Option<&str> {
        self.time.get(version).map(String::as_str)
    }
}

type CacheKey = (String, String, bool);

/// HTTP client for registry metadata, memoizing packuments.
pub struct RegistryClient {
    client: Client,
    retries: u32,
    retry_base_delay: Duration,
    cache: Mutex<HashMap<CacheKey, Arc<Packument>>>,
}

impl Default for RegistryClient {
    fn default() -> Self {
        Self {
            client: Client::new(),
            retries: DEFAULT_RETRIES,
            retry_base_delay: Duration::from_millis(RETRY_BASE_DELAY_MS),
            cache: Mutex::new(HashMap::new()),
        }
    }
}

impl std::fmt::Debug for RegistryClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryClient")
            .field("retries", &self.retries)
            .field("retry_base_delay", &self.retry_base_delay)
            .field("cached", &self.cache.lock().len())
            .finish()
    }
}

impl RegistryClient {
    /// Create a client with a request timeout.
    pub fn new(timeout: Duration) -> Result<Self, RegistryError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RegistryError::Request(format!("HTTP client error: {}", e)))?;
        Ok(Self {
            client,
            ..Self::default()
        })
    }

    /// Set the maximum retry attempts.
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    /// Set the first backoff delay; each later retry doubles it.
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_base_delay = delay;
        self
    }

    pub fn retries(&self) -> u32 {
        self.retries
    }

    /// Fetch the packument for `name` from `registry_url`.
    ///
    /// # Arguments
    /// * `registry_url` - `/`-terminated registry base URL
    /// * `name` - package name, scoped or not
    /// * `full` - full metadata (with publish times) instead of abbreviated
    /// * `signal` - cancellation token of the running query
    ///
    /// # Returns
    /// The packument, or `Unavailable` once retries are exhausted or the
    /// failure is not retryable. Only cancellation is an error.
    pub async fn packument(
        &self,
        registry_url: &str,
        name: &str,
        full: bool,
        signal: &CancellationToken,
    ) -> Result<RemoteLookup<Arc<Packument>>, QueryError> {
        let key = (registry_url.to_string(), name.to_string(), full);
        if let Some(cached) = self.cache.lock().get(&key).cloned() {
            return Ok(RemoteLookup::Fetched(cached));
        }

        let url = packument_url(registry_url, name);
        let mut last_error = None;
        let mut retry_delay = self.retry_base_delay;

        for attempt in 0..=self.retries {
            let result = tokio::select! {
                _ = signal.cancelled() => return Err(QueryError::Cancelled),
                result = self.fetch(&url, name, full) => result,
            };

            match result {
                Ok(packument) => {
                    let packument = Arc::new(packument);
                    self.cache.lock().insert(key, Arc::clone(&packument));
                    return Ok(RemoteLookup::Fetched(packument));
                }
                Err(e) => {
                    // Don't retry on a definitive answer
                    if !e.is_retryable() || attempt == self.retries {
                        return Ok(RemoteLookup::Unavailable(e));
                    }

                    debug!(
                        "Registry request for {} failed (attempt {}): {}; retrying in {:?}",
                        name,
                        attempt + 1,
                        e,
                        retry_delay
                    );
                    tokio::select! {
                        _ = signal.cancelled() => return Err(QueryError::Cancelled),
                        _ = tokio::time::sleep(retry_delay) => {}
                    }
                    retry_delay *= 2;
                    last_error = Some(e);
                }
            }
        }

        Ok(RemoteLookup::Unavailable(last_error.unwrap_or_else(|| {
            RegistryError::Request("request failed after retries".into())
        })))
    }

    /// Send a single request.
    async fn fetch(&self, url: &str, name: &str, full: bool) -> Result<Packument, RegistryError> {
        let accept = if full { FULL_ACCEPT } else { ABBREVIATED_ACCEPT };
        let response = self
            .client
            .get(url)
            .header(ACCEPT, accept)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    RegistryError::Request("request timed out".into())
                } else {
                    RegistryError::Request(e.to_string())
                }
            })?;

        match response.status() {
            StatusCode::OK => response
                .json::<Packument>()
                .await
                .map_err(|e| RegistryError::InvalidResponse(e.to_string())),
            StatusCode::NOT_FOUND => Err(RegistryError::NotFound(name.to_string())),
            status => Err(RegistryError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            }),
        }
    }
}

/// `{registry}{name}` with the scope separator encoded.
pub fn packument_url(registry_url: &str, name: &str) -> String {
    let base = if registry_url.ends_with('/') {
        registry_url.to_string()
    } else {
        format!("{}/", registry_url)
    };
    format!("{}{}", base, name.replace('/', "%2F"))
}
