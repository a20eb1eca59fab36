//! HTTP fetching.
//!
//! Fetches the listing page as text and streams puzzle files to disk.
//! Every request carries a browser-like user agent; the publisher turns
//! away default client identifiers.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use reqwest::{Client, Response, StatusCode};
use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::FetchSettings;

/// Errors that can occur during fetching.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid user agent: {0}")]
    InvalidUserAgent(#[from] reqwest::header::InvalidHeaderValue),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP {status}: {message}")]
    HttpStatus { status: u16, message: String },

    #[error("Stream from {url} interrupted: {source}")]
    Stream {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

impl FetchError {
    /// Whether another attempt could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Http(_) | FetchError::Stream { .. } => true,
            FetchError::HttpStatus { status, .. } => {
                *status >= 500 || *status == StatusCode::TOO_MANY_REQUESTS.as_u16()
            }
            FetchError::InvalidUrl(_) | FetchError::InvalidUserAgent(_) | FetchError::Io(_) => {
                false
            }
        }
    }
}

/// Retry policy for transient failures.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_delay_ms: u64,
    pub backoff_multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_delay_ms: 1000,
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// No retries at all.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Default::default()
        }
    }

    /// Delay before retry number `retry` (1-based).
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = self.backoff_multiplier.powi(retry.saturating_sub(1) as i32);
        Duration::from_millis((self.initial_delay_ms as f64 * factor) as u64)
    }
}

/// Configuration for the HTTP fetcher.
#[derive(Debug, Clone)]
pub struct FetcherConfig {
    /// Request timeout
    pub timeout: Duration,

    /// User agent string
    pub user_agent: String,

    pub retry: RetryPolicy,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        FetcherConfig::from(&FetchSettings::default())
    }
}

impl From<&FetchSettings> for FetcherConfig {
    fn from(settings: &FetchSettings) -> Self {
        Self {
            timeout: Duration::from_secs(settings.timeout_seconds),
            user_agent: settings.user_agent.clone(),
            retry: RetryPolicy {
                max_retries: settings.max_retries,
                initial_delay_ms: settings.retry_backoff_ms,
                ..Default::default()
            },
        }
    }
}

/// Where puzzles come from: the listing page and the puzzle files.
#[async_trait]
pub trait PuzzleSource: Send + Sync {
    async fn fetch_text(&self, url: &Url) -> Result<String, FetchError>;

    /// Download `url` to `dest`, returning the number of bytes written.
    async fn download_to_file(&self, url: &Url, dest: &Path) -> Result<u64, FetchError>;
}

/// HTTP fetcher.
pub struct Fetcher {
    client: Client,
    config: FetcherConfig,
}

impl Fetcher {
    /// Create a new fetcher with the given configuration.
    pub fn new(config: FetcherConfig) -> Result<Self, FetchError> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_str(&config.user_agent)?);

        let client = Client::builder()
            .timeout(config.timeout)
            .default_headers(headers)
            .build()?;

        Ok(Self { client, config })
    }

    /// Create a fetcher with default configuration.
    pub fn with_defaults() -> Result<Self, FetchError> {
        Self::new(FetcherConfig::default())
    }

    /// GET a page and return its body as text.
    pub async fn fetch_text(&self, url: &Url) -> Result<String, FetchError> {
        self.with_retry(url, move || self.text_once(url)).await
    }

    async fn text_once(&self, url: &Url) -> Result<String, FetchError> {
        let response = self.fetch_stream(url).await?;
        Ok(response.text().await?)
    }

    /// GET a resource and hand back the response with its body unread.
    ///
    /// Non-2xx statuses are errors.
    pub async fn fetch_stream(&self, url: &Url) -> Result<Response, FetchError> {
        info!("Fetching {}", url);

        let response = self.client.get(url.as_str()).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus {
                status: status.as_u16(),
                message: status.canonical_reason().unwrap_or("Unknown").to_string(),
            });
        }

        Ok(response)
    }

    /// Stream `url` into `dest`.
    ///
    /// Bytes go to `<dest>.part` first and are renamed into place once the
    /// body is complete and flushed, so `dest` never holds a partial file.
    pub async fn download_to_file(&self, url: &Url, dest: &Path) -> Result<u64, FetchError> {
        if let Some(parent) = dest.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        let part = part_path(dest);
        let part = part.as_path();

        let bytes = self
            .with_retry(url, move || self.download_once(url, part))
            .await?;

        fs::rename(part, dest).await?;
        debug!("Wrote {} bytes to {:?}", bytes, dest);
        Ok(bytes)
    }

    async fn download_once(&self, url: &Url, part: &Path) -> Result<u64, FetchError> {
        let result = self.stream_to_file(url, part).await;

        if result.is_err() {
            if let Err(e) = fs::remove_file(part).await {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!("Failed to remove partial file {:?}: {}", part, e);
                }
            }
        }

        result
    }

    async fn stream_to_file(&self, url: &Url, path: &Path) -> Result<u64, FetchError> {
        let mut response = self.fetch_stream(url).await?;
        let mut file = fs::File::create(path).await?;
        let mut written = 0u64;

        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|source| FetchError::Stream {
                url: url.to_string(),
                source,
            })?
        {
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }

        file.flush().await?;
        file.sync_all().await?;
        Ok(written)
    }

    async fn with_retry<T, F, Fut>(&self, url: &Url, mut op: F) -> Result<T, FetchError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, FetchError>>,
    {
        let policy = &self.config.retry;
        let mut retry = 0;

        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && retry < policy.max_retries => {
                    retry += 1;
                    let delay = policy.delay_for(retry);
                    warn!(
                        "Request to {} failed ({}), retry {}/{} in {:?}",
                        url, e, retry, policy.max_retries, delay
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[async_trait]
impl PuzzleSource for Fetcher {
    async fn fetch_text(&self, url: &Url) -> Result<String, FetchError> {
        Fetcher::fetch_text(self, url).await
    }

    async fn download_to_file(&self, url: &Url, dest: &Path) -> Result<u64, FetchError> {
        Fetcher::download_to_file(self, url, dest).await
    }
}

/// Temporary path used while a download is in flight.
fn part_path(dest: &Path) -> PathBuf {
    let mut name = dest.as_os_str().to_os_string();
    name.push(".part");
    PathBuf::from(name)
}
