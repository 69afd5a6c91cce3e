//! HTTP fetch pipeline with bounded redirects and size limits.
//!
//! ### URL Canonicalization
//! - Trim whitespace, ensure scheme (default: `https`)
//! - Lowercase host, remove fragments
//! - Preserve query string
//!
//! ### Redirects
//! - Followed by [`FetchClient`] itself, one transport request per hop
//! - Relative `Location` values are resolved against the current URL
//! - Max redirects: 5 (configurable); the chain so far is kept on failure
//!
//! ### Safety Gates
//! - Max body bytes: 5MB (configurable), enforced while streaming
//! - Private/reserved addresses refused on every hop (configurable)

pub mod error;
pub mod ssrf;
pub mod transport;
pub mod url;

use async_trait::async_trait;
use std::time::{Duration, Instant};

pub use error::FetchError;
pub use ssrf::SsrfError;
pub use transport::{HttpTransport, RawResponse, Transport};
pub use reqwest::{StatusCode, Url};
pub use self::url::{UrlError, canonicalize, resolve_location};

use linkstash_core::{AppConfig, Error};

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "linkstash/0.1")
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 5MB)
    pub max_bytes: usize,

    /// Per-request timeout (default: 30s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,

    /// Refuse private and reserved addresses (default: true)
    pub block_private_addresses: bool,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "linkstash/0.1".to_string(),
            max_bytes: 5 * 1024 * 1024,
            timeout: Duration::from_secs(30),
            max_redirects: 5,
            block_private_addresses: true,
        }
    }
}

impl From<&AppConfig> for FetchConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            max_bytes: config.content_size_limit_bytes,
            timeout: config.timeout(),
            max_redirects: config.max_redirects,
            block_private_addresses: config.block_private_addresses,
        }
    }
}

/// Content retrieved from the end of a redirect chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    /// Body decoded as UTF-8 (lossy).
    pub content: String,
    pub content_type: Option<String>,
    /// Body length in bytes.
    pub content_length: u64,
    /// Set only when it differs from the requested URL.
    pub final_url: Option<String>,
    pub redirects: Vec<String>,
}

/// A fetch that produced no content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchFailure {
    pub error: FetchError,
    /// Redirect targets followed before the failure.
    pub redirects: Vec<String>,
}

/// Result of [`Fetcher::fetch`]. Failures are data, never `Err`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Success(FetchedPage),
    Failure(FetchFailure),
}

/// Anything that can turn a URL into a [`FetchOutcome`].
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> FetchOutcome;
}

/// Redirect-following fetch client.
pub struct FetchClient<T = HttpTransport> {
    transport: T,
    config: FetchConfig,
}

impl FetchClient<HttpTransport> {
    /// Create a new fetch client over HTTP with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let transport = HttpTransport::new(&config.user_agent, config.timeout, config.block_private_addresses)?;
        Ok(Self { transport, config })
    }
}

impl<T: Transport> FetchClient<T> {
    /// Create a fetch client over a custom transport.
    pub fn with_transport(config: FetchConfig, transport: T) -> Self {
        Self { transport, config }
    }

    /// Fetch a URL, following up to `max_redirects` redirects.
    ///
    /// Never fails: every error is folded into [`FetchOutcome::Failure`]
    /// together with the redirects seen so far.
    pub async fn fetch(&self, url_str: &str) -> FetchOutcome {
        let start = Instant::now();
        let mut redirects = Vec::new();

        match self.follow(url_str, &mut redirects).await {
            Ok(page) => {
                tracing::debug!(
                    url = url_str,
                    final_url = page.final_url.as_deref().unwrap_or(url_str),
                    redirects = page.redirects.len(),
                    bytes = page.content_length,
                    fetch_ms = start.elapsed().as_millis() as u64,
                    "fetched"
                );
                FetchOutcome::Success(page)
            }
            Err(error) => {
                tracing::warn!(url = url_str, redirects = redirects.len(), error = %error, "fetch failed");
                FetchOutcome::Failure(FetchFailure { error, redirects })
            }
        }
    }

    async fn follow(&self, url_str: &str, redirects: &mut Vec<String>) -> Result<FetchedPage, FetchError> {
        let max_redirects = self.config.max_redirects;
        let max_bytes = self.config.max_bytes;

        let original = canonicalize(url_str)?;
        let mut current = original.clone();
        let mut redirect_count = 0;

        while redirect_count <= max_redirects {
            let response = self.transport.get(&current, max_bytes).await?;
            let status = response.status;

            if status.is_redirection() {
                let location = response.location.ok_or(FetchError::MissingLocationHeader)?;
                let next = resolve_location(&current, &location)?;
                redirects.push(next.to_string());

                if redirect_count >= max_redirects {
                    return Err(FetchError::TooManyRedirects(max_redirects));
                }

                tracing::debug!(from = %current, to = %next, status = status.as_u16(), "following redirect");
                current = next;
                redirect_count += 1;
                continue;
            }

            if !status.is_success() {
                return Err(FetchError::HttpStatus(status.as_u16()));
            }

            let content_length = response.body.len() as u64;
            if response.body.len() > max_bytes {
                return Err(FetchError::ContentTooLarge { actual: content_length, limit: max_bytes });
            }

            let final_url = (current != original).then(|| current.to_string());

            return Ok(FetchedPage {
                content: String::from_utf8_lossy(&response.body).into_owned(),
                content_type: response.content_type,
                content_length,
                final_url,
                redirects: redirects.clone(),
            });
        }

        Err(FetchError::TooManyRedirects(max_redirects))
    }
}

#[async_trait]
impl<T: Transport> Fetcher for FetchClient<T> {
    async fn fetch(&self, url: &str) -> FetchOutcome {
        FetchClient::fetch(self, url).await
    }
}
