//! Article fetching over HTTP, with an optional retry decorator.
//!
//! # Architecture
//!
//! - [`DocumentFetcher`]: The capability the ingestion pipeline consumes
//! - [`HttpDocumentFetcher`]: `reqwest` + [`parse_article`] implementation
//! - [`RetryFetcher`]: Decorator adding exponential backoff to any fetcher
//!
//! # Retry Strategy
//!
//! Only retryable failures (network, 429, 5xx) are retried. The delay follows:
//! ```text
//! delay = min(base_delay * 2^(attempt-1), max_delay) + random_jitter(0..250ms)
//! ```

use rand::{Rng, rng};
use reqwest::Client;
use std::fmt;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, error, info, instrument, warn};

use crate::errors::FetchError;
use crate::models::{ArticleFields, RawPage};
use crate::scrapers::article::parse_article;
use crate::utils::truncate_for_log;

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Resolves an article URL to its raw fields.
///
/// Implementations make a single attempt; wrap them in [`RetryFetcher`] for more.
pub trait DocumentFetcher {
    /// Fetch and parse one article.
    async fn fetch(&self, url: &str) -> Result<ArticleFields, FetchError>;
}

/// Fetches articles with `reqwest` and parses them with [`parse_article`].
#[derive(Debug, Clone)]
pub struct HttpDocumentFetcher {
    client: Client,
}

impl HttpDocumentFetcher {
    /// Build a fetcher whose requests give up after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }

    pub fn client(&self) -> &Client {
        &self.client
    }
}

impl DocumentFetcher for HttpDocumentFetcher {
    #[instrument(level = "info", skip_all, fields(%url))]
    async fn fetch(&self, url: &str) -> Result<ArticleFields, FetchError> {
        let body = get_text(&self.client, url).await?;
        let fields = parse_article(&body)?;
        info!(bytes = fields.body_text.len(), title = %fields.title, "Parsed article");
        Ok(fields)
    }
}

/// Fetch the seed page whose links will be extracted.
#[instrument(level = "info", skip(client))]
pub async fn fetch_seed_page(client: &Client, url: &str) -> Result<RawPage, FetchError> {
    let html_content = get_text(client, url).await?;
    info!(bytes = html_content.len(), "Fetched seed page");
    Ok(RawPage {
        source_url: url.to_string(),
        html_content,
    })
}

async fn get_text(client: &Client, url: &str) -> Result<String, FetchError> {
    let response = client.get(url).send().await?;
    let status = response.status();
    if !status.is_success() {
        let reason = status.canonical_reason().unwrap_or("Unknown");
        return Err(FetchError::http_status(status.as_u16(), reason));
    }
    Ok(response.text().await?)
}

/// Wrapper that adds exponential backoff retry logic to any [`DocumentFetcher`].
pub struct RetryFetcher<T> {
    /// The underlying fetcher.
    inner: T,
    /// Retries after the first attempt. Zero means a single attempt.
    max_retries: usize,
    /// Initial delay between retries (doubles with each attempt).
    base_delay: Duration,
    /// Cap on the backoff delay.
    max_delay: Duration,
}

impl<T> RetryFetcher<T>
where
    T: DocumentFetcher,
{
    /// Wrap `inner`, retrying up to `max_retries` times starting at `base_delay`.
    pub fn new(inner: T, max_retries: usize, base_delay: Duration) -> Self {
        Self {
            inner,
            max_retries,
            base_delay,
            max_delay: Duration::from_secs(30),
        }
    }

    /// Backoff before retry number `attempt` (1-based), without jitter.
    fn backoff_delay(&self, attempt: usize) -> Duration {
        let exponent = u32::try_from(attempt.saturating_sub(1)).unwrap_or(u32::MAX);
        let factor = 1u32.checked_shl(exponent).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

impl<T> fmt::Debug for RetryFetcher<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryFetcher")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .finish()
    }
}

impl<T> DocumentFetcher for RetryFetcher<T>
where
    T: DocumentFetcher,
{
    #[instrument(level = "debug", skip_all, fields(%url))]
    async fn fetch(&self, url: &str) -> Result<ArticleFields, FetchError> {
        let total_t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            match self.inner.fetch(url).await {
                Ok(fields) => {
                    if attempt > 0 {
                        debug!(attempt, "fetch() succeeded after retry");
                    }
                    return Ok(fields);
                }
                Err(e) if !e.is_retryable() => return Err(e),
                Err(e) => {
                    attempt += 1;
                    let total_dt = total_t0.elapsed();

                    if attempt > self.max_retries {
                        if self.max_retries > 0 {
                            error!(
                                attempt,
                                max = self.max_retries,
                                elapsed_ms_total = total_dt.as_millis(),
                                error = %truncate_for_log(&e.to_string(), 300),
                                "fetch() exhausted retries"
                            );
                        }
                        return Err(e);
                    }

                    let delay = self.backoff_delay(attempt);
                    let jitter_ms: u64 = rng().random_range(0..=250);
                    let delay = delay + Duration::from_millis(jitter_ms);

                    warn!(
                        attempt,
                        max = self.max_retries,
                        elapsed_ms_total = total_dt.as_millis(),
                        ?delay,
                        error = %e,
                        "fetch() attempt failed; backing off"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}
