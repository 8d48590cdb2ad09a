//! Page fetching with exponential backoff retry logic.
//!
//! # Architecture
//!
//! The module uses a trait-based design for flexibility:
//! - [`FetchPage`]: Core trait defining async page retrieval
//! - [`HttpFetcher`]: `reqwest`-backed implementation with browser-like headers
//! - [`RetryFetch`]: Decorator that adds retry logic to any `FetchPage` implementation
//!
//! The batch driver and `test` command only see the trait, so tests swap in
//! an in-memory fetcher and never touch the network.
//!
//! # Retry Strategy
//!
//! - Maximum 3 retry attempts
//! - Exponential backoff starting at 1 second, capped at 30 seconds
//! - Random jitter (0-250ms) added to each delay
//! - Only transport errors and 429/500/502/503/504 are retried

use crate::error::{Result, ScrapeError};
use rand::{Rng, rng};
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderValue};
use std::fmt;
use std::time::{Duration as StdDuration, Instant};
use tokio::time::sleep;
use tracing::{debug, error, instrument, warn};

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";
const REQUEST_TIMEOUT: StdDuration = StdDuration::from_secs(30);

/// Trait for async page retrieval.
pub trait FetchPage {
    /// Fetch `url` and return the response body as text.
    async fn fetch(&self, url: &str) -> Result<String>;
}

/// Fetches pages over HTTP with a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Build a client with browser-like default headers, gzip and a
    /// 30 second per-request timeout.
    pub fn new() -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
            ),
        );
        headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_static("es-ES,es;q=0.8,en-US;q=0.5,en;q=0.3"),
        );

        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .gzip(true)
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self { client })
    }
}

impl FetchPage for HttpFetcher {
    #[instrument(level = "debug", skip(self))]
    async fn fetch(&self, url: &str) -> Result<String> {
        let t0 = Instant::now();
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ScrapeError::Http {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        let body = response.text().await?;
        debug!(
            bytes = body.len(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Fetched page"
        );
        Ok(body)
    }
}

/// Wrapper that adds exponential backoff retry logic to any [`FetchPage`] implementation.
///
/// The delay between retries follows this formula:
/// ```text
/// delay = min(base_delay * 2^(attempt-1), max_delay) + random_jitter(0..max_jitter)
/// ```
pub struct RetryFetch<T> {
    /// The underlying fetcher to wrap.
    inner: T,
    /// Maximum number of retry attempts before giving up.
    max_retries: usize,
    /// Initial delay between retries (doubles with each attempt).
    base_delay: StdDuration,
    /// Maximum delay cap to prevent excessive waiting.
    max_delay: StdDuration,
    /// Upper bound of the random jitter added to every delay.
    max_jitter: StdDuration,
}

impl<T> RetryFetch<T>
where
    T: FetchPage,
{
    /// Create a new retry wrapper around an existing [`FetchPage`] implementation.
    ///
    /// # Arguments
    ///
    /// * `inner` - The underlying fetcher to wrap
    /// * `max_retries` - Maximum number of retry attempts (3 recommended)
    /// * `base_delay` - Initial delay between retries (1 second recommended)
    pub fn new(inner: T, max_retries: usize, base_delay: StdDuration) -> Self {
        Self {
            inner,
            max_retries,
            base_delay,
            max_delay: StdDuration::from_secs(30),
            max_jitter: StdDuration::from_millis(250),
        }
    }

    #[cfg(test)]
    pub fn with_max_jitter(mut self, max_jitter: StdDuration) -> Self {
        self.max_jitter = max_jitter;
        self
    }

    fn delay_for(&self, attempt: usize) -> StdDuration {
        let shift = (attempt.saturating_sub(1)).min(31) as u32;
        let delay = self
            .base_delay
            .saturating_mul(1u32 << shift)
            .min(self.max_delay);
        let jitter_ms: u64 = rng().random_range(0..=self.max_jitter.as_millis() as u64);
        delay + StdDuration::from_millis(jitter_ms)
    }
}

impl<T> fmt::Debug for RetryFetch<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryFetch")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .finish()
    }
}

impl<T> FetchPage for RetryFetch<T>
where
    T: FetchPage,
{
    #[instrument(level = "debug", skip(self))]
    async fn fetch(&self, url: &str) -> Result<String> {
        let total_t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            match self.inner.fetch(url).await {
                Ok(body) => return Ok(body),
                Err(e) if !e.is_retryable() => return Err(e),
                Err(e) => {
                    attempt += 1;
                    let total_dt = total_t0.elapsed();

                    if attempt > self.max_retries {
                        error!(
                            attempt,
                            max = self.max_retries,
                            elapsed_ms_total = total_dt.as_millis() as u64,
                            error = %e,
                            "fetch() exhausted retries"
                        );
                        return Err(e);
                    }

                    let delay = self.delay_for(attempt);
                    warn!(
                        attempt,
                        max = self.max_retries,
                        elapsed_ms_total = total_dt.as_millis() as u64,
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

/// The production fetcher: [`HttpFetcher`] behind three retries with a
/// one second base backoff.
pub fn default_fetcher() -> Result<RetryFetch<HttpFetcher>> {
    Ok(RetryFetch::new(
        HttpFetcher::new()?,
        3,
        StdDuration::from_secs(1),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Fails with `status` for the first `failures` calls, then succeeds.
    struct Flaky {
        failures: usize,
        status: u16,
        calls: AtomicUsize,
    }

    impl Flaky {
        fn new(failures: usize, status: u16) -> Self {
            Self {
                failures,
                status,
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl FetchPage for Flaky {
        async fn fetch(&self, url: &str) -> Result<String> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.failures {
                Err(ScrapeError::Http {
                    status: self.status,
                    url: url.to_string(),
                })
            } else {
                Ok("<html></html>".to_string())
            }
        }
    }

    fn fast<T: FetchPage>(inner: T, retries: usize) -> RetryFetch<T> {
        RetryFetch::new(inner, retries, StdDuration::ZERO).with_max_jitter(StdDuration::ZERO)
    }

    #[tokio::test]
    async fn test_retries_transient_status_then_succeeds() {
        let api = fast(Flaky::new(2, 503), 3);
        let body = api.fetch("https://example.com").await.unwrap();
        assert_eq!(body, "<html></html>");
        assert_eq!(api.inner.calls(), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_retries() {
        let api = fast(Flaky::new(10, 502), 3);
        let err = api.fetch("https://example.com").await.unwrap_err();
        assert!(matches!(err, ScrapeError::Http { status: 502, .. }));
        assert_eq!(api.inner.calls(), 4);
    }

    #[tokio::test]
    async fn test_does_not_retry_client_errors() {
        let api = fast(Flaky::new(10, 404), 3);
        let err = api.fetch("https://example.com/missing").await.unwrap_err();
        assert!(matches!(err, ScrapeError::Http { status: 404, .. }));
        assert_eq!(api.inner.calls(), 1);
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let api = RetryFetch::new(Flaky::new(0, 500), 10, StdDuration::from_secs(1))
            .with_max_jitter(StdDuration::ZERO);
        assert_eq!(api.delay_for(1), StdDuration::from_secs(1));
        assert_eq!(api.delay_for(2), StdDuration::from_secs(2));
        assert_eq!(api.delay_for(3), StdDuration::from_secs(4));
        assert_eq!(api.delay_for(6), StdDuration::from_secs(30));
    }

    #[test]
    fn test_jitter_stays_within_bound() {
        let api = RetryFetch::new(Flaky::new(0, 500), 3, StdDuration::from_secs(1));
        for _ in 0..50 {
            let delay = api.delay_for(1);
            assert!(delay >= StdDuration::from_secs(1));
            assert!(delay <= StdDuration::from_millis(1250));
        }
    }

    #[test]
    fn test_http_fetcher_builds() {
        assert!(HttpFetcher::new().is_ok());
    }
}
