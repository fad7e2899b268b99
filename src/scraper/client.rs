//! Blocking HTTP client with configurable politeness (delay between requests) and optional retries.

use crate::scraper::{PageSource, ScrapeError};
use scraper::Html;
use std::time::{Duration, Instant};

/// Mimics a common desktop browser; the site serves reduced pages to unknown agents.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_DELAY_SECS: f64 = 0.0;
const MAX_REDIRECTS: usize = 10;

/// Default number of attempts per page (no retry).
const DEFAULT_RETRY_COUNT: u32 = 1;
/// Default backoff delays in seconds after each failed attempt.
const DEFAULT_BACKOFF_SECS: [u64; 4] = [1, 2, 4, 8];
/// Backoff for HTTP 429 (rate limit): wait longer so the server can recover.
const BACKOFF_429_SECS: [u64; 4] = [30, 60, 90, 120];

/// Blocking HTTP client that enforces a delay between requests.
#[derive(Debug)]
pub struct PoliteClient {
    inner: reqwest::blocking::Client,
    delay: Duration,
    last_request: Option<Instant>,
    retry_count: u32,
    backoff_secs: Vec<u64>,
    verbose: bool,
    fetched: u64,
}

impl PoliteClient {
    /// Build a polite client with default User-Agent, timeout, and no delay.
    pub fn new() -> Result<Self, reqwest::Error> {
        Self::builder().build()
    }

    pub fn builder() -> PoliteClientBuilder {
        PoliteClientBuilder::default()
    }

    /// Number of pages fetched so far.
    pub fn fetched(&self) -> u64 {
        self.fetched
    }

    /// GET a page and return its body as text.
    ///
    /// Retries on timeout, connection errors, HTTP 5xx and HTTP 429 up to the configured attempt
    /// count. Other non-success statuses fail immediately with [`ScrapeError::HttpStatus`].
    pub fn get_text(&mut self, url: &str) -> Result<String, ScrapeError> {
        let max_attempts = self.retry_count.max(1);
        let mut attempt = 0;
        loop {
            attempt += 1;
            let last_attempt = attempt >= max_attempts;
            self.wait_delay();
            let sent = self.inner.get(url).send();
            self.last_request = Some(Instant::now());
            match sent {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return response.text().map_err(|e| ScrapeError::BodyRead {
                            url: url.to_string(),
                            source: e,
                        });
                    }
                    let rate_limited = status.as_u16() == 429;
                    if (status.is_server_error() || rate_limited) && !last_attempt {
                        let table: &[u64] = if rate_limited {
                            &BACKOFF_429_SECS
                        } else {
                            &self.backoff_secs
                        };
                        tracing::warn!("HTTP {} at {}, retrying", status.as_u16(), url);
                        self.backoff(table, attempt);
                        continue;
                    }
                    return Err(ScrapeError::HttpStatus {
                        status: status.as_u16(),
                        url: url.to_string(),
                    });
                }
                Err(e) => {
                    if (e.is_timeout() || e.is_connect()) && !last_attempt {
                        tracing::warn!("Network error at {}: {}, retrying", url, e);
                        self.backoff(&self.backoff_secs, attempt);
                        continue;
                    }
                    return Err(ScrapeError::Network {
                        url: url.to_string(),
                        source: e,
                    });
                }
            }
        }
    }

    fn backoff(&self, table: &[u64], attempt: u32) {
        let secs = table
            .get(attempt as usize - 1)
            .or_else(|| table.last())
            .copied()
            .unwrap_or(1);
        std::thread::sleep(Duration::from_secs(secs));
    }

    fn wait_delay(&mut self) {
        if let Some(last) = self.last_request {
            let elapsed = last.elapsed();
            if elapsed < self.delay {
                std::thread::sleep(self.delay - elapsed);
            }
        }
    }
}

impl PageSource for PoliteClient {
    fn fetch(&mut self, url: &str) -> Result<Html, ScrapeError> {
        let body = self.get_text(url)?;
        self.fetched += 1;
        if self.verbose {
            tracing::info!("Connected to {}", url);
        } else {
            tracing::debug!("Connected to {}", url);
        }
        Ok(Html::parse_document(&body))
    }
}

/// Builder for PoliteClient with optional User-Agent, delay, timeout, and retry settings.
#[derive(Debug)]
pub struct PoliteClientBuilder {
    user_agent: Option<String>,
    delay_secs: f64,
    timeout_secs: u64,
    retry_count: u32,
    retry_backoff_secs: Vec<u64>,
    verbose: bool,
}

impl Default for PoliteClientBuilder {
    fn default() -> Self {
        Self {
            user_agent: None,
            delay_secs: DEFAULT_DELAY_SECS,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            retry_count: DEFAULT_RETRY_COUNT,
            retry_backoff_secs: DEFAULT_BACKOFF_SECS.to_vec(),
            verbose: false,
        }
    }
}

impl PoliteClientBuilder {
    /// Set a custom User-Agent. If not set, a browser-like default is used.
    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.user_agent = Some(ua.into());
        self
    }

    /// Set delay between requests in seconds. Default 0. Negative or non-finite values count as 0;
    /// a delay too large for a `Duration` saturates at `Duration::MAX`.
    pub fn delay_secs(mut self, secs: f64) -> Self {
        self.delay_secs = if secs.is_finite() { secs.max(0.0) } else { 0.0 };
        self
    }

    /// Set request timeout in seconds. Default 30.
    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Set number of HTTP attempts for transient failures (default 1, i.e. no retry).
    pub fn retry_count(mut self, n: u32) -> Self {
        self.retry_count = n.max(1);
        self
    }

    /// Set backoff delays in seconds before each retry. If shorter than retry_count - 1, the last
    /// value is reused.
    pub fn retry_backoff_secs(mut self, secs: Vec<u64>) -> Self {
        self.retry_backoff_secs = secs;
        self
    }

    /// Log one line per fetched page at info level.
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn build(self) -> Result<PoliteClient, reqwest::Error> {
        let user_agent = self
            .user_agent
            .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string());
        let inner = reqwest::blocking::Client::builder()
            .cookie_store(true)
            .user_agent(user_agent)
            .timeout(Duration::from_secs(self.timeout_secs))
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .build()?;
        let backoff_secs = if self.retry_backoff_secs.is_empty() {
            // Exponential: 1, 2, 4, ... for (retry_count - 1) steps
            let n = self.retry_count.saturating_sub(1) as usize;
            (0..n).map(|i| 1u64 << i.min(4)).collect::<Vec<_>>()
        } else {
            self.retry_backoff_secs
        };
        Ok(PoliteClient {
            inner,
            delay: Duration::try_from_secs_f64(self.delay_secs).unwrap_or(Duration::MAX),
            last_request: None,
            retry_count: self.retry_count,
            backoff_secs,
            verbose: self.verbose,
            fetched: 0,
        })
    }
}
