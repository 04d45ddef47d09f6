//! Outbound HTTP client shared by the geocoder and the forecast provider.
//!
//! GET requests are cached for a bounded time and retried with exponential
//! backoff on transient failures (connection errors, timeouts, 429 and 5xx
//! gateway statuses). Anything else fails on the first attempt.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use reqwest::{Client, StatusCode, Url, header::HeaderMap};
use tracing::{debug, warn};

use crate::config::HttpConfig;
use crate::error::{Error, Result};

/// Exponential backoff: `initial_delay * multiplier^n` between attempts.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub attempts: u32,
    pub initial_delay: Duration,
    pub multiplier: f64,
}

impl RetryPolicy {
    pub const fn exponential(retries: u32, initial_delay: Duration) -> Self {
        Self { attempts: retries + 1, initial_delay, multiplier: 2.0 }
    }

    pub const fn none() -> Self {
        Self { attempts: 1, initial_delay: Duration::ZERO, multiplier: 1.0 }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::exponential(5, Duration::from_millis(200))
    }
}

#[derive(Debug, Clone)]
struct CachedBody {
    body: String,
    cached_at: Instant,
    last_accessed: Instant,
}

/// TTL cache of response bodies with least-recently-used eviction.
#[derive(Debug)]
struct ResponseCache {
    capacity: usize,
    ttl: Duration,
    entries: HashMap<String, CachedBody>,
}

impl ResponseCache {
    fn new(capacity: usize, ttl: Duration) -> Self {
        Self { capacity, ttl, entries: HashMap::new() }
    }

    fn get(&mut self, key: &str) -> Option<String> {
        let ttl = self.ttl;
        let entry = self.entries.get_mut(key)?;

        if entry.cached_at.elapsed() > ttl {
            self.entries.remove(key);
            return None;
        }

        entry.last_accessed = Instant::now();
        Some(entry.body.clone())
    }

    fn insert(&mut self, key: String, body: String) {
        if self.capacity == 0 || self.ttl.is_zero() {
            return;
        }

        let ttl = self.ttl;
        self.entries.retain(|_, entry| entry.cached_at.elapsed() <= ttl);

        if self.entries.len() >= self.capacity && !self.entries.contains_key(&key) {
            let lru = self
                .entries
                .iter()
                .min_by_key(|(_, entry)| entry.last_accessed)
                .map(|(k, _)| k.clone());
            if let Some(lru) = lru {
                self.entries.remove(&lru);
            }
        }

        let now = Instant::now();
        self.entries.insert(key, CachedBody { body, cached_at: now, last_accessed: now });
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Failure of a single attempt, tagged with whether another attempt may help.
struct AttemptError {
    error: Error,
    transient: bool,
}

/// `reqwest::Client` with response caching and retry for idempotent GETs.
#[derive(Debug)]
pub struct CachedClient {
    http: Client,
    retry: RetryPolicy,
    cache: Mutex<ResponseCache>,
}

impl CachedClient {
    pub fn new(http: Client, retry: RetryPolicy, cache_capacity: usize, ttl: Duration) -> Self {
        Self { http, retry, cache: Mutex::new(ResponseCache::new(cache_capacity, ttl)) }
    }

    pub fn from_config(config: &HttpConfig) -> Result<Self> {
        let http = Client::builder().timeout(config.timeout()).build()?;

        Ok(Self::new(
            http,
            RetryPolicy::exponential(config.retries, config.backoff_factor()),
            config.cache_capacity,
            config.cache_ttl(),
        ))
    }

    /// Number of live cache entries.
    pub fn cached_entries(&self) -> usize {
        self.lock_cache().len()
    }

    /// GET `url` with `query` and return the body of a 2xx response.
    ///
    /// The cache key is the full request URL, query string included.
    pub async fn get_text(
        &self,
        url: &str,
        query: &[(&str, String)],
        headers: HeaderMap,
    ) -> Result<String> {
        let url = Url::parse_with_params(url, query)
            .map_err(|e| Error::Config(format!("Invalid URL '{url}': {e}")))?;
        let key = format!("GET {url}");

        if let Some(body) = self.lock_cache().get(&key) {
            debug!(%url, "HTTP cache hit");
            return Ok(body);
        }

        let mut delay = self.retry.initial_delay;
        let attempts = self.retry.attempts.max(1);

        for attempt in 1..=attempts {
            match self.send_once(&url, &headers).await {
                Ok(body) => {
                    self.lock_cache().insert(key, body.clone());
                    return Ok(body);
                }
                Err(failure) if failure.transient && attempt < attempts => {
                    warn!(
                        %url,
                        attempt,
                        max_attempts = attempts,
                        error = %failure.error,
                        "Transient HTTP failure, retrying in {:?}",
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    delay = delay.mul_f64(self.retry.multiplier);
                }
                Err(failure) => return Err(failure.error),
            }
        }

        Err(Error::Config(format!("No request attempts were made for {url}")))
    }

    async fn send_once(
        &self,
        url: &Url,
        headers: &HeaderMap,
    ) -> std::result::Result<String, AttemptError> {
        let res = self.http.get(url.clone()).headers(headers.clone()).send().await.map_err(|e| {
            AttemptError { transient: e.is_timeout() || e.is_connect(), error: e.into() }
        })?;

        let status = res.status();
        let body = res
            .text()
            .await
            .map_err(|e| AttemptError { transient: e.is_timeout(), error: e.into() })?;

        if !status.is_success() {
            return Err(AttemptError {
                transient: is_transient_status(status),
                error: Error::HttpStatus {
                    url: url.to_string(),
                    status: status.as_u16(),
                    body: truncate_body(&body),
                },
            });
        }

        Ok(body)
    }

    fn lock_cache(&self) -> std::sync::MutexGuard<'_, ResponseCache> {
        self.cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn is_transient_status(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::TOO_MANY_REQUESTS
            | StatusCode::INTERNAL_SERVER_ERROR
            | StatusCode::BAD_GATEWAY
            | StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::GATEWAY_TIMEOUT
    )
}

pub(crate) fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.chars().count() > MAX {
        format!("{}...", body.chars().take(MAX).collect::<String>())
    } else {
        body.to_string()
    }
}
