//! Resilient HTTP execution shared by all source adapters.
//!
//! `RetryingClient` performs one logical request: it claims a rate-limit
//! slot, issues the request through an `HttpTransport`, classifies the
//! outcome, and retries transient failures with capped exponential
//! backoff plus jitter. The retry loop is a bounded state machine —
//! attempt, classify, wait, attempt — with terminal success or a typed
//! terminal error carrying the last underlying cause. It never returns
//! partial or empty data disguised as success.
//!
//! The `HttpTransport` trait is the seam between the core and the real
//! network; tests substitute a scripted transport.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;
use tokio::time::{sleep, Duration};
use tracing::{debug, warn};

use crate::cancel::Cancellation;
use crate::config::{AppConfig, RetryConfig};
use crate::limiter::RateLimiter;
use crate::types::AstroError;

// ---------------------------------------------------------------------------
// Transport seam
// ---------------------------------------------------------------------------

/// Raw response handed back by a transport.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

/// Abstraction over the actual HTTP stack.
///
/// Transport-level failures (DNS, connect, timeout) come back as `Err`
/// with a human-readable cause; any response with a status code comes
/// back as `Ok`, classification happens above this seam.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn get(&self, url: &str, query: &[(String, String)]) -> Result<RawResponse, String>;
}

/// Production transport backed by `reqwest`.
pub struct ReqwestTransport {
    http: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(timeout_secs: u64) -> anyhow::Result<Self> {
        use anyhow::Context;
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent("ASTROLABE/0.1.0")
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { http })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get(&self, url: &str, query: &[(String, String)]) -> Result<RawResponse, String> {
        let resp = self
            .http
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| e.to_string())?;
        let status = resp.status().as_u16();
        let body = resp.text().await.map_err(|e| e.to_string())?;
        Ok(RawResponse { status, body })
    }
}

// ---------------------------------------------------------------------------
// Request spec
// ---------------------------------------------------------------------------

/// One logical upstream request.
#[derive(Debug, Clone)]
pub struct RequestSpec {
    /// Budget key for the rate limiter.
    pub provider: &'static str,
    /// Path relative to the configured base URL.
    pub path: String,
    pub query: Vec<(String, String)>,
}

impl RequestSpec {
    pub fn new(provider: &'static str, path: impl Into<String>) -> Self {
        Self {
            provider,
            path: path.into(),
            query: Vec::new(),
        }
    }

    pub fn with_param(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }
}

// ---------------------------------------------------------------------------
// Retrying client
// ---------------------------------------------------------------------------

/// Outcome of one attempt, after classification.
enum Attempt {
    Success(serde_json::Value),
    /// Transient class: transport error, 5xx, or rate-limit response.
    Retry { cause: String },
    /// Non-retryable: 4xx other than 429, or a body that is not JSON.
    Reject { status: Option<u16>, message: String },
}

/// Rate-limited, retrying request executor shared by all adapters.
pub struct RetryingClient {
    transport: Arc<dyn HttpTransport>,
    limiter: Arc<RateLimiter>,
    retry: RetryConfig,
    base_url: String,
    api_key: SecretString,
}

impl RetryingClient {
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        limiter: Arc<RateLimiter>,
        retry: RetryConfig,
        base_url: impl Into<String>,
        api_key: SecretString,
    ) -> Self {
        Self {
            transport,
            limiter,
            retry,
            base_url: base_url.into(),
            api_key,
        }
    }

    /// Build a production client from config.
    pub fn from_config(config: &AppConfig, limiter: Arc<RateLimiter>) -> anyhow::Result<Self> {
        let transport = ReqwestTransport::new(config.api.timeout_secs)?;
        Ok(Self::new(
            Arc::new(transport),
            limiter,
            config.retry.clone(),
            config.api.base_url.clone(),
            config.resolve_api_key(),
        ))
    }

    /// Execute one logical request with retries, honoring `cancel` at
    /// every suspension point.
    pub async fn execute(
        &self,
        spec: &RequestSpec,
        cancel: &Cancellation,
    ) -> Result<serde_json::Value, AstroError> {
        cancel.guard(self.execute_inner(spec, cancel)).await
    }

    async fn execute_inner(
        &self,
        spec: &RequestSpec,
        cancel: &Cancellation,
    ) -> Result<serde_json::Value, AstroError> {
        let url = format!("{}{}", self.base_url, spec.path);
        let mut query = spec.query.clone();
        query.push(("api_key".to_string(), self.api_key.expose_secret().clone()));

        let max_attempts = self.retry.max_attempts.max(1);
        let mut last_cause = String::new();

        for attempt in 0..max_attempts {
            if attempt > 0 {
                let delay = self.backoff_delay(attempt - 1);
                debug!(
                    provider = spec.provider,
                    attempt = attempt + 1,
                    delay_ms = delay.as_millis() as u64,
                    "retrying after transient failure"
                );
                sleep(delay).await;
            }

            cancel.check()?;
            // A retried request is a new request from the provider's
            // perspective: every attempt claims a fresh slot.
            self.limiter.acquire(spec.provider).await;

            match self.attempt(&url, &query).await {
                Attempt::Success(value) => {
                    debug!(provider = spec.provider, path = %spec.path, "request succeeded");
                    return Ok(value);
                }
                Attempt::Reject { status, message } => {
                    return Err(AstroError::UpstreamRejected {
                        provider: spec.provider.to_string(),
                        status,
                        message,
                    });
                }
                Attempt::Retry { cause } => {
                    warn!(
                        provider = spec.provider,
                        attempt = attempt + 1,
                        cause = %cause,
                        "transient upstream failure"
                    );
                    last_cause = cause;
                }
            }
        }

        Err(AstroError::UpstreamTransient {
            provider: spec.provider.to_string(),
            message: format!("{max_attempts} attempts exhausted, last cause: {last_cause}"),
        })
    }

    async fn attempt(&self, url: &str, query: &[(String, String)]) -> Attempt {
        match self.transport.get(url, query).await {
            Err(cause) => Attempt::Retry { cause },
            Ok(resp) => classify(resp),
        }
    }

    /// `base * multiplier^n` capped at `max_delay`, plus uniform jitter.
    fn backoff_delay(&self, prior_failures: u32) -> Duration {
        let scaled =
            self.retry.base_delay_ms as f64 * self.retry.multiplier.powi(prior_failures as i32);
        let capped = scaled.min(self.retry.max_delay_ms as f64) as u64;
        let jitter = if self.retry.jitter_ms > 0 {
            fastrand::u64(0..=self.retry.jitter_ms)
        } else {
            0
        };
        Duration::from_millis(capped + jitter)
    }
}

/// Classify a status + body into a terminal or retryable outcome.
fn classify(resp: RawResponse) -> Attempt {
    match resp.status {
        429 => Attempt::Retry {
            cause: "HTTP 429: rate limited by upstream".to_string(),
        },
        s if s >= 500 => Attempt::Retry {
            cause: format!("HTTP {s}: {}", truncate(&resp.body, 200)),
        },
        s if s >= 400 => Attempt::Reject {
            status: Some(s),
            message: format!("HTTP {s}: {}", truncate(&resp.body, 200)),
        },
        _ => match serde_json::from_str(&resp.body) {
            Ok(value) => Attempt::Success(value),
            Err(e) => Attempt::Reject {
                status: None,
                message: format!("malformed JSON body: {e}"),
            },
        },
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
