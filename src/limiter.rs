//! Per-provider request budget enforcement.
//!
//! Tracks a rolling budget of N requests per window for each upstream
//! provider and delays callers to stay under it. Rather than a fixed
//! bucket that refills at window boundaries (and invites bursts), each
//! reservation pushes the provider's next free slot forward by exactly
//! 1/N-th of the window. Any rolling window therefore contains at most
//! N reservations, under arbitrary concurrency.
//!
//! `acquire` never rejects — upstream quotas are generous, and a short
//! wait beats surfacing a failure to the agent. Slots whose request
//! later fails are still counted; the limiter protects the upstream
//! service, not the local budget.

use std::collections::HashMap;
use std::sync::Mutex;
use tokio::time::{sleep_until, Duration, Instant};
use tracing::debug;

/// Shared, thread-safe rolling rate limiter.
///
/// One instance is injected into every adapter at construction — never a
/// module-level singleton. The mutex guards only the slot bookkeeping and
/// is never held across an await.
pub struct RateLimiter {
    window: Duration,
    /// Minimum spacing between reservations: `window / max`.
    interval: Duration,
    next_free: Mutex<HashMap<String, Instant>>,
}

impl RateLimiter {
    /// Limiter for a rolling one-hour window.
    pub fn new(max_per_hour: u32) -> Self {
        Self::with_window(Duration::from_secs(3600), max_per_hour)
    }

    /// Limiter for an arbitrary rolling window (used by tests).
    pub fn with_window(window: Duration, max: u32) -> Self {
        let max = max.max(1);
        Self {
            window,
            interval: window / max,
            next_free: Mutex::new(HashMap::new()),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Reserve the next slot for `provider`, waiting until it opens.
    ///
    /// Concurrent callers each claim a distinct slot under the lock, then
    /// sleep outside it, so the reservation order is fair and no slot is
    /// ever lost.
    pub async fn acquire(&self, provider: &str) {
        let reserved = {
            let mut slots = self
                .next_free
                .lock()
                .expect("rate limiter state should not be poisoned");
            let now = Instant::now();
            let slot = slots
                .get(provider)
                .copied()
                .unwrap_or(now)
                .max(now);
            slots.insert(provider.to_string(), slot + self.interval);
            slot
        };

        let now = Instant::now();
        if reserved > now {
            debug!(
                provider = provider,
                wait_ms = (reserved - now).as_millis() as u64,
                "rate limit: waiting for slot"
            );
            sleep_until(reserved).await;
        }
    }
}
