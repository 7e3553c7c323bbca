//! Caller-facing cancellation and deadline propagation.
//!
//! Every long-running core operation takes a `&Cancellation`. The token
//! combines an explicit abort flag with an optional deadline; both resolve
//! to the same observable outcome, `AstroError::Cancelled`, so in-flight
//! sub-requests are abandoned instead of being disguised as partial
//! successes.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;
use tokio::time::{sleep_until, Duration, Instant};

use crate::types::AstroError;

/// Cheap, clonable cancellation token.
#[derive(Debug, Clone)]
pub struct Cancellation {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    cancelled: AtomicBool,
    notify: Notify,
    deadline: Option<Instant>,
}

impl Default for Cancellation {
    fn default() -> Self {
        Self::none()
    }
}

impl Cancellation {
    /// A token that never fires on its own.
    pub fn none() -> Self {
        Self {
            inner: Arc::new(Inner {
                cancelled: AtomicBool::new(false),
                notify: Notify::new(),
                deadline: None,
            }),
        }
    }

    /// A token that fires once `after` has elapsed.
    pub fn with_deadline(after: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                cancelled: AtomicBool::new(false),
                notify: Notify::new(),
                deadline: Some(Instant::now() + after),
            }),
        }
    }

    /// Abort all operations guarded by this token (and its clones).
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
        self.inner.notify.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        if self.inner.cancelled.load(Ordering::SeqCst) {
            return true;
        }
        match self.inner.deadline {
            Some(d) => Instant::now() >= d,
            None => false,
        }
    }

    /// Fail fast if already cancelled. Called before issuing requests so
    /// a dead caller never consumes rate-limit budget.
    pub fn check(&self) -> Result<(), AstroError> {
        if self.is_cancelled() {
            Err(AstroError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Run `fut` to completion unless the token fires first.
    pub async fn guard<T>(
        &self,
        fut: impl Future<Output = Result<T, AstroError>>,
    ) -> Result<T, AstroError> {
        self.check()?;

        let deadline = self.inner.deadline;
        let deadline_elapsed = async {
            match deadline {
                Some(d) => sleep_until(d).await,
                None => std::future::pending().await,
            }
        };

        tokio::select! {
            res = fut => res,
            _ = self.inner.notify.notified() => Err(AstroError::Cancelled),
            _ = deadline_elapsed => Err(AstroError::Cancelled),
        }
    }
}
