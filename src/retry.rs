//! Bounded, user-cancellable retries with randomized exponential backoff.
//!
//! One call to [`RetryPolicy::run`] is one backoff session: a bounded
//! sequence of attempts ending in success, `Error::RetryGivenUp`, or
//! `Error::RetryCancelled`. The policy owns no state between sessions.

use crate::error::{Error, Result};
use rand::Rng;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// The default total attempt budget for a session.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// A future that resolves when the user declines to keep retrying.
pub type CancelFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Decides whether a waiting retry session should be abandoned. Called with
/// the error that triggered the wait and the scheduled delay in seconds;
/// resolving the returned future cancels the session. Return a future that
/// never resolves to keep retrying.
pub type CancelHandler = Arc<dyn Fn(&Error, u64) -> CancelFuture + Send + Sync>;

/// A cancel handler that never cancels.
pub fn never_cancel() -> CancelHandler {
    Arc::new(|_, _| Box::pin(std::future::pending()))
}

/// Computes backoff delays and enforces the attempt budget.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS)
    }
}

impl RetryPolicy {
    /// Creates a policy with a total budget of `max_attempts` attempts
    /// (clamped to at least one).
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Runs `attempt` until it succeeds, the budget is exhausted, or `on_wait`
    /// cancels the session during a backoff wait.
    ///
    /// The terminal errors carry the error from the attempt that triggered
    /// them; cancellation never invents a new error.
    pub async fn run<T, F, Fut, C>(&self, mut on_wait: C, mut attempt: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
        C: FnMut(&Error, u64) -> CancelFuture,
    {
        let mut attempts_made = 0;
        loop {
            match attempt().await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    attempts_made += 1;
                    if attempts_made >= self.max_attempts {
                        return Err(Error::RetryGivenUp(Box::new(e)));
                    }
                    let delay = backoff_delay(attempts_made);
                    debug!("attempt {attempts_made} failed, retrying in {delay}s: {e}");
                    let cancelled = on_wait(&e, delay);
                    tokio::select! {
                        _ = tokio::time::sleep(Duration::from_secs(delay)) => {}
                        _ = cancelled => return Err(Error::RetryCancelled(Box::new(e))),
                    }
                }
            }
        }
    }
}

/// The delay before retry `n` (1-indexed): a fresh random whole number of
/// seconds in `[1, 2^n)`, so the jitter window doubles with each retry.
fn backoff_delay(retry: u32) -> u64 {
    let upper = 1u64 << retry.min(62);
    rand::thread_rng().gen_range(1..upper.max(2))
}
