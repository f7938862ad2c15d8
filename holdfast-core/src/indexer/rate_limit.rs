//! A shared rate-limited transport wrapping outbound indexer HTTP calls:
//! an in-process, per-indexer token bucket. There is no cross-node state
//! to coordinate here, so a distributed limiter would be unjustified
//! complexity (see `DESIGN.md`).

use std::time::Duration;

use parking_lot::Mutex;
use rand::Rng;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::error::{CoreError, CoreResult};

/// Per-provider rate limit configuration: base retry interval and the
/// ceiling on retry attempts before giving up.
#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    pub max_attempts: u32,
    pub base_interval: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        RateLimitConfig {
            max_attempts: 5,
            base_interval: Duration::from_millis(500),
        }
    }
}

struct BucketState {
    /// Earliest instant the bucket allows another request without waiting.
    next_allowed: Instant,
}

/// A token-bucket limiter with `Retry-After` honoring exponential backoff,
/// held behind a `parking_lot::Mutex` so backoff state serializes but raw
/// request concurrency above that is unconstrained.
pub struct RateLimiter {
    config: RateLimitConfig,
    state: Mutex<BucketState>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        RateLimiter {
            config,
            state: Mutex::new(BucketState { next_allowed: Instant::now() }),
        }
    }

    /// Runs `call`, retrying on [`RetryHint::After`] responses up to
    /// `max_attempts`, honoring an explicit `Retry-After` when the callback
    /// reports one and falling back to `base * 2^attempt` with jitter
    /// otherwise.
    pub async fn call<F, Fut, T>(&self, mut call: F) -> CoreResult<T>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T, RetryHint>>,
    {
        for attempt in 0..self.config.max_attempts {
            self.wait_for_slot().await;
            match call().await {
                Ok(value) => return Ok(value),
                Err(RetryHint::Terminal(msg)) => return Err(CoreError::external(msg)),
                Err(RetryHint::After(wait)) => {
                    debug!(attempt, wait_ms = wait.as_millis() as u64, "indexer rate limited, retrying");
                    self.set_next_allowed(wait);
                    tokio::time::sleep(wait).await;
                }
                Err(RetryHint::Backoff) => {
                    let wait = backoff_with_jitter(self.config.base_interval, attempt);
                    debug!(attempt, wait_ms = wait.as_millis() as u64, "indexer backoff, retrying");
                    self.set_next_allowed(wait);
                    tokio::time::sleep(wait).await;
                }
            }
        }
        warn!(attempts = self.config.max_attempts, "indexer retry ceiling reached");
        Err(CoreError::external("rate limit retry ceiling reached"))
    }

    async fn wait_for_slot(&self) {
        let deadline = self.state.lock().next_allowed;
        let now = Instant::now();
        if deadline > now {
            tokio::time::sleep(deadline - now).await;
        }
    }

    fn set_next_allowed(&self, wait: Duration) {
        self.state.lock().next_allowed = Instant::now() + wait;
    }
}

/// What a single provider call attempt learned about whether/how to retry.
pub enum RetryHint {
    /// The server gave an explicit wait via `Retry-After`.
    After(Duration),
    /// No `Retry-After` header; use the configured exponential backoff.
    Backoff,
    /// Not recoverable by retrying (e.g. a 4xx unrelated to rate limiting).
    Terminal(String),
}

fn backoff_with_jitter(base: Duration, attempt: u32) -> Duration {
    let exp = base.as_millis() as u64 * 2u64.saturating_pow(attempt);
    let jitter_ms = rand::thread_rng().gen_range(0..=50);
    Duration::from_millis(exp.saturating_add(jitter_ms))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn retries_until_success_honoring_retry_after() {
        let limiter = RateLimiter::new(RateLimitConfig {
            max_attempts: 5,
            base_interval: Duration::from_millis(10),
        });
        let attempts = AtomicU32::new(0);
        let start = Instant::now();
        let result = limiter
            .call(|| {
                let n = attempts.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err(RetryHint::After(Duration::from_millis(20)))
                    } else {
                        Ok(42)
                    }
                }
            })
            .await
            .unwrap();
        assert_eq!(result, 42);
        assert!(start.elapsed() >= Duration::from_millis(40));
    }

    #[tokio::test]
    async fn terminal_errors_do_not_retry() {
        let limiter = RateLimiter::new(RateLimitConfig::default());
        let attempts = AtomicU32::new(0);
        let result: CoreResult<()> = limiter
            .call(|| {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Err(RetryHint::Terminal("bad request".into())) }
            })
            .await;
        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn exhausting_retries_returns_external_error() {
        let limiter = RateLimiter::new(RateLimitConfig {
            max_attempts: 2,
            base_interval: Duration::from_millis(1),
        });
        let result: CoreResult<()> = limiter
            .call(|| async { Err(RetryHint::Backoff) })
            .await;
        assert!(matches!(result, Err(CoreError::External(_))));
    }
}
