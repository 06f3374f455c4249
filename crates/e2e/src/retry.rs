//! Bounded retry-with-backoff polling.
//!
//! Every suspension point (element lookup, assertion, clipboard read) goes
//! through [`poll_until`]. Time is `tokio::time`, so tests run with paused
//! time and never sleep for real.

use crate::config::HarnessConfig;
use crate::result::HarnessResult;
use std::fmt;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

/// Outcome of one polling attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attempt<T> {
    /// Condition satisfied, carrying the observed value
    Ready(T),
    /// Not yet; the string describes what was last observed
    Pending(String),
}

impl<T> Attempt<T> {
    /// Check if the attempt succeeded
    #[must_use]
    pub const fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }
}

/// Polling schedule
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Total time budget
    pub timeout: Duration,
    /// First interval between attempts
    pub poll_interval: Duration,
    /// Multiplier applied after each failed attempt
    pub backoff_factor: f64,
    /// Interval ceiling
    pub max_interval: Duration,
    /// Maximum number of attempts (0 = unlimited within timeout)
    pub max_attempts: usize,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&HarnessConfig::default())
    }
}

impl RetryPolicy {
    /// Build the policy a session uses for lookups and assertions
    #[must_use]
    pub fn from_config(config: &HarnessConfig) -> Self {
        Self {
            timeout: config.timeout(),
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            backoff_factor: config.backoff_factor,
            max_interval: Duration::from_millis(config.max_poll_interval_ms),
            max_attempts: 0,
        }
    }

    /// Short timeout, fast polling
    #[must_use]
    pub const fn fast() -> Self {
        Self {
            timeout: Duration::from_millis(500),
            poll_interval: Duration::from_millis(10),
            backoff_factor: 1.0,
            max_interval: Duration::from_millis(10),
            max_attempts: 0,
        }
    }

    /// Set the timeout
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the maximum number of attempts
    #[must_use]
    pub const fn with_max_attempts(mut self, max: usize) -> Self {
        self.max_attempts = max;
        self
    }

    /// Interval following `current`, capped at `max_interval`
    #[must_use]
    pub fn next_interval(&self, current: Duration) -> Duration {
        let scaled = current.as_secs_f64() * self.backoff_factor.max(1.0);
        Duration::try_from_secs_f64(scaled)
            .map_or(self.max_interval, |next| next.min(self.max_interval))
    }
}

/// Polling gave up
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryExhausted {
    /// Number of attempts made
    pub attempts: usize,
    /// Time spent
    pub elapsed: Duration,
    /// Last observation reported by the check
    pub last_observed: String,
}

impl RetryExhausted {
    /// Elapsed time in whole milliseconds
    #[must_use]
    pub fn waited_ms(&self) -> u64 {
        u64::try_from(self.elapsed.as_millis()).unwrap_or(u64::MAX)
    }
}

impl fmt::Display for RetryExhausted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "gave up after {} attempt(s) ({:.2}s): {}",
            self.attempts,
            self.elapsed.as_secs_f64(),
            self.last_observed
        )
    }
}

/// Poll `check` until it is ready, the budget runs out, or it errors.
///
/// A hard error from `check` aborts immediately; `Pending` retries.
/// The outer `Result` carries hard errors, the inner one exhaustion.
pub async fn poll_until<T, F, Fut>(
    policy: &RetryPolicy,
    mut check: F,
) -> HarnessResult<Result<T, RetryExhausted>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = HarnessResult<Attempt<T>>>,
{
    let start = Instant::now();
    let deadline = start + policy.timeout;
    let mut interval = policy.poll_interval;
    let mut attempts = 0;

    loop {
        attempts += 1;
        let last_observed = match check().await? {
            Attempt::Ready(value) => return Ok(Ok(value)),
            Attempt::Pending(observed) => observed,
        };

        let now = Instant::now();
        let out_of_attempts = policy.max_attempts > 0 && attempts >= policy.max_attempts;
        if now >= deadline || out_of_attempts {
            let exhausted = RetryExhausted {
                attempts,
                elapsed: now - start,
                last_observed,
            };
            tracing::warn!(%exhausted, "polling exhausted");
            return Ok(Err(exhausted));
        }

        tokio::time::sleep(interval.min(deadline - now)).await;
        interval = policy.next_interval(interval);
    }
}
