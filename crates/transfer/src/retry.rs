//! The two retry strategies used by the publish pipeline.
//!
//! [`RetryPolicy`] bounds uploads by attempt count with exponential backoff.
//! [`PollPolicy`] bounds sentinel polling by a fixed interval and a fixed
//! attempt count, which yields a deterministic worst-case wait.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tracing::debug;

use crate::abort::{AbortSignal, Aborted};

/// Default number of upload retries after the first attempt.
pub const DEFAULT_RETRIES: u32 = 5;

/// Default sentinel poll interval.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Default sentinel poll attempts: a little over the three minute remote
/// unpack timeout at the default interval.
pub const DEFAULT_POLL_ATTEMPTS: u32 = 185;

/// Failure of a single attempt, tagged with whether another attempt may help.
#[derive(Debug)]
pub enum Attempt<E> {
    /// Transient; the driver tries again while budget remains.
    Retry(E),
    /// Permanent; the driver stops immediately.
    Bail(E),
}

/// Attempt-count bounded retries with exponential backoff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub retries: u32,
    /// Delay before the first retry.
    pub min_delay: Duration,
    /// Backoff cap.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: DEFAULT_RETRIES,
            min_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Retries immediately, `retries` times.
    pub fn immediate(retries: u32) -> Self {
        Self {
            retries,
            min_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.retries.saturating_add(1)
    }

    /// Delay before retry number `retry` (1-based), doubling each time.
    pub fn delay_for_retry(&self, retry: u32) -> Duration {
        let exp = retry.saturating_sub(1).min(31);
        self.min_delay
            .saturating_mul(1u32 << exp)
            .min(self.max_delay)
    }

    /// Runs `op` until it succeeds, bails, or the attempt budget is spent.
    ///
    /// `op` receives the 1-based attempt number. The signal is checked before
    /// every attempt and interrupts the backoff sleep. On exhaustion the last
    /// attempt's error is returned.
    pub async fn run<T, E, F, Fut>(&self, abort: &AbortSignal, mut op: F) -> Result<T, E>
    where
        E: From<Aborted> + Display,
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, Attempt<E>>>,
    {
        let max_attempts = self.max_attempts();
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            abort.check()?;

            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(Attempt::Bail(e)) => return Err(e),
                Err(Attempt::Retry(e)) if attempt >= max_attempts => return Err(e),
                Err(Attempt::Retry(e)) => {
                    let delay = self.delay_for_retry(attempt);
                    debug!(attempt, max_attempts, ?delay, error = %e, "attempt failed, retrying");
                    sleep_or_abort(abort, delay).await?;
                }
            }
        }
    }
}

/// Fixed-interval polling bounded by a fixed attempt count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            max_attempts: DEFAULT_POLL_ATTEMPTS,
        }
    }
}

impl PollPolicy {
    /// Upper bound on the time spent sleeping between polls.
    pub fn deadline(&self) -> Duration {
        self.interval.saturating_mul(self.max_attempts)
    }

    /// Polls `op` until it succeeds, bails, or `max_attempts` polls were made.
    ///
    /// Always makes at least one attempt. The signal is checked before every
    /// poll and interrupts the interval sleep.
    pub async fn run<T, E, F, Fut>(&self, abort: &AbortSignal, mut op: F) -> Result<T, E>
    where
        E: From<Aborted> + Display,
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, Attempt<E>>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            abort.check()?;

            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(Attempt::Bail(e)) => return Err(e),
                Err(Attempt::Retry(e)) if attempt >= max_attempts => {
                    debug!(attempt, error = %e, "poll budget exhausted");
                    return Err(e);
                }
                Err(Attempt::Retry(_)) => sleep_or_abort(abort, self.interval).await?,
            }
        }
    }
}

async fn sleep_or_abort(abort: &AbortSignal, delay: Duration) -> Result<(), Aborted> {
    tokio::select! {
        biased;
        _ = abort.aborted() => Err(Aborted(abort.reason())),
        _ = tokio::time::sleep(delay) => Ok(()),
    }
}
