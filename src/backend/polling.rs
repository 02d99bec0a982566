//! Retry policy for polling long-running operations

use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

use crate::config::PollingConfig;
use crate::error::{AppError, Result};

/// Outcome of a single poll
#[derive(Debug)]
pub enum PollStatus<T> {
    Ready(T),
    Pending,
}

/// How often, and how many times, to poll an operation
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Delay before the second attempt
    pub interval: Duration,
    pub max_attempts: u32,
    /// Growth factor applied to the delay after each attempt (1.0 keeps it fixed)
    pub backoff_multiplier: f64,
    /// Upper bound for any single delay
    pub max_interval: Duration,
    /// Add up to 10% random delay on top of each wait
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::fixed(Duration::from_secs(5), 120)
    }
}

impl RetryPolicy {
    /// Fixed interval, no jitter
    pub fn fixed(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts,
            backoff_multiplier: 1.0,
            max_interval: interval,
            jitter: false,
        }
    }

    /// Poll without waiting between attempts
    pub fn immediate(max_attempts: u32) -> Self {
        Self::fixed(Duration::ZERO, max_attempts)
    }

    /// Delay to wait after the given zero-based attempt
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let factor = self.backoff_multiplier.max(1.0).powi(attempt.min(64) as i32);
        let base = self.interval.as_secs_f64() * factor;
        let capped = base.min(self.max_interval.max(self.interval).as_secs_f64());
        let mut delay = Duration::from_secs_f64(capped);

        if self.jitter && !delay.is_zero() {
            let extra = rand::thread_rng().gen_range(0.0..=0.1);
            delay += delay.mul_f64(extra);
        }

        delay
    }

    /// Worst-case total wait, ignoring jitter and request latency
    pub fn ceiling(&self) -> Duration {
        let policy = Self {
            jitter: false,
            ..self.clone()
        };
        (0..self.max_attempts.saturating_sub(1))
            .map(|attempt| policy.delay_after(attempt))
            .sum()
    }
}

impl From<&PollingConfig> for RetryPolicy {
    fn from(config: &PollingConfig) -> Self {
        Self {
            interval: Duration::from_millis(config.interval_ms),
            max_attempts: config.max_attempts,
            backoff_multiplier: config.backoff_multiplier,
            max_interval: Duration::from_millis(config.max_interval_ms),
            jitter: config.jitter,
        }
    }
}

/// Run `poll` until it reports ready, fails, or the policy runs out of attempts.
///
/// Errors returned by `poll` end the loop immediately; only `Pending` is retried.
pub async fn poll_until<T, F, Fut>(policy: &RetryPolicy, operation: &str, mut poll: F) -> Result<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<PollStatus<T>>>,
{
    for attempt in 0..policy.max_attempts {
        match poll(attempt).await? {
            PollStatus::Ready(value) => {
                debug!(operation = %operation, attempt = attempt + 1, "Operation completed");
                return Ok(value);
            }
            PollStatus::Pending => {
                debug!(operation = %operation, attempt = attempt + 1, "Operation still running");
            }
        }

        if attempt + 1 < policy.max_attempts {
            let delay = policy.delay_after(attempt);
            tokio::time::sleep(delay).await;
        }
    }

    Err(AppError::Timeout(format!(
        "operation {} did not complete after {} attempts",
        operation, policy.max_attempts
    )))
}
