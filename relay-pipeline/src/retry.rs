//! Retry with jittered exponential backoff
//!
//! Attempt `k` that fails is followed by a sleep of
//! `base_delay * 2^(k-1) + jitter`, jitter uniform in `[0, base_delay)`.
//! There is no sleep after the final attempt. The run deadline is checked
//! before every attempt and raced against every sleep.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use rand::Rng;
use relay_core::Deadline;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum RetryError<E> {
    /// The deadline fired before an attempt or during a backoff sleep
    #[error("interrupted after {attempts} attempt(s): deadline exceeded")]
    Interrupted { attempts: u32 },

    /// Every attempt failed; carries the last error
    #[error("failed after {attempts} attempt(s): {last}")]
    Exhausted { attempts: u32, last: E },
}

/// Retry policy; holds no state between calls
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    /// Total attempts, including the first
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Backoff {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
        }
    }

    /// Exponential part of the delay after failed attempt `attempt` (1-based)
    pub fn base_delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        self.base_delay.saturating_mul(1u32 << exponent)
    }

    /// Full delay after failed attempt `attempt`, jitter included
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay_for(attempt) + self.jitter()
    }

    fn jitter(&self) -> Duration {
        let bound = self.base_delay.as_nanos().min(u64::MAX as u128) as u64;
        if bound == 0 {
            return Duration::ZERO;
        }
        Duration::from_nanos(rand::thread_rng().gen_range(0..bound))
    }

    /// Runs `op` until it succeeds, attempts run out, or `deadline` fires
    ///
    /// `op` receives the 1-based attempt number.
    pub async fn retry<T, E, F, Fut>(&self, deadline: &Deadline, mut op: F) -> Result<T, RetryError<E>>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            if deadline.is_done() {
                return Err(RetryError::Interrupted {
                    attempts: attempt - 1,
                });
            }

            let error = match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(e) => e,
            };

            if attempt >= max_attempts {
                return Err(RetryError::Exhausted {
                    attempts: attempt,
                    last: error,
                });
            }

            let delay = self.delay_for(attempt);
            debug!(attempt, max_attempts, ?delay, error = %error, "Attempt failed, backing off");

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = deadline.done() => {
                    return Err(RetryError::Interrupted { attempts: attempt });
                }
            }

            attempt += 1;
        }
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(1))
    }
}
