// crates/resilience/src/retry.rs
//! Retrying blocking operations on a [`Clock`]
//!
//! Backoff waits go through the clock, so a cancel token ends them early and
//! tests can run the whole schedule on a `VirtualClock`.

use crate::clock::{CancelToken, Clock};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// How long to wait after a failed attempt
#[derive(Debug, Clone, Copy, PartialEq)]
enum Backoff {
    /// Same delay after every failure
    Fixed(Duration),
    /// `initial * 2^(n-1)` after failure `n`, never more than `cap`
    Exponential { initial: Duration, cap: Duration },
}

impl Backoff {
    fn after(&self, failures: usize) -> Duration {
        match *self {
            Backoff::Fixed(delay) => delay,
            Backoff::Exponential { initial, cap } => {
                let exponent = u32::try_from(failures.saturating_sub(1)).unwrap_or(u32::MAX);
                2u32.checked_pow(exponent)
                    .and_then(|scale| initial.checked_mul(scale))
                    .map_or(cap, |delay| delay.min(cap))
            }
        }
    }
}

/// Attempt budget plus backoff
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    max_attempts: usize,
    backoff: Backoff,
}

impl RetryPolicy {
    /// `max_attempts` tries with `delay` between each
    pub fn fixed(max_attempts: usize, delay: Duration) -> Self {
        Self {
            max_attempts,
            backoff: Backoff::Fixed(delay),
        }
    }

    /// Doubling delays starting at `initial`, capped at 30 seconds
    pub fn exponential(max_attempts: usize, initial: Duration) -> Self {
        Self {
            max_attempts,
            backoff: Backoff::Exponential {
                initial,
                cap: Duration::from_secs(30),
            },
        }
    }

    /// Changes the ceiling of an exponential policy; fixed policies are unchanged
    pub fn capped_at(mut self, max_delay: Duration) -> Self {
        if let Backoff::Exponential { cap, .. } = &mut self.backoff {
            *cap = max_delay;
        }
        self
    }

    /// Wait after the `failures`-th failed attempt; zero before any failure
    pub fn delay_for_attempt(&self, failures: usize) -> Duration {
        if failures == 0 {
            Duration::ZERO
        } else {
            self.backoff.after(failures)
        }
    }

    pub fn max_attempts(&self) -> usize {
        self.max_attempts
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::exponential(3, Duration::from_millis(100))
    }
}

/// Why a retried operation gave up
#[derive(Debug, Error)]
pub enum RetryFailure<E: fmt::Display> {
    /// Every attempt failed with a retryable error
    #[error("all {attempts} attempts failed: {last_error}")]
    Exhausted { attempts: usize, last_error: E },

    /// An attempt failed with an error that must not be retried
    #[error("attempt {attempt} failed permanently: {error}")]
    Aborted { attempt: usize, error: E },

    /// The cancel token fired during a backoff
    #[error("cancelled after {attempts} attempts")]
    Cancelled { attempts: usize, last_error: E },
}

impl<E: fmt::Display> RetryFailure<E> {
    /// Number of attempts that were made
    pub fn attempts(&self) -> usize {
        match self {
            Self::Exhausted { attempts, .. } | Self::Cancelled { attempts, .. } => *attempts,
            Self::Aborted { attempt, .. } => *attempt,
        }
    }
}

/// Executes an operation, retrying every error
///
/// The operation receives the 1-based attempt number.
pub fn with_retry<F, T, E>(
    policy: &RetryPolicy,
    clock: &dyn Clock,
    cancel: &CancelToken,
    operation: F,
) -> Result<T, RetryFailure<E>>
where
    F: FnMut(usize) -> Result<T, E>,
    E: fmt::Display,
{
    with_retry_when(policy, clock, cancel, |_| true, operation)
}

/// Executes an operation, retrying only errors accepted by `is_retryable`
pub fn with_retry_when<F, P, T, E>(
    policy: &RetryPolicy,
    clock: &dyn Clock,
    cancel: &CancelToken,
    is_retryable: P,
    mut operation: F,
) -> Result<T, RetryFailure<E>>
where
    F: FnMut(usize) -> Result<T, E>,
    P: Fn(&E) -> bool,
    E: fmt::Display,
{
    let max_attempts = policy.max_attempts().max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;
        let error = match operation(attempt) {
            Ok(result) => return Ok(result),
            Err(e) => e,
        };

        if !is_retryable(&error) {
            return Err(RetryFailure::Aborted { attempt, error });
        }

        if attempt >= max_attempts {
            return Err(RetryFailure::Exhausted {
                attempts: attempt,
                last_error: error,
            });
        }

        let delay = policy.delay_for_attempt(attempt);
        if clock.sleep(delay, cancel).is_cancelled() {
            return Err(RetryFailure::Cancelled {
                attempts: attempt,
                last_error: error,
            });
        }
    }
}
