// crates/resilience/src/lib.rs
//! Resilience patterns for sync cycles
//!
//! This module provides:
//! - A [`Clock`] abstraction with a real, cancellable clock and a virtual one for tests
//! - Retry with fixed or doubling backoff, waiting on the clock
//! - Timeouts that abandon a blocking operation
//!
//! # Example
//!
//! ```rust
//! use syncguard_resilience::{with_retry, CancelToken, RetryPolicy, VirtualClock};
//! use std::time::Duration;
//!
//! let clock = VirtualClock::starting_now();
//! let policy = RetryPolicy::fixed(3, Duration::from_secs(10));
//!
//! let result = with_retry(&policy, &clock, &CancelToken::new(), |attempt| {
//!     if attempt < 2 { Err("locked") } else { Ok(attempt) }
//! });
//!
//! assert_eq!(result.ok(), Some(2));
//! assert_eq!(clock.total_slept(), Duration::from_secs(10));
//! ```

mod clock;
mod error;
mod retry;
mod timeout;

pub use clock::{CancelToken, Clock, SleepOutcome, SystemClock, VirtualClock};
pub use error::{ResilienceError, ResilienceResult};
pub use retry::{with_retry, with_retry_when, RetryFailure, RetryPolicy};
pub use timeout::with_timeout;
