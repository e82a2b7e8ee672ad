// crates/resilience/src/error.rs
//! Errors from running an operation under a deadline

use std::time::Duration;
use thiserror::Error;

pub type ResilienceResult<T> = Result<T, ResilienceError>;

#[derive(Debug, Error)]
pub enum ResilienceError {
    /// The operation was still running when its deadline passed
    #[error("no result after {0:?}")]
    Timeout(Duration),

    #[error("{0}")]
    Custom(String),
}
