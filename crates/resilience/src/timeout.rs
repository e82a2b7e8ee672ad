// crates/resilience/src/timeout.rs
//! Timeout handling for blocking operations
//!
//! The operation runs on its own thread. When the deadline passes the caller
//! gets `ResilienceError::Timeout` right away and the thread is abandoned; it
//! keeps running until the operation returns on its own.

use crate::error::{ResilienceError, ResilienceResult};
use crossbeam_channel::{bounded, RecvTimeoutError};
use std::thread;
use std::time::Duration;

/// Executes an operation, giving up after `duration`
pub fn with_timeout<F, T>(duration: Duration, operation: F) -> ResilienceResult<T>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    let (tx, rx) = bounded(1);

    thread::Builder::new()
        .name("syncguard-timeout".to_string())
        .spawn(move || {
            // The receiver may be gone after a timeout.
            let _ = tx.send(operation());
        })
        .map_err(|e| ResilienceError::Custom(format!("failed to spawn worker: {}", e)))?;

    match rx.recv_timeout(duration) {
        Ok(result) => Ok(result),
        Err(RecvTimeoutError::Timeout) => Err(ResilienceError::Timeout(duration)),
        Err(RecvTimeoutError::Disconnected) => {
            Err(ResilienceError::Custom("operation panicked".to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn test_timeout_success() {
        let result = with_timeout(Duration::from_secs(1), || {
            std::thread::sleep(Duration::from_millis(10));
            42
        });

        assert_eq!(result.ok(), Some(42));
    }

    #[test]
    fn test_timeout_exceeded_returns_early() {
        let started = Instant::now();
        let result = with_timeout(Duration::from_millis(20), || {
            std::thread::sleep(Duration::from_secs(2));
            42
        });

        assert!(matches!(result, Err(ResilienceError::Timeout(_))));
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_panicking_operation() {
        let result: ResilienceResult<()> =
            with_timeout(Duration::from_secs(1), || panic!("nudge exploded"));
        assert!(matches!(result, Err(ResilienceError::Custom(_))));
    }
}
