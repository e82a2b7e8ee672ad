// crates/sync-engine/src/error.rs
//! Error types for engine setup and lifecycle
//!
//! Failures inside a cycle never show up here; they are reported through
//! `CycleReport`. These errors cover starting, feeding and stopping the engine.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors that can occur while setting up or driving the engine
#[derive(Debug, Error)]
pub enum EngineError {
    /// Configuration is not usable for running
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The source file does not exist at start-up
    #[error("Source file not found: {0}")]
    SourceNotFound(PathBuf),

    /// Filesystem watcher could not be set up
    #[error("Watcher error: {0}")]
    Watcher(#[from] notify::Error),

    /// Worker thread could not be started
    #[error("Failed to start worker thread: {0}")]
    WorkerSpawn(std::io::Error),

    /// The worker has stopped and accepts no more events
    #[error("Worker is not running")]
    WorkerStopped,

    /// Generic I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
