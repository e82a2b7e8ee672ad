//! Error taxonomy for synchronization cycles
//!
//! Every failure a cycle can observe is classified into one of three tiers:
//! - **Recoverable**: the copy loop retries it (locked destination, size mismatch)
//! - **Degraded**: logged and folded into the confidence score, never fails a cycle
//! - **Fatal**: the cycle ends as failed and a blocked marker is written
//!
//! Nothing in this enum is ever propagated out of the orchestration loop; it
//! travels inside a `CycleReport` instead.

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use std::fmt;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Error severity classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum ErrorSeverity {
    /// Retried within the attempt budget
    Recoverable,
    /// Lowers confidence but the cycle continues
    Degraded,
    /// Ends the cycle
    Fatal,
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Recoverable => write!(f, "Recoverable"),
            Self::Degraded => write!(f, "Degraded"),
            Self::Fatal => write!(f, "Fatal"),
        }
    }
}

/// Errors produced while enacting a sync decision
#[derive(Error, Debug)]
pub enum SyncError {
    /// The source file vanished before or during the cycle
    #[error("Source file missing: {path}")]
    SourceMissing { path: PathBuf },

    /// An editor holds the destination open (lock artifact or OS refusal)
    #[error("Destination locked: {path}")]
    DestinationLocked { path: PathBuf },

    /// The destination stayed locked for the whole attempt budget
    #[error("Destination permanently locked after {attempts} attempts: {path}")]
    PermanentLock { path: PathBuf, attempts: u32 },

    /// Copied file size differs from the source by more than the tolerance
    #[error("Size mismatch: source {source_bytes} bytes, destination {dest_bytes} bytes (tolerance {tolerance})")]
    SizeMismatch {
        source_bytes: u64,
        dest_bytes: u64,
        tolerance: u64,
    },

    /// The alert marker could not be removed within its retry budget
    #[error("Alert marker not removed after {attempts} attempts: {path}")]
    AlertRemovalFailed { path: PathBuf, attempts: u32 },

    /// A marker for the same destination is still present and could not be cleared
    #[error("Alert marker already present and could not be cleared: {path}")]
    AlertOverlap { path: PathBuf },

    /// The external sync client could not be queried or controlled
    #[error("External sync client unavailable: {reason}")]
    ExternalClientUnavailable { reason: String },

    /// A force-visibility nudge did not finish in time
    #[error("Nudge '{nudge}' timed out after {timeout_secs}s")]
    NudgeTimeout { nudge: String, timeout_secs: u64 },

    /// The safety copy of the destination could not be written
    #[error("Backup of {path} failed: {source}")]
    BackupFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Any other filesystem failure
    #[error("I/O error during {operation}: {source}")]
    Io {
        operation: String,
        #[source]
        source: io::Error,
    },
}

impl SyncError {
    /// Returns the severity tier of this error
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::DestinationLocked { .. } | Self::SizeMismatch { .. } | Self::Io { .. } => {
                ErrorSeverity::Recoverable
            }

            Self::AlertRemovalFailed { .. }
            | Self::AlertOverlap { .. }
            | Self::ExternalClientUnavailable { .. }
            | Self::NudgeTimeout { .. } => ErrorSeverity::Degraded,

            Self::SourceMissing { .. } | Self::PermanentLock { .. } | Self::BackupFailed { .. } => {
                ErrorSeverity::Fatal
            }
        }
    }

    /// Returns true if the copy loop should try again after this error
    pub fn is_retryable(&self) -> bool {
        self.severity() == ErrorSeverity::Recoverable
    }

    /// Returns true if this error ends the cycle on first sight
    pub fn is_fatal(&self) -> bool {
        self.severity() == ErrorSeverity::Fatal
    }

    /// Stable machine-readable identifier, used in JSON output and blocked markers
    pub fn code(&self) -> &'static str {
        match self {
            Self::SourceMissing { .. } => "source_missing",
            Self::DestinationLocked { .. } => "destination_locked",
            Self::PermanentLock { .. } => "permanent_lock",
            Self::SizeMismatch { .. } => "size_mismatch",
            Self::AlertRemovalFailed { .. } => "alert_removal_failed",
            Self::AlertOverlap { .. } => "alert_overlap",
            Self::ExternalClientUnavailable { .. } => "external_client_unavailable",
            Self::NudgeTimeout { .. } => "nudge_timeout",
            Self::BackupFailed { .. } => "backup_failed",
            Self::Io { .. } => "io",
        }
    }

    /// Returns a message suitable for the people watching the shared folder
    pub fn user_message(&self) -> String {
        match self {
            Self::SourceMissing { .. } => {
                "The source file disappeared before it could be synchronized.".to_string()
            }
            Self::DestinationLocked { .. } | Self::PermanentLock { .. } => {
                "The shared file is open in another program. Close it so the update can be applied."
                    .to_string()
            }
            Self::SizeMismatch { .. } => {
                "The shared file could not be updated completely. It will be retried on the next change."
                    .to_string()
            }
            Self::BackupFailed { .. } => {
                "A safety copy of the shared file could not be made, so it was left untouched."
                    .to_string()
            }
            _ => "The shared file could not be updated.".to_string(),
        }
    }

    /// Helper to wrap an I/O error with the operation that produced it
    pub fn io(operation: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            source,
        }
    }
}

impl Serialize for SyncError {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("SyncError", 3)?;
        state.serialize_field("code", self.code())?;
        state.serialize_field("severity", &self.severity())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Convenience type alias for Results using SyncError
pub type Result<T> = std::result::Result<T, SyncError>;
