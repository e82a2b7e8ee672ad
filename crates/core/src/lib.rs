//! Core data model and error taxonomy shared by every SyncGuard crate.

pub mod error;
pub mod types;

// Re-export commonly used types
pub use error::{ErrorSeverity, Result, SyncError};
pub use types::{
    Action, AlertFile, AlertOutcome, AttemptOutcome, ChangeEvent, ConflictContext, CycleId,
    CycleOutcome, CycleReport, EditingState, EngineStats, Impact, NudgeFailure, NudgeTally,
    SyncAttempt, SyncDecision, Timestamp, VerificationResult, VerificationSignals, SIGNAL_COUNT,
};
