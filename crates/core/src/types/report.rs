//! Everything one sync cycle produced

use crate::error::SyncError;
use crate::types::{
    AlertOutcome, ChangeEvent, ConflictContext, CycleId, NudgeTally, SyncAttempt, SyncDecision,
    Timestamp, VerificationResult,
};
use serde::Serialize;
use std::path::PathBuf;

/// Final state of a cycle
#[derive(Debug, Serialize)]
#[serde(tag = "status", content = "error")]
pub enum CycleOutcome {
    /// Destination updated within tolerance
    Synced,
    /// The cycle failed; a blocked marker was written where possible
    Failed(SyncError),
    /// Shutdown interrupted the cycle before it finished
    Cancelled,
    /// Alert-only decision; nothing was copied
    Deferred,
}

impl CycleOutcome {
    /// Returns true if the destination was updated
    pub fn is_synced(&self) -> bool {
        matches!(self, Self::Synced)
    }

    /// Returns the failure, if any
    pub fn error(&self) -> Option<&SyncError> {
        match self {
            Self::Failed(err) => Some(err),
            _ => None,
        }
    }

    /// Short lowercase label for logs
    pub fn label(&self) -> &'static str {
        match self {
            Self::Synced => "synced",
            Self::Failed(_) => "failed",
            Self::Cancelled => "cancelled",
            Self::Deferred => "deferred",
        }
    }
}

/// Full record of one cycle, returned to the orchestration loop
#[derive(Debug, Serialize)]
pub struct CycleReport {
    pub cycle_id: CycleId,
    pub event: ChangeEvent,
    pub context: ConflictContext,
    pub decision: SyncDecision,
    pub attempts: Vec<SyncAttempt>,
    pub alert: AlertOutcome,
    pub nudges_before: NudgeTally,
    pub nudges_after: NudgeTally,
    pub backup_path: Option<PathBuf>,
    pub blocked_marker: Option<PathBuf>,
    pub verification: Option<VerificationResult>,
    /// Non-fatal problems that lowered confidence
    pub degraded: Vec<SyncError>,
    pub outcome: CycleOutcome,
    pub started_at: Timestamp,
    pub finished_at: Timestamp,
}

impl CycleReport {
    /// Starts a report for a cycle whose decision has been made
    pub fn begin(
        cycle_id: CycleId,
        event: ChangeEvent,
        context: ConflictContext,
        decision: SyncDecision,
        started_at: Timestamp,
    ) -> Self {
        Self {
            cycle_id,
            event,
            context,
            decision,
            attempts: Vec::new(),
            alert: AlertOutcome::NotRaised,
            nudges_before: NudgeTally::default(),
            nudges_after: NudgeTally::default(),
            backup_path: None,
            blocked_marker: None,
            verification: None,
            degraded: Vec::new(),
            outcome: CycleOutcome::Cancelled,
            started_at,
            finished_at: started_at,
        }
    }

    /// Nudge results of both batteries together
    pub fn nudges_total(&self) -> NudgeTally {
        self.nudges_before.combined(&self.nudges_after)
    }

    /// Returns true if the cycle updated the destination
    pub fn succeeded(&self) -> bool {
        self.outcome.is_synced()
    }
}
