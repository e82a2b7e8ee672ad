//! Domain types for SyncGuard
//!
//! This module contains the data model organized by responsibility:
//! - `event`: change events from the watcher
//! - `context`: conflict context consumed by the policy
//! - `decision`: actions and sync decisions
//! - `attempt`: individual copy attempts
//! - `alert`: visible alert markers
//! - `verification`: confidence signals and nudge tallies
//! - `report`: per-cycle reports and outcomes
//! - `stats`: engine counters
//! - `common`: timestamps and cycle ids

mod alert;
mod attempt;
mod common;
mod context;
mod decision;
mod event;
mod report;
mod stats;
mod verification;

pub use alert::{AlertFile, AlertOutcome};
pub use attempt::{AttemptOutcome, SyncAttempt};
pub use common::{CycleId, Timestamp};
pub use context::{ConflictContext, EditingState, STALE_SYNC_MINUTES};
pub use decision::{Action, Impact, SyncDecision};
pub use event::ChangeEvent;
pub use report::{CycleOutcome, CycleReport};
pub use stats::EngineStats;
pub use verification::{
    NudgeFailure, NudgeTally, VerificationResult, VerificationSignals, SIGNAL_COUNT,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_types_are_exported() {
        let _id: CycleId = CycleId::new(1);
        let _stats: EngineStats = EngineStats::empty();
        let _tally: NudgeTally = NudgeTally::default();
        let _editing: EditingState = EditingState::default();
    }

    #[test]
    fn test_timestamp_now_is_after_epoch() {
        assert!(Timestamp::now().as_seconds() > 0);
    }
}
