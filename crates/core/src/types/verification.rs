//! Post-copy verification and force-visibility tallies

use serde::{Deserialize, Serialize};

/// Number of independent signals the scorer checks
pub const SIGNAL_COUNT: u8 = 5;

/// Raw observations gathered after a copy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationSignals {
    /// Destination exists with non-zero size
    pub dest_present: bool,
    /// Destination modified within the freshness window
    pub dest_fresh: bool,
    /// External sync client running and using CPU
    pub client_active: bool,
    /// A probe file could be created in the destination directory
    pub dir_writable: bool,
    /// Enough force-visibility nudges succeeded
    pub nudges_effective: bool,
}

impl VerificationSignals {
    /// Number of signals that are set
    pub fn count(&self) -> u8 {
        [
            self.dest_present,
            self.dest_fresh,
            self.client_active,
            self.dir_writable,
            self.nudges_effective,
        ]
        .iter()
        .filter(|s| **s)
        .count() as u8
    }
}

/// Heuristic estimate that a change reached the cloud
///
/// This is not a guarantee: the engine cannot observe the upload itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationResult {
    /// 0..=5
    pub score: u8,
    /// 0..=100
    pub confidence_pct: u8,
    pub successful: bool,
    pub signals: VerificationSignals,
}

/// A nudge that did not work and why
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NudgeFailure {
    pub nudge: String,
    pub reason: String,
}

/// Result of one force-visibility battery
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NudgeTally {
    pub attempted: u32,
    pub succeeded: u32,
    pub failures: Vec<NudgeFailure>,
    pub client_restarted: bool,
}

impl NudgeTally {
    /// Records a successful nudge
    pub fn record_success(&mut self) {
        self.attempted += 1;
        self.succeeded += 1;
    }

    /// Records a failed nudge
    pub fn record_failure(&mut self, nudge: impl Into<String>, reason: impl Into<String>) {
        self.attempted += 1;
        self.failures.push(NudgeFailure {
            nudge: nudge.into(),
            reason: reason.into(),
        });
    }

    /// Combines the tallies of the pre- and post-copy batteries
    pub fn combined(&self, other: &NudgeTally) -> NudgeTally {
        let mut failures = self.failures.clone();
        failures.extend(other.failures.iter().cloned());
        NudgeTally {
            attempted: self.attempted + other.attempted,
            succeeded: self.succeeded + other.succeeded,
            failures,
            client_restarted: self.client_restarted || other.client_restarted,
        }
    }
}
