//! Individual copy attempts within a cycle

use crate::types::Timestamp;
use serde::{Deserialize, Serialize};

/// How a single copy attempt ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttemptOutcome {
    /// Copy landed within the size tolerance
    Success,
    /// Destination locked or copy incomplete; another attempt may follow
    LockedRetry,
    /// The attempt ended the cycle
    PermanentFailure,
}

/// Record of one copy attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncAttempt {
    /// 1-based
    pub attempt_number: u32,
    pub started_at: Timestamp,
    pub outcome: AttemptOutcome,
    pub bytes_source: u64,
    /// Zero when the destination was never written
    pub bytes_dest: u64,
}

impl SyncAttempt {
    /// Returns true if this attempt succeeded
    pub fn succeeded(&self) -> bool {
        self.outcome == AttemptOutcome::Success
    }

    /// Absolute size difference between source and destination
    pub fn size_delta(&self) -> u64 {
        self.bytes_source.abs_diff(self.bytes_dest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_delta_is_symmetric() {
        let mut attempt = SyncAttempt {
            attempt_number: 1,
            started_at: Timestamp::from_millis(0),
            outcome: AttemptOutcome::Success,
            bytes_source: 1000,
            bytes_dest: 950,
        };
        assert_eq!(attempt.size_delta(), 50);
        attempt.bytes_dest = 1050;
        assert_eq!(attempt.size_delta(), 50);
        assert!(attempt.succeeded());
    }
}
