//! Engine counters exposed to reporters

use crate::types::Timestamp;
use serde::{Deserialize, Serialize};

/// Read-only snapshot of the engine counters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineStats {
    pub changes_detected: u64,
    pub conflicts_detected: u64,
    pub conflicts_resolved: u64,
    pub cycles_attempted: u64,
    pub cycles_succeeded: u64,
    pub cycles_failed: u64,
    pub cycles_cancelled: u64,
    pub cycles_deferred: u64,
    pub stray_alerts: u64,
    pub last_sync_at: Option<Timestamp>,
    /// Rolling mean of recent decision confidences
    pub average_confidence: f64,
}

impl EngineStats {
    /// Creates zeroed statistics
    pub fn empty() -> Self {
        Self::default()
    }

    /// Percentage of attempted cycles that synced
    pub fn success_rate(&self) -> f64 {
        if self.cycles_attempted == 0 {
            return 0.0;
        }
        self.cycles_succeeded as f64 / self.cycles_attempted as f64 * 100.0
    }

    /// Percentage of detected conflicts that ended synced
    pub fn resolution_rate(&self) -> f64 {
        if self.conflicts_detected == 0 {
            return 0.0;
        }
        self.conflicts_resolved as f64 / self.conflicts_detected as f64 * 100.0
    }

    /// Cycles that have not finished yet
    pub fn cycles_pending(&self) -> u64 {
        self.changes_detected.saturating_sub(
            self.cycles_succeeded + self.cycles_failed + self.cycles_cancelled + self.cycles_deferred,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_rates_are_zero() {
        let stats = EngineStats::empty();
        assert_eq!(stats.success_rate(), 0.0);
        assert_eq!(stats.resolution_rate(), 0.0);
    }

    #[test]
    fn test_rates() {
        let stats = EngineStats {
            cycles_attempted: 4,
            cycles_succeeded: 3,
            conflicts_detected: 2,
            conflicts_resolved: 1,
            ..Default::default()
        };
        assert_eq!(stats.success_rate(), 75.0);
        assert_eq!(stats.resolution_rate(), 50.0);
    }

    #[test]
    fn test_pending() {
        let stats = EngineStats {
            changes_detected: 5,
            cycles_succeeded: 2,
            cycles_failed: 1,
            ..Default::default()
        };
        assert_eq!(stats.cycles_pending(), 2);
    }
}
