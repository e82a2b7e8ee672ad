//! Visible alert markers placed next to the destination

use crate::types::{CycleId, Timestamp};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A marker file announcing that the destination is being updated
///
/// At most one unremoved marker exists per destination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertFile {
    pub path: PathBuf,
    pub cycle_id: CycleId,
    pub created_at: Timestamp,
    pub removed_at: Option<Timestamp>,
}

impl AlertFile {
    /// Creates a record for a freshly written marker
    pub fn new(path: impl Into<PathBuf>, cycle_id: CycleId, created_at: Timestamp) -> Self {
        Self {
            path: path.into(),
            cycle_id,
            created_at,
            removed_at: None,
        }
    }

    /// Returns true while the marker has not been removed
    pub fn is_active(&self) -> bool {
        self.removed_at.is_none()
    }
}

/// What happened to the alert marker during one cycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlertOutcome {
    /// Marker created and later removed
    Completed(AlertFile),
    /// Marker created but still on disk after the removal budget
    Stray(AlertFile),
    /// A previous marker could not be cleared, so none was created
    Skipped,
    /// The cycle never reached the alert stage
    NotRaised,
}

impl AlertOutcome {
    /// Returns true if a marker is left behind on disk
    pub fn is_stray(&self) -> bool {
        matches!(self, Self::Stray(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alert_lifecycle() {
        let mut alert = AlertFile::new("SYNCING_catalog.txt", CycleId::new(3), Timestamp::from_millis(1));
        assert!(alert.is_active());
        alert.removed_at = Some(Timestamp::from_millis(2));
        assert!(!alert.is_active());
        assert!(!AlertOutcome::Completed(alert.clone()).is_stray());
        assert!(AlertOutcome::Stray(alert).is_stray());
    }
}
