//! Conflict context assembled at the start of each cycle

use serde::{Deserialize, Serialize};

/// Minutes after which the last sync counts as stale
pub const STALE_SYNC_MINUTES: f64 = 60.0;

/// Editing state observed on both ends of the sync
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditingState {
    pub source_editing: bool,
    pub dest_editing: bool,
}

impl EditingState {
    /// Returns true if either side is being edited
    pub fn any(&self) -> bool {
        self.source_editing || self.dest_editing
    }

    /// Returns true if both sides are being edited
    pub fn both(&self) -> bool {
        self.source_editing && self.dest_editing
    }
}

/// Everything the decision policy looks at
///
/// Built fresh per cycle and never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConflictContext {
    pub source_editing: bool,
    pub dest_editing: bool,
    pub is_critical_file: bool,
    pub is_business_hours: bool,
    pub change_size_bytes: u64,
    /// `None` when no sync has happened yet in this process
    pub last_sync_minutes_ago: Option<f64>,
}

impl ConflictContext {
    /// Builds a context from the detector output and the derived file facts
    pub fn new(
        editing: EditingState,
        is_critical_file: bool,
        is_business_hours: bool,
        change_size_bytes: u64,
        last_sync_minutes_ago: Option<f64>,
    ) -> Self {
        Self {
            source_editing: editing.source_editing,
            dest_editing: editing.dest_editing,
            is_critical_file,
            is_business_hours,
            change_size_bytes,
            last_sync_minutes_ago,
        }
    }

    /// Returns the editing half of the context
    pub fn editing(&self) -> EditingState {
        EditingState {
            source_editing: self.source_editing,
            dest_editing: self.dest_editing,
        }
    }

    /// Returns true if any editing conflict is present
    pub fn has_conflict(&self) -> bool {
        self.editing().any()
    }

    /// Returns true if the last sync is older than an hour or never happened
    pub fn last_sync_is_stale(&self) -> bool {
        self.last_sync_minutes_ago
            .is_none_or(|minutes| minutes >= STALE_SYNC_MINUTES)
    }
}
