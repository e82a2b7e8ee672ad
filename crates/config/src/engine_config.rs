//! Copy, alert and verification tuning

use crate::validation::{ConfigSection, ValidationError, Validator};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Settings for the sync executor, alert manager and scorer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    /// Copy attempts per cycle before the destination counts as permanently locked
    pub max_copy_attempts: u32,

    /// Fixed wait between copy attempts
    pub copy_retry_backoff_secs: u64,

    /// Largest accepted size difference between source and destination
    pub size_tolerance_bytes: u64,

    /// File name prefix of the visible alert marker
    pub alert_marker_prefix: String,

    /// Wait after creating the marker so the sync client can upload it
    pub alert_settle_secs: u64,

    /// Minimum time the marker stays visible before removal
    pub alert_min_visible_secs: u64,

    /// Removal attempts for the marker
    pub alert_removal_attempts: u32,

    /// Initial wait between removal attempts, doubled each time
    pub alert_removal_backoff_secs: u64,

    /// Confidence percentage at which a verification counts as successful
    pub success_threshold_pct: u8,

    /// How recent the destination mtime must be to count as fresh
    pub freshness_window_secs: u64,

    /// Watcher events for the same file within this window collapse into one
    pub debounce_secs: u64,
}

impl EngineConfig {
    pub fn copy_retry_backoff(&self) -> Duration {
        Duration::from_secs(self.copy_retry_backoff_secs)
    }

    pub fn alert_settle(&self) -> Duration {
        Duration::from_secs(self.alert_settle_secs)
    }

    pub fn alert_min_visible(&self) -> Duration {
        Duration::from_secs(self.alert_min_visible_secs)
    }

    pub fn alert_removal_backoff(&self) -> Duration {
        Duration::from_secs(self.alert_removal_backoff_secs)
    }

    pub fn freshness_window(&self) -> Duration {
        Duration::from_secs(self.freshness_window_secs)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_secs(self.debounce_secs)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_copy_attempts: 3,
            copy_retry_backoff_secs: 10,
            size_tolerance_bytes: 100,
            alert_marker_prefix: "SYNCING_".to_string(),
            alert_settle_secs: 10,
            alert_min_visible_secs: 12,
            alert_removal_attempts: 3,
            alert_removal_backoff_secs: 2,
            success_threshold_pct: 60,
            freshness_window_secs: 30,
            debounce_secs: 3,
        }
    }
}

impl ConfigSection for EngineConfig {
    fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut results = vec![
            Validator::in_range(self.max_copy_attempts, 1, 10, "engine.max_copy_attempts"),
            Validator::in_range(
                self.copy_retry_backoff_secs,
                0,
                3_600,
                "engine.copy_retry_backoff_secs",
            ),
            Validator::in_range(
                self.alert_removal_attempts,
                1,
                10,
                "engine.alert_removal_attempts",
            ),
            Validator::in_range(
                self.success_threshold_pct,
                0,
                100,
                "engine.success_threshold_pct",
            ),
            Validator::in_range(
                self.freshness_window_secs,
                1,
                3_600,
                "engine.freshness_window_secs",
            ),
            Validator::in_range(self.debounce_secs, 0, 300, "engine.debounce_secs"),
            Validator::not_empty(&self.alert_marker_prefix, "engine.alert_marker_prefix"),
        ];

        if self
            .alert_marker_prefix
            .chars()
            .any(std::path::is_separator)
        {
            results.push(Err(ValidationError::with_value(
                "engine.alert_marker_prefix",
                "must not contain path separators",
                &self.alert_marker_prefix,
            )));
        }

        Validator::collect_errors(results)
    }

    fn merge(&mut self, other: Self) {
        *self = other;
    }

    fn section_name(&self) -> &'static str {
        "engine"
    }
}
