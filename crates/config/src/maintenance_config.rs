//! Cleanup of leftover marker files

use crate::validation::{ConfigSection, ValidationError, Validator};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Settings for the maintenance sweep
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MaintenanceConfig {
    /// Blocked markers older than this are deleted
    pub blocked_marker_max_age_hours: u64,

    /// Run a sweep when the engine starts
    pub sweep_on_start: bool,
}

impl MaintenanceConfig {
    pub fn blocked_marker_max_age(&self) -> Duration {
        Duration::from_secs(self.blocked_marker_max_age_hours * 3_600)
    }
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self {
            blocked_marker_max_age_hours: 24,
            sweep_on_start: true,
        }
    }
}

impl ConfigSection for MaintenanceConfig {
    fn validate(&self) -> Result<(), Vec<ValidationError>> {
        Validator::collect_errors(vec![Validator::in_range(
            self.blocked_marker_max_age_hours,
            1,
            24 * 365,
            "maintenance.blocked_marker_max_age_hours",
        )])
    }

    fn merge(&mut self, other: Self) {
        self.blocked_marker_max_age_hours = other.blocked_marker_max_age_hours;
        self.sweep_on_start = other.sweep_on_start;
    }

    fn section_name(&self) -> &'static str {
        "maintenance"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = MaintenanceConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.blocked_marker_max_age(), Duration::from_secs(86_400));
    }

    #[test]
    fn test_zero_age_rejected() {
        let config = MaintenanceConfig {
            blocked_marker_max_age_hours: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
