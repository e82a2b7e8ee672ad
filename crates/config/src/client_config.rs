//! External cloud-sync client and force-visibility nudges

use crate::validation::{ConfigSection, ValidationError, Validator};
use directories::BaseDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// How the engine finds, observes and prods the cloud-sync client
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ClientConfig {
    /// Whether a client is expected on this machine
    pub enabled: bool,

    /// Process names to look for, matched case-insensitively with or without `.exe`
    pub process_names: Vec<String>,

    /// Executables tried in order when the client has to be relaunched
    pub executable_paths: Vec<PathBuf>,

    /// Upper bound for any single nudge
    pub nudge_timeout_secs: u64,

    /// How long short-lived nudge files stay on disk
    pub nudge_settle_millis: u64,

    /// Wait between terminating and relaunching the client
    pub restart_grace_secs: u64,
}

impl ClientConfig {
    pub fn nudge_timeout(&self) -> Duration {
        Duration::from_secs(self.nudge_timeout_secs)
    }

    pub fn nudge_settle(&self) -> Duration {
        Duration::from_millis(self.nudge_settle_millis)
    }

    pub fn restart_grace(&self) -> Duration {
        Duration::from_secs(self.restart_grace_secs)
    }

    /// Usual OneDrive install locations
    fn default_executable_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();
        if let Some(dirs) = BaseDirs::new() {
            paths.push(
                dirs.data_local_dir()
                    .join("Microsoft")
                    .join("OneDrive")
                    .join("OneDrive.exe"),
            );
        }
        paths.push(PathBuf::from(
            r"C:\Program Files\Microsoft OneDrive\OneDrive.exe",
        ));
        paths.push(PathBuf::from(
            r"C:\Program Files (x86)\Microsoft OneDrive\OneDrive.exe",
        ));
        paths.push(PathBuf::from("/Applications/OneDrive.app/Contents/MacOS/OneDrive"));
        paths
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            process_names: vec!["OneDrive".to_string()],
            executable_paths: Self::default_executable_paths(),
            nudge_timeout_secs: 10,
            nudge_settle_millis: 1_500,
            restart_grace_secs: 3,
        }
    }
}

impl ConfigSection for ClientConfig {
    fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut results = vec![
            Validator::in_range(self.nudge_timeout_secs, 1, 120, "client.nudge_timeout_secs"),
            Validator::in_range(
                self.nudge_settle_millis,
                0,
                60_000,
                "client.nudge_settle_millis",
            ),
            Validator::in_range(self.restart_grace_secs, 0, 60, "client.restart_grace_secs"),
            Validator::no_blank_entries(&self.process_names, "client.process_names"),
        ];

        if self.enabled {
            results.push(Validator::not_empty_list(
                &self.process_names,
                "client.process_names",
            ));
        }

        Validator::collect_errors(results)
    }

    fn merge(&mut self, other: Self) {
        *self = other;
    }

    fn section_name(&self) -> &'static str {
        "client"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = ClientConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.enabled);
        assert!(!config.executable_paths.is_empty());
    }

    #[test]
    fn test_enabled_requires_process_names() {
        let mut config = ClientConfig {
            process_names: Vec::new(),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        config.enabled = false;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let config = ClientConfig {
            nudge_timeout_secs: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_duration_helpers() {
        let config = ClientConfig::default();
        assert_eq!(config.nudge_timeout(), Duration::from_secs(10));
        assert_eq!(config.nudge_settle(), Duration::from_millis(1_500));
        assert_eq!(config.restart_grace(), Duration::from_secs(3));
    }
}
