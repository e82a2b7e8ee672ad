//! Source and destination paths of the tracked file

use crate::validation::{ConfigSection, ValidationError, Validator};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Where the tracked file lives and where it is published
///
/// Both paths are empty by default; `syncguard init` writes a template the
/// operator fills in.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PathsConfig {
    /// Local working copy of the file
    pub source: PathBuf,

    /// File inside the directory watched by the cloud-sync client
    pub destination: PathBuf,
}

impl PathsConfig {
    /// Returns true once both paths are filled in
    pub fn is_configured(&self) -> bool {
        !self.source.as_os_str().is_empty() && !self.destination.as_os_str().is_empty()
    }

    /// Checks what has to hold before the engine can start
    ///
    /// Both paths must be set and the source must exist. A missing destination
    /// directory is fine; it is created on the first copy.
    pub fn check_runnable(&self) -> Result<(), Vec<ValidationError>> {
        let mut results = Vec::new();

        if self.source.as_os_str().is_empty() {
            results.push(Err(ValidationError::new("paths.source", "must be set")));
        } else {
            results.push(Validator::path_exists(&self.source, "paths.source"));
        }

        if self.destination.as_os_str().is_empty() {
            results.push(Err(ValidationError::new("paths.destination", "must be set")));
        }

        Validator::collect_errors(results)
    }
}

impl ConfigSection for PathsConfig {
    fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut results = Vec::new();

        if !self.source.as_os_str().is_empty() {
            results.push(Validator::has_file_name(&self.source, "paths.source"));
        }
        if !self.destination.as_os_str().is_empty() {
            results.push(Validator::has_file_name(
                &self.destination,
                "paths.destination",
            ));
        }
        if self.is_configured() {
            results.push(Validator::distinct_paths(
                &self.source,
                &self.destination,
                "paths.destination",
                "paths.source",
            ));
        }

        Validator::collect_errors(results)
    }

    fn merge(&mut self, other: Self) {
        if !other.source.as_os_str().is_empty() {
            self.source = other.source;
        }
        if !other.destination.as_os_str().is_empty() {
            self.destination = other.destination;
        }
    }

    fn section_name(&self) -> &'static str {
        "paths"
    }
}
