//! Change events produced by the file watcher

use crate::types::Timestamp;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// A detected modification of the tracked source file
///
/// Immutable once created; each event drives exactly one sync cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub path: PathBuf,
    pub size: u64,
    pub detected_at: Timestamp,
}

impl ChangeEvent {
    /// Creates a new change event
    pub fn new(path: impl Into<PathBuf>, size: u64, detected_at: Timestamp) -> Self {
        Self {
            path: path.into(),
            size,
            detected_at,
        }
    }

    /// Returns the path of the changed file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the file name as UTF-8, lossy
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}
