// crates/sync-engine/src/maintenance.rs
//! Cleanup of leftovers in the destination directory
//!
//! Blocked markers are meant to be read by an operator and then go away;
//! nudge artifacts only outlive their cycle when a process died mid-cycle.

use log::{debug, info, warn};
use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use syncguard_config::MaintenanceConfig;

use crate::nudge::NUDGE_PREFIX;

/// Nudge artifacts younger than this may belong to a running cycle
pub const NUDGE_MIN_AGE: Duration = Duration::from_secs(60);

/// What a sweep removed
#[derive(Debug, Default, Serialize)]
pub struct SweepReport {
    pub blocked_markers: Vec<PathBuf>,
    pub nudge_artifacts: Vec<PathBuf>,
    /// Entries that matched but could not be removed
    pub failures: Vec<(PathBuf, String)>,
}

impl SweepReport {
    pub fn removed(&self) -> usize {
        self.blocked_markers.len() + self.nudge_artifacts.len()
    }
}

/// Removes stale blocked markers for `destination` and orphaned nudge files
///
/// Runs against the destination's directory; a missing directory is an
/// empty sweep.
pub fn sweep(destination: &Path, config: &MaintenanceConfig, now: SystemTime) -> io::Result<SweepReport> {
    let mut report = SweepReport::default();
    let dir = match destination.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let Some(file_name) = destination.file_name().map(|n| n.to_string_lossy().into_owned()) else {
        return Ok(report);
    };
    let blocked_prefix = format!("{}.BLOCKED_", file_name);
    let max_age = config.blocked_marker_max_age();

    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(report),
        Err(e) => return Err(e),
    };

    for entry in entries.filter_map(|e| e.ok()) {
        let name = entry.file_name().to_string_lossy().into_owned();
        let path = entry.path();
        let age = entry
            .metadata()
            .and_then(|m| m.modified())
            .map(|modified| now.duration_since(modified).unwrap_or(Duration::ZERO))
            .unwrap_or(Duration::ZERO);

        if name.starts_with(&blocked_prefix) && name.ends_with(".txt") {
            if age < max_age {
                debug!("Keeping recent blocked marker {}", name);
                continue;
            }
            match fs::remove_file(&path) {
                Ok(()) => report.blocked_markers.push(path),
                Err(e) => report.failures.push((path, e.to_string())),
            }
        } else if name.starts_with(NUDGE_PREFIX) {
            if age < NUDGE_MIN_AGE {
                continue;
            }
            let removed = if path.is_dir() {
                fs::remove_dir_all(&path)
            } else {
                fs::remove_file(&path)
            };
            match removed {
                Ok(()) => report.nudge_artifacts.push(path),
                Err(e) => report.failures.push((path, e.to_string())),
            }
        }
    }

    for (path, reason) in &report.failures {
        warn!("Could not remove {}: {}", path.display(), reason);
    }
    info!(
        "Cleanup removed {} blocked marker(s) and {} nudge artifact(s)",
        report.blocked_markers.len(),
        report.nudge_artifacts.len()
    );
    Ok(report)
}
