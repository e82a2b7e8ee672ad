// crates/sync-engine/src/alert.rs
//! Visible "sync in progress" markers
//!
//! A marker is a small text file next to the destination that tells people
//! browsing the shared folder not to open the file while it is replaced.
//! At most one marker exists per destination: raising a new one first
//! removes whatever a previous cycle left behind, and gives up with
//! `AlertOverlap` rather than write a duplicate.

use chrono::{DateTime, Local};
use log::{debug, info, warn};
use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use syncguard_config::EngineConfig;
use syncguard_core::{AlertFile, CycleId, SyncError, Timestamp};
use syncguard_resilience::{with_retry, CancelToken, Clock, RetryPolicy, SleepOutcome};

/// Creates, holds and removes alert markers
pub struct AlertManager {
    prefix: String,
    settle: Duration,
    min_visible: Duration,
    removal: RetryPolicy,
    clock: Arc<dyn Clock>,
    active: HashMap<PathBuf, AlertFile>,
}

impl AlertManager {
    pub fn new(config: &EngineConfig, clock: Arc<dyn Clock>) -> Self {
        let removal = RetryPolicy::exponential(
            config.alert_removal_attempts as usize,
            config.alert_removal_backoff(),
        )
        .capped_at(Duration::from_secs(60));

        Self {
            prefix: config.alert_marker_prefix.clone(),
            settle: config.alert_settle(),
            min_visible: config.alert_min_visible(),
            removal,
            clock,
            active: HashMap::new(),
        }
    }

    /// Path of the marker for `destination`
    pub fn marker_path(&self, destination: &Path) -> PathBuf {
        let dir = destination.parent().unwrap_or_else(|| Path::new("."));
        let stem = destination
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "file".to_string());
        dir.join(format!("{}{}.txt", self.prefix, stem))
    }

    /// Returns true while a marker raised by this manager is still on disk
    pub fn has_active(&self, destination: &Path) -> bool {
        self.active.contains_key(destination)
    }

    /// Creates the marker for `destination`
    ///
    /// A marker left by an earlier cycle (or an earlier process) is removed
    /// first. If it cannot be removed the call fails with `AlertOverlap`.
    pub fn raise(
        &mut self,
        destination: &Path,
        cycle_id: CycleId,
        cancel: &CancelToken,
    ) -> Result<AlertFile, SyncError> {
        let path = self.marker_path(destination);

        if self.active.contains_key(destination) || path.exists() {
            warn!(
                "Alert marker from an earlier cycle still present: {}",
                path.display()
            );
            if let Err(e) = self.remove_with_retry(&path, cancel) {
                warn!("Could not clear earlier alert marker: {}", e);
                return Err(SyncError::AlertOverlap { path });
            }
            self.active.remove(destination);
        }

        let created_at = Timestamp::from_system_time(self.clock.now());
        self.write_marker(&path, destination, cycle_id, created_at)
            .map_err(|e| match e.kind() {
                io::ErrorKind::AlreadyExists => SyncError::AlertOverlap { path: path.clone() },
                _ => SyncError::io("create alert marker", e),
            })?;

        info!("Alert marker raised for cycle {}: {}", cycle_id, path.display());
        let alert = AlertFile::new(path, cycle_id, created_at);
        self.active.insert(destination.to_path_buf(), alert.clone());
        Ok(alert)
    }

    /// Holds after raising so watchers of the folder pick the marker up
    pub fn settle(&self, cancel: &CancelToken) -> SleepOutcome {
        debug!("Alert settle for {:?}", self.settle);
        self.clock.sleep(self.settle, cancel)
    }

    /// Removes a marker once it has been visible long enough
    ///
    /// Returns the marker with `removed_at` set. On failure the marker stays
    /// tracked so the next `raise` for the destination retries the removal.
    pub fn clear(&mut self, alert: &AlertFile, cancel: &CancelToken) -> Result<AlertFile, SyncError> {
        let visible = Timestamp::from_system_time(self.clock.now()).since(alert.created_at);
        if visible < self.min_visible {
            self.clock.sleep(self.min_visible - visible, cancel);
        }

        self.remove_with_retry(&alert.path, cancel)?;

        self.active.retain(|_, active| active.path != alert.path);
        let mut removed = alert.clone();
        removed.removed_at = Some(Timestamp::from_system_time(self.clock.now()));
        info!("Alert marker removed: {}", alert.path.display());
        Ok(removed)
    }

    fn remove_with_retry(&self, path: &Path, cancel: &CancelToken) -> Result<(), SyncError> {
        with_retry(&self.removal, self.clock.as_ref(), cancel, |attempt| {
            match fs::remove_file(path) {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
                Err(e) => {
                    debug!(
                        "Marker removal attempt {} failed for {}: {}",
                        attempt,
                        path.display(),
                        e
                    );
                    Err(e)
                }
            }
        })
        .map_err(|failure| {
            let attempts = failure.attempts() as u32;
            warn!(
                "Alert marker left in place after {} attempts: {}",
                attempts,
                path.display()
            );
            SyncError::AlertRemovalFailed {
                path: path.to_path_buf(),
                attempts,
            }
        })
    }

    fn write_marker(
        &self,
        path: &Path,
        destination: &Path,
        cycle_id: CycleId,
        created_at: Timestamp,
    ) -> io::Result<()> {
        let mut file = OpenOptions::new().write(true).create_new(true).open(path)?;
        let local: DateTime<Local> = created_at.to_system_time().into();
        let name = destination
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        writeln!(file, "SYNC IN PROGRESS - please do not open {}", name)?;
        writeln!(file)?;
        writeln!(file, "A new version of this file is being copied in.")?;
        writeln!(file, "This notice disappears when the update is done.")?;
        writeln!(file)?;
        writeln!(file, "Cycle: {}", cycle_id)?;
        writeln!(file, "Started: {}", local.format("%Y-%m-%d %H:%M:%S"))?;
        file.sync_all()
    }
}
