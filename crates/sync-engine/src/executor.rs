// crates/sync-engine/src/executor.rs
//! Sync executor
//!
//! Enacts one decision: waits out its delay, raises the alert marker, nudges
//! the sync client, backs up the destination when asked to, copies with a
//! bounded number of attempts, nudges again, removes the marker and scores
//! the result. Every outcome is written into the cycle report; nothing here
//! returns an error to the caller.

use chrono::{DateTime, Local};
use log::{debug, error, info, warn};
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use syncguard_config::Config;
use syncguard_core::{
    Action, AlertOutcome, AttemptOutcome, CycleOutcome, CycleReport, SyncAttempt, SyncError,
    Timestamp,
};
use syncguard_resilience::{with_retry_when, CancelToken, Clock, RetryFailure, RetryPolicy};

use crate::alert::AlertManager;
use crate::client::ExternalSyncClient;
use crate::detector::LockDetector;
use crate::nudge::{ForceVisibility, NudgeReport};
use crate::verify::VerificationScorer;

/// Carries out sync decisions against one destination at a time
pub struct SyncExecutor {
    clock: Arc<dyn Clock>,
    client: Arc<dyn ExternalSyncClient>,
    detector: LockDetector,
    alerts: AlertManager,
    nudges: ForceVisibility,
    scorer: VerificationScorer,
    copy_policy: RetryPolicy,
    size_tolerance: u64,
}

impl SyncExecutor {
    pub fn new(config: &Config, clock: Arc<dyn Clock>, client: Arc<dyn ExternalSyncClient>) -> Self {
        Self {
            alerts: AlertManager::new(&config.engine, Arc::clone(&clock)),
            nudges: ForceVisibility::new(&config.client, Arc::clone(&clock), Arc::clone(&client)),
            scorer: VerificationScorer::from_config(&config.engine)
                .with_status_timeout(config.client.nudge_timeout()),
            copy_policy: RetryPolicy::fixed(
                config.engine.max_copy_attempts as usize,
                config.engine.copy_retry_backoff(),
            ),
            size_tolerance: config.engine.size_tolerance_bytes,
            detector: LockDetector::new(),
            clock,
            client,
        }
    }

    /// Runs the decision in `report` and records everything that happened
    pub fn execute(&mut self, report: &mut CycleReport, destination: &Path, cancel: &CancelToken) {
        let source = report.event.path.clone();
        let decision = report.decision.clone();

        if decision.delay_seconds > 0 {
            info!(
                "Cycle {}: waiting {}s before {}",
                report.cycle_id, decision.delay_seconds, decision.action
            );
            if self.clock.sleep(decision.delay(), cancel).is_cancelled() {
                info!("Cycle {} cancelled during its delay", report.cycle_id);
                report.outcome = CycleOutcome::Cancelled;
                return;
            }
        }

        if !source.exists() {
            error!("Source file missing: {}", source.display());
            report.outcome = CycleOutcome::Failed(SyncError::SourceMissing { path: source });
            return;
        }

        ensure_parent_dir(destination);

        let alert = match self.alerts.raise(destination, report.cycle_id, cancel) {
            Ok(alert) => Some(alert),
            Err(e) => {
                warn!("Continuing without a fresh alert marker: {}", e);
                report.degraded.push(e);
                report.alert = AlertOutcome::Skipped;
                None
            }
        };

        report.outcome = if decision.action.copies() {
            self.propagate(report, &source, destination, alert.is_some(), cancel)
        } else {
            if alert.is_some() {
                self.alerts.settle(cancel);
            }
            info!("Cycle {}: {} raised the alert only", report.cycle_id, Action::AlertUsers);
            CycleOutcome::Deferred
        };

        if let Some(alert) = alert {
            report.alert = match self.alerts.clear(&alert, cancel) {
                Ok(removed) => AlertOutcome::Completed(removed),
                Err(e) => {
                    warn!("Stray alert marker left for cycle {}: {}", report.cycle_id, e);
                    report.degraded.push(e);
                    AlertOutcome::Stray(alert)
                }
            };
        }

        if !report.attempts.is_empty() {
            let (result, degraded) = self.scorer.verify(
                destination,
                &self.client,
                &report.nudges_total(),
                self.clock.now(),
            );
            report.verification = Some(result);
            report.degraded.extend(degraded);
        }
    }

    fn propagate(
        &self,
        report: &mut CycleReport,
        source: &Path,
        destination: &Path,
        settle: bool,
        cancel: &CancelToken,
    ) -> CycleOutcome {
        if settle && self.alerts.settle(cancel).is_cancelled() {
            return CycleOutcome::Cancelled;
        }

        let before = self.nudges.run(destination, cancel);
        absorb_nudges(report, before, true);

        let backed_up = if report.decision.action.requires_backup() && destination.exists() {
            self.backup(destination).map(|path| {
                info!("Backed up destination to {}", path.display());
                report.backup_path = Some(path);
            })
        } else {
            Ok(())
        };

        // The second battery runs whatever the copy did.
        let outcome = match backed_up {
            Ok(()) => self.copy_with_retry(report, source, destination, cancel),
            Err(e) => {
                error!("{}", e);
                CycleOutcome::Failed(e)
            }
        };

        let after = self.nudges.run(destination, cancel);
        absorb_nudges(report, after, false);

        outcome
    }

    fn copy_with_retry(
        &self,
        report: &mut CycleReport,
        source: &Path,
        destination: &Path,
        cancel: &CancelToken,
    ) -> CycleOutcome {
        let attempts = &mut report.attempts;
        let result = with_retry_when(
            &self.copy_policy,
            self.clock.as_ref(),
            cancel,
            SyncError::is_retryable,
            |attempt| {
                let (record, result) = self.copy_attempt(attempt as u32, source, destination);
                attempts.push(record);
                result
            },
        );

        match result {
            Ok(()) => CycleOutcome::Synced,
            Err(RetryFailure::Cancelled { attempts: tried, .. }) => {
                info!("Copy cancelled after {} attempt(s)", tried);
                CycleOutcome::Cancelled
            }
            Err(RetryFailure::Aborted { error, .. }) => {
                mark_last_permanent(&mut report.attempts);
                error!("Copy aborted: {}", error);
                CycleOutcome::Failed(error)
            }
            Err(RetryFailure::Exhausted {
                attempts: tried,
                last_error,
            }) => {
                mark_last_permanent(&mut report.attempts);
                let error = match last_error {
                    SyncError::DestinationLocked { path } => SyncError::PermanentLock {
                        path,
                        attempts: tried as u32,
                    },
                    other => other,
                };
                error!("Giving up after {} attempts: {}", tried, error);
                report.blocked_marker = self.write_blocked_marker(destination, source, &error, tried);
                CycleOutcome::Failed(error)
            }
        }
    }

    /// One pass of: lock check, copy, size check
    fn copy_attempt(
        &self,
        attempt_number: u32,
        source: &Path,
        destination: &Path,
    ) -> (SyncAttempt, Result<(), SyncError>) {
        let mut record = SyncAttempt {
            attempt_number,
            started_at: Timestamp::from_system_time(self.clock.now()),
            outcome: AttemptOutcome::LockedRetry,
            bytes_source: 0,
            bytes_dest: 0,
        };

        let source_meta = match fs::metadata(source) {
            Ok(meta) => meta,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return (record, Err(SyncError::SourceMissing { path: source.to_path_buf() }));
            }
            Err(e) => return (record, Err(SyncError::io("read source metadata", e))),
        };
        record.bytes_source = source_meta.len();

        if destination.exists() && self.detector.is_editing(destination) {
            warn!(
                "Attempt {}: destination is open in an editor: {}",
                attempt_number,
                destination.display()
            );
            return (
                record,
                Err(SyncError::DestinationLocked { path: destination.to_path_buf() }),
            );
        }

        if let Err(e) = copy_preserving(source, destination) {
            let err = if is_lock_error(&e) {
                SyncError::DestinationLocked { path: destination.to_path_buf() }
            } else if !source.exists() {
                SyncError::SourceMissing { path: source.to_path_buf() }
            } else {
                SyncError::io("copy", e)
            };
            warn!("Attempt {} failed: {}", attempt_number, err);
            return (record, Err(err));
        }

        record.bytes_dest = fs::metadata(destination).map(|m| m.len()).unwrap_or(0);
        if record.size_delta() > self.size_tolerance {
            let err = SyncError::SizeMismatch {
                source_bytes: record.bytes_source,
                dest_bytes: record.bytes_dest,
                tolerance: self.size_tolerance,
            };
            warn!("Attempt {} failed: {}", attempt_number, err);
            return (record, Err(err));
        }

        record.outcome = AttemptOutcome::Success;
        info!(
            "Attempt {}: copied {} bytes to {}",
            attempt_number,
            record.bytes_dest,
            destination.display()
        );
        (record, Ok(()))
    }

    fn backup(&self, destination: &Path) -> Result<PathBuf, SyncError> {
        let secs = Timestamp::from_system_time(self.clock.now()).as_seconds();
        let path = with_suffix(destination, &format!(".backup_{}", secs));
        copy_preserving(destination, &path).map_err(|source| SyncError::BackupFailed {
            path: destination.to_path_buf(),
            source,
        })?;
        Ok(path)
    }

    fn write_blocked_marker(
        &self,
        destination: &Path,
        source: &Path,
        error: &SyncError,
        attempts: usize,
    ) -> Option<PathBuf> {
        let local: DateTime<Local> = self.clock.now().into();
        let path = with_suffix(
            destination,
            &format!(".BLOCKED_{}.txt", local.format("%Y%m%d_%H%M%S")),
        );

        let write = || -> io::Result<()> {
            let mut file = File::create(&path)?;
            writeln!(file, "SYNC BLOCKED")?;
            writeln!(file)?;
            writeln!(file, "{}", error.user_message())?;
            writeln!(file)?;
            writeln!(file, "Time: {}", local.format("%Y-%m-%d %H:%M:%S"))?;
            writeln!(file, "Source: {}", source.display())?;
            writeln!(file, "Destination: {}", destination.display())?;
            writeln!(file, "Attempts: {}", attempts)?;
            writeln!(file, "Error: {} ({})", error, error.code())?;
            file.sync_all()
        };

        match write() {
            Ok(()) => {
                warn!("Blocked marker written: {}", path.display());
                Some(path)
            }
            Err(e) => {
                error!("Could not write blocked marker {}: {}", path.display(), e);
                None
            }
        }
    }
}

fn absorb_nudges(report: &mut CycleReport, nudges: NudgeReport, before_copy: bool) {
    report.degraded.extend(nudges.degraded);
    if before_copy {
        report.nudges_before = nudges.tally;
    } else {
        report.nudges_after = nudges.tally;
    }
}

fn mark_last_permanent(attempts: &mut [SyncAttempt]) {
    if let Some(last) = attempts.last_mut() {
        last.outcome = AttemptOutcome::PermanentFailure;
    }
}

fn ensure_parent_dir(destination: &Path) {
    let Some(parent) = destination.parent() else {
        return;
    };
    if parent.as_os_str().is_empty() || parent.exists() {
        return;
    }
    match fs::create_dir_all(parent) {
        Ok(()) => info!("Created destination directory {}", parent.display()),
        Err(e) => warn!("Could not create {}: {}", parent.display(), e),
    }
}

/// `path` with `suffix` appended to its file name
fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

/// Copies content and modification time
pub(crate) fn copy_preserving(from: &Path, to: &Path) -> io::Result<u64> {
    let bytes = fs::copy(from, to)?;
    let modified = fs::metadata(from)?.modified()?;
    File::options().write(true).open(to)?.set_modified(modified)?;
    debug!("Copied {} -> {} ({} bytes)", from.display(), to.display(), bytes);
    Ok(bytes)
}

/// OS refusals that mean another program holds the file
fn is_lock_error(e: &io::Error) -> bool {
    // ERROR_SHARING_VIOLATION and ERROR_LOCK_VIOLATION
    const WINDOWS_LOCK_CODES: [i32; 2] = [32, 33];

    e.kind() == io::ErrorKind::PermissionDenied
        || (cfg!(windows) && e.raw_os_error().is_some_and(|c| WINDOWS_LOCK_CODES.contains(&c)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::NullClient;
    use crate::nudge::Nudge;
    use syncguard_core::{
        ChangeEvent, ConflictContext, CycleId, EditingState, Impact, SyncDecision,
    };
    use std::time::Duration;
    use syncguard_resilience::VirtualClock;
    use tempfile::TempDir;

    struct Fixture {
        _dir: TempDir,
        source: PathBuf,
        destination: PathBuf,
        clock: VirtualClock,
        executor: SyncExecutor,
    }

    fn fixture() -> Fixture {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("data").join("catalogo.xlsx");
        let destination = dir.path().join("share").join("catalogo.xlsx");
        fs::create_dir_all(source.parent().unwrap()).unwrap();
        fs::write(&source, vec![7u8; 2_048]).unwrap();

        let clock = VirtualClock::starting_now();
        let executor = SyncExecutor::new(
            &Config::default(),
            Arc::new(clock.clone()),
            Arc::new(NullClient),
        );
        Fixture {
            _dir: dir,
            source,
            destination,
            clock,
            executor,
        }
    }

    fn report(source: &Path, action: Action, delay: u64) -> CycleReport {
        CycleReport::begin(
            CycleId::new(1),
            ChangeEvent::new(source, 2_048, Timestamp::now()),
            ConflictContext::new(EditingState::default(), true, true, 2_048, None),
            SyncDecision::new(action, delay, 90, Impact::High, "test", 4),
            Timestamp::now(),
        )
    }

    #[test]
    fn test_copy_preserves_mtime() {
        let f = fixture();
        fs::create_dir_all(f.destination.parent().unwrap()).unwrap();
        let old = std::time::SystemTime::UNIX_EPOCH + Duration::from_secs(1_500_000_000);
        File::options()
            .write(true)
            .open(&f.source)
            .unwrap()
            .set_modified(old)
            .unwrap();

        copy_preserving(&f.source, &f.destination).unwrap();
        assert_eq!(fs::metadata(&f.destination).unwrap().modified().unwrap(), old);
    }

    #[test]
    fn test_immediate_sync_creates_directory_and_copies() {
        let mut f = fixture();
        let mut r = report(&f.source, Action::SyncImmediate, 0);

        f.executor.execute(&mut r, &f.destination, &CancelToken::new());

        assert!(r.succeeded(), "{:?}", r.outcome);
        assert_eq!(fs::read(&f.destination).unwrap(), vec![7u8; 2_048]);
        assert_eq!(r.attempts.len(), 1);
        assert!(matches!(r.alert, AlertOutcome::Completed(_)));
        assert!(r.verification.is_some());
        assert!(r.blocked_marker.is_none());
    }

    #[test]
    fn test_delay_is_slept_first() {
        let mut f = fixture();
        let mut r = report(&f.source, Action::SyncDelayed, 120);

        f.executor.execute(&mut r, &f.destination, &CancelToken::new());

        assert_eq!(f.clock.sleeps()[0], Duration::from_secs(120));
        assert!(r.succeeded());
    }

    #[test]
    fn test_cancel_during_delay() {
        let mut f = fixture();
        let cancel = CancelToken::new();
        let hook_cancel = cancel.clone();
        f.clock.on_sleep(move |_, _| hook_cancel.cancel());
        let mut r = report(&f.source, Action::ScheduleLater, 300);

        f.executor.execute(&mut r, &f.destination, &cancel);

        assert!(matches!(r.outcome, CycleOutcome::Cancelled));
        assert!(!f.destination.exists());
        assert!(r.attempts.is_empty());
    }

    #[test]
    fn test_missing_source_is_fatal() {
        let mut f = fixture();
        fs::remove_file(&f.source).unwrap();
        let mut r = report(&f.source, Action::SyncImmediate, 0);

        f.executor.execute(&mut r, &f.destination, &CancelToken::new());

        assert!(matches!(
            r.outcome,
            CycleOutcome::Failed(SyncError::SourceMissing { .. })
        ));
        assert_eq!(r.alert, AlertOutcome::NotRaised);
    }

    #[test]
    fn test_backup_sync_keeps_previous_version() {
        let mut f = fixture();
        fs::create_dir_all(f.destination.parent().unwrap()).unwrap();
        fs::write(&f.destination, b"previous").unwrap();
        let mut r = report(&f.source, Action::BackupSync, 60);

        f.executor.execute(&mut r, &f.destination, &CancelToken::new());

        assert!(r.succeeded());
        let backup = r.backup_path.expect("backup path");
        assert_eq!(fs::read(&backup).unwrap(), b"previous");
        assert!(backup
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("catalogo.xlsx.backup_"));
    }

    #[test]
    fn test_failed_backup_still_runs_second_battery() {
        let mut f = fixture();
        // A directory in place of the published file cannot be copied aside.
        fs::create_dir_all(&f.destination).unwrap();
        let mut r = report(&f.source, Action::BackupSync, 0);

        f.executor.execute(&mut r, &f.destination, &CancelToken::new());

        assert!(matches!(
            r.outcome,
            CycleOutcome::Failed(SyncError::BackupFailed { .. })
        ));
        assert!(r.attempts.is_empty());
        assert!(r.backup_path.is_none());
        assert_eq!(r.nudges_before.attempted, Nudge::ALL.len() as u32);
        assert_eq!(r.nudges_after.attempted, Nudge::ALL.len() as u32);
        assert!(matches!(r.alert, AlertOutcome::Completed(_)));
    }

    #[test]
    fn test_backup_skipped_when_destination_absent() {
        let mut f = fixture();
        let mut r = report(&f.source, Action::BackupSync, 0);
        f.executor.execute(&mut r, &f.destination, &CancelToken::new());
        assert!(r.succeeded());
        assert!(r.backup_path.is_none());
    }

    #[test]
    fn test_alert_users_does_not_copy() {
        let mut f = fixture();
        let mut r = report(&f.source, Action::AlertUsers, 0);

        f.executor.execute(&mut r, &f.destination, &CancelToken::new());

        assert!(matches!(r.outcome, CycleOutcome::Deferred));
        assert!(!f.destination.exists());
        assert!(matches!(r.alert, AlertOutcome::Completed(_)));
        assert!(r.verification.is_none());
    }

    #[test]
    fn test_with_suffix() {
        assert_eq!(
            with_suffix(Path::new("/share/a.xlsx"), ".BLOCKED_20240101_120000.txt"),
            PathBuf::from("/share/a.xlsx.BLOCKED_20240101_120000.txt")
        );
    }

    #[test]
    fn test_permission_denied_is_lock() {
        assert!(is_lock_error(&io::Error::from(io::ErrorKind::PermissionDenied)));
        assert!(!is_lock_error(&io::Error::from(io::ErrorKind::NotFound)));
    }
}
