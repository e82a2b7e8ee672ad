// crates/sync-engine/src/nudge.rs
//! Force-visibility nudges
//!
//! Small, harmless filesystem changes next to the destination that prompt a
//! directory-watching sync client to rescan. Every step runs under its own
//! timeout; a failing nudge is tallied and skipped. Restarting the client is
//! only tried when no nudge worked at all.

use log::{debug, info, warn};
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use syncguard_config::ClientConfig;
use syncguard_core::{NudgeTally, SyncError, Timestamp};
use syncguard_resilience::{with_timeout, CancelToken, Clock, ResilienceError};

use crate::client::ExternalSyncClient;

/// File name prefix shared by every nudge artifact
pub const NUDGE_PREFIX: &str = ".syncguard_";

/// One technique of the battery
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Nudge {
    /// Short-lived sibling files with two extensions
    CompanionFiles,
    /// A text file announcing the update
    TriggerFile,
    /// A temporary sub-directory
    DirectoryActivity,
    /// Bumps the directory modification time
    TouchDirectory,
}

impl Nudge {
    pub const ALL: [Nudge; 4] = [
        Nudge::CompanionFiles,
        Nudge::TriggerFile,
        Nudge::DirectoryActivity,
        Nudge::TouchDirectory,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::CompanionFiles => "companion_files",
            Self::TriggerFile => "trigger_file",
            Self::DirectoryActivity => "directory_activity",
            Self::TouchDirectory => "touch_directory",
        }
    }

    /// Performs the nudge and returns whatever has to be cleaned up afterwards
    fn apply(self, dir: &Path, now: SystemTime) -> io::Result<Vec<PathBuf>> {
        let millis = Timestamp::from_system_time(now).as_millis();
        match self {
            Self::CompanionFiles => {
                let mut created = Vec::new();
                for ext in ["tmp", "sync"] {
                    let path = dir.join(format!("{}sibling_{}.{}", NUDGE_PREFIX, millis, ext));
                    fs::write(&path, format!("sync nudge {}\n", millis))?;
                    created.push(path);
                }
                Ok(created)
            }
            Self::TriggerFile => {
                let path = dir.join(format!("{}trigger_{}.txt", NUDGE_PREFIX, millis));
                fs::write(&path, format!("update published at {}\n", millis))?;
                Ok(vec![path])
            }
            Self::DirectoryActivity => {
                let path = dir.join(format!("{}activity_{}", NUDGE_PREFIX, millis));
                fs::create_dir(&path)?;
                Ok(vec![path])
            }
            Self::TouchDirectory => {
                touch_directory(dir, now)?;
                Ok(Vec::new())
            }
        }
    }
}

#[cfg(windows)]
fn touch_directory(dir: &Path, now: SystemTime) -> io::Result<()> {
    use std::os::windows::fs::OpenOptionsExt;

    const FILE_WRITE_ATTRIBUTES: u32 = 0x0100;
    const FILE_FLAG_BACKUP_SEMANTICS: u32 = 0x0200_0000;

    let handle = fs::OpenOptions::new()
        .access_mode(FILE_WRITE_ATTRIBUTES)
        .custom_flags(FILE_FLAG_BACKUP_SEMANTICS)
        .open(dir)?;
    handle.set_modified(now)
}

#[cfg(not(windows))]
fn touch_directory(dir: &Path, now: SystemTime) -> io::Result<()> {
    File::open(dir)?.set_modified(now)
}

fn remove_artifact(path: &Path) -> io::Result<()> {
    let result = if path.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };
    match result {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

/// Result of one run of the battery
#[derive(Debug, Default)]
pub struct NudgeReport {
    pub tally: NudgeTally,
    /// Timeouts and client problems, reported but never fatal
    pub degraded: Vec<SyncError>,
}

/// Runs the nudge battery against a destination directory
pub struct ForceVisibility {
    clock: Arc<dyn Clock>,
    client: Arc<dyn ExternalSyncClient>,
    timeout: Duration,
    settle: Duration,
}

impl ForceVisibility {
    pub fn new(config: &ClientConfig, clock: Arc<dyn Clock>, client: Arc<dyn ExternalSyncClient>) -> Self {
        Self {
            clock,
            client,
            timeout: config.nudge_timeout(),
            settle: config.nudge_settle(),
        }
    }

    /// Runs every nudge once for the directory of `destination`
    pub fn run(&self, destination: &Path, cancel: &CancelToken) -> NudgeReport {
        let dir = match destination.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let mut report = NudgeReport::default();
        let mut artifacts = Vec::new();

        for nudge in Nudge::ALL {
            let target = dir.clone();
            let now = self.clock.now();
            match self.bounded(nudge.name(), move || nudge.apply(&target, now)) {
                Ok(created) => {
                    debug!("Nudge {} applied", nudge.name());
                    report.tally.record_success();
                    artifacts.extend(created);
                }
                Err(failure) => self.record(&mut report, nudge.name(), failure),
            }
        }

        if !artifacts.is_empty() {
            self.clock.sleep(self.settle, cancel);
            for path in artifacts {
                let target = path.clone();
                if let Err(failure) = self.bounded("cleanup", move || remove_artifact(&target)) {
                    warn!("Nudge artifact left behind: {} ({})", path.display(), failure.reason());
                }
            }
        }

        if report.tally.succeeded == 0 {
            self.restart_client(&mut report);
        }

        info!(
            "Force-visibility: {}/{} nudges succeeded",
            report.tally.succeeded, report.tally.attempted
        );
        report
    }

    fn restart_client(&self, report: &mut NudgeReport) {
        warn!("No nudge succeeded; restarting sync client {}", self.client.name());
        let client = Arc::clone(&self.client);
        match self.bounded("restart_client", move || {
            client.restart().map_err(|e| io::Error::other(e.to_string()))
        }) {
            Ok(()) => {
                report.tally.record_success();
                report.tally.client_restarted = true;
            }
            Err(NudgeFailure::TimedOut) => self.record(report, "restart_client", NudgeFailure::TimedOut),
            Err(NudgeFailure::Failed(reason)) => {
                report.tally.record_failure("restart_client", reason.clone());
                report
                    .degraded
                    .push(SyncError::ExternalClientUnavailable { reason });
            }
        }
    }

    fn record(&self, report: &mut NudgeReport, name: &str, failure: NudgeFailure) {
        warn!("Nudge {} failed: {}", name, failure.reason());
        report.tally.record_failure(name, failure.reason());
        if let NudgeFailure::TimedOut = failure {
            report.degraded.push(SyncError::NudgeTimeout {
                nudge: name.to_string(),
                timeout_secs: self.timeout.as_secs(),
            });
        }
    }

    fn bounded<F, T>(&self, name: &str, op: F) -> Result<T, NudgeFailure>
    where
        F: FnOnce() -> io::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        match with_timeout(self.timeout, op) {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(NudgeFailure::Failed(e.to_string())),
            Err(ResilienceError::Timeout(_)) => {
                debug!("Nudge step {} exceeded {:?}", name, self.timeout);
                Err(NudgeFailure::TimedOut)
            }
            Err(e) => Err(NudgeFailure::Failed(e.to_string())),
        }
    }
}

enum NudgeFailure {
    TimedOut,
    Failed(String),
}

impl NudgeFailure {
    fn reason(&self) -> String {
        match self {
            Self::TimedOut => "timed out".to_string(),
            Self::Failed(reason) => reason.clone(),
        }
    }
}
