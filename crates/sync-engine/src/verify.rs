// crates/sync-engine/src/verify.rs
//! Confidence scoring
//!
//! There is no acknowledgement from the cloud-sync client, so the scorer only
//! estimates how likely it is that a change went out. Five independent
//! signals count one point each. The percentage is a heuristic, never proof
//! of upload.

use log::{debug, info};
use std::fs::{self, OpenOptions};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use syncguard_config::EngineConfig;
use syncguard_core::{
    NudgeTally, SyncError, Timestamp, VerificationResult, VerificationSignals, SIGNAL_COUNT,
};
use syncguard_resilience::with_timeout;

use crate::client::ExternalSyncClient;
use crate::nudge::NUDGE_PREFIX;

/// Nudges that must succeed for the environment signal to count
pub const MIN_EFFECTIVE_NUDGES: u32 = 3;

/// Deadline for the client status query unless configured otherwise
pub const DEFAULT_STATUS_TIMEOUT: Duration = Duration::from_secs(10);

/// Turns observations about the destination into a confidence estimate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerificationScorer {
    threshold_pct: u8,
    freshness: Duration,
    status_timeout: Duration,
}

impl VerificationScorer {
    pub fn new(threshold_pct: u8, freshness: Duration) -> Self {
        Self {
            threshold_pct: threshold_pct.min(100),
            freshness,
            status_timeout: DEFAULT_STATUS_TIMEOUT,
        }
    }

    /// Bounds how long the client status query may block
    pub fn with_status_timeout(mut self, timeout: Duration) -> Self {
        self.status_timeout = timeout;
        self
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.success_threshold_pct, config.freshness_window())
    }

    pub fn threshold_pct(&self) -> u8 {
        self.threshold_pct
    }

    /// Scores a set of signals
    pub fn score(&self, signals: VerificationSignals) -> VerificationResult {
        let score = signals.count();
        let confidence_pct = (u32::from(score) * 100 / u32::from(SIGNAL_COUNT)) as u8;
        VerificationResult {
            score,
            confidence_pct,
            successful: confidence_pct >= self.threshold_pct,
            signals,
        }
    }

    /// Observes the destination and its surroundings
    ///
    /// Client problems do not stop collection; they come back as degraded
    /// errors next to the signals.
    pub fn collect(
        &self,
        destination: &Path,
        client: &Arc<dyn ExternalSyncClient>,
        nudges: &NudgeTally,
        now: SystemTime,
    ) -> (VerificationSignals, Vec<SyncError>) {
        let mut degraded = Vec::new();
        let metadata = fs::metadata(destination).ok();

        let dest_present = metadata.as_ref().is_some_and(|m| m.is_file() && m.len() > 0);

        let dest_fresh = metadata
            .as_ref()
            .and_then(|m| m.modified().ok())
            .is_some_and(|modified| match now.duration_since(modified) {
                Ok(age) => age < self.freshness,
                // Modified "in the future" relative to our clock
                Err(_) => true,
            });

        let client_active = self.client_active(client, &mut degraded);

        let dir_writable = destination
            .parent()
            .is_some_and(|dir| probe_writable(dir, now));

        let signals = VerificationSignals {
            dest_present,
            dest_fresh,
            client_active,
            dir_writable,
            nudges_effective: nudges.succeeded >= MIN_EFFECTIVE_NUDGES,
        };
        debug!("Verification signals for {}: {:?}", destination.display(), signals);
        (signals, degraded)
    }

    /// Collects and scores in one go
    pub fn verify(
        &self,
        destination: &Path,
        client: &Arc<dyn ExternalSyncClient>,
        nudges: &NudgeTally,
        now: SystemTime,
    ) -> (VerificationResult, Vec<SyncError>) {
        let (signals, degraded) = self.collect(destination, client, nudges, now);
        let result = self.score(signals);
        info!(
            "Estimated sync confidence {}% ({}/{} signals, threshold {}%)",
            result.confidence_pct, result.score, SIGNAL_COUNT, self.threshold_pct
        );
        (result, degraded)
    }

    /// Queries the client on a worker thread; a hung query counts as inactive
    fn client_active(
        &self,
        client: &Arc<dyn ExternalSyncClient>,
        degraded: &mut Vec<SyncError>,
    ) -> bool {
        let client = Arc::clone(client);
        let reason = match with_timeout(self.status_timeout, move || client.status()) {
            Ok(Ok(status)) => return status.is_active(),
            Ok(Err(e)) => e.to_string(),
            Err(e) => format!("status query: {}", e),
        };
        degraded.push(SyncError::ExternalClientUnavailable { reason });
        false
    }
}

impl Default for VerificationScorer {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

/// Creates and deletes a probe file in `dir`
fn probe_writable(dir: &Path, now: SystemTime) -> bool {
    let probe = dir.join(format!(
        "{}probe_{}.tmp",
        NUDGE_PREFIX,
        Timestamp::from_system_time(now).as_millis()
    ));
    match OpenOptions::new().write(true).create_new(true).open(&probe) {
        Ok(file) => {
            drop(file);
            let _ = fs::remove_file(&probe);
            true
        }
        Err(e) => {
            debug!("Directory {} not writable: {}", dir.display(), e);
            false
        }
    }
}
