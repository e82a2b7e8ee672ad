// crates/sync-engine/src/engine.rs
//! Cycle orchestration
//!
//! `SyncEngine` turns one `ChangeEvent` into one complete cycle: detect
//! locks, build the context, decide, execute, account. It owns all mutable
//! counters; other threads only ever see published snapshots.

use log::{debug, info, warn};
use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use syncguard_config::Config;
use syncguard_core::{
    ChangeEvent, ConflictContext, CycleId, CycleOutcome, CycleReport, EngineStats, SyncDecision,
    Timestamp,
};
use syncguard_resilience::{CancelToken, Clock};

use crate::client::ExternalSyncClient;
use crate::detector::LockDetector;
use crate::error::{EngineError, EngineResult};
use crate::executor::SyncExecutor;
use crate::policy::{ContextBuilder, DecisionPolicy};

/// Decisions kept for the rolling confidence average
const CONFIDENCE_WINDOW: usize = 50;

/// Mutable bookkeeping, touched only by the thread running cycles
#[derive(Debug)]
pub struct EngineState {
    next_cycle: CycleId,
    stats: EngineStats,
    confidences: VecDeque<u8>,
}

impl EngineState {
    pub fn new() -> Self {
        Self {
            next_cycle: CycleId::new(1),
            stats: EngineStats::empty(),
            confidences: VecDeque::with_capacity(CONFIDENCE_WINDOW),
        }
    }

    fn begin_cycle(&mut self, context: &ConflictContext, decision: &SyncDecision) -> CycleId {
        let id = self.next_cycle;
        self.next_cycle = id.next();

        self.stats.changes_detected += 1;
        self.stats.cycles_attempted += 1;
        if context.has_conflict() {
            self.stats.conflicts_detected += 1;
        }

        if self.confidences.len() == CONFIDENCE_WINDOW {
            self.confidences.pop_front();
        }
        self.confidences.push_back(decision.confidence);
        let sum: u32 = self.confidences.iter().map(|c| u32::from(*c)).sum();
        self.stats.average_confidence = f64::from(sum) / self.confidences.len() as f64;

        id
    }

    fn finish_cycle(&mut self, report: &CycleReport) {
        match &report.outcome {
            CycleOutcome::Synced => {
                self.stats.cycles_succeeded += 1;
                self.stats.last_sync_at = Some(report.finished_at);
                if report.context.has_conflict() {
                    self.stats.conflicts_resolved += 1;
                }
            }
            CycleOutcome::Failed(_) => self.stats.cycles_failed += 1,
            CycleOutcome::Cancelled => self.stats.cycles_cancelled += 1,
            CycleOutcome::Deferred => self.stats.cycles_deferred += 1,
        }
        if report.alert.is_stray() {
            self.stats.stray_alerts += 1;
        }
    }

    pub fn stats(&self) -> &EngineStats {
        &self.stats
    }
}

impl Default for EngineState {
    fn default() -> Self {
        Self::new()
    }
}

/// Runs sync cycles for one source/destination pair
pub struct SyncEngine {
    source: PathBuf,
    destination: PathBuf,
    clock: Arc<dyn Clock>,
    detector: LockDetector,
    policy: DecisionPolicy,
    contexts: ContextBuilder,
    executor: SyncExecutor,
    state: EngineState,
    published: Arc<RwLock<EngineStats>>,
}

impl SyncEngine {
    /// Creates an engine after checking that the config can run
    pub fn new(
        config: &Config,
        clock: Arc<dyn Clock>,
        client: Arc<dyn ExternalSyncClient>,
    ) -> EngineResult<Self> {
        if let Err(errors) = config.validate() {
            return Err(EngineError::InvalidConfig(join(&errors)));
        }
        if !config.paths.is_configured() {
            return Err(EngineError::InvalidConfig(
                "paths.source and paths.destination must be set".to_string(),
            ));
        }
        if !config.paths.source.exists() {
            return Err(EngineError::SourceNotFound(config.paths.source.clone()));
        }

        Ok(Self {
            source: config.paths.source.clone(),
            destination: config.paths.destination.clone(),
            detector: LockDetector::new(),
            policy: DecisionPolicy::from_config(&config.policy),
            contexts: ContextBuilder::new(config.policy.clone()),
            executor: SyncExecutor::new(config, Arc::clone(&clock), client),
            clock,
            state: EngineState::new(),
            published: Arc::new(RwLock::new(EngineStats::empty())),
        })
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn destination(&self) -> &Path {
        &self.destination
    }

    /// Builds an event from the current state of the source file
    pub fn current_event(&self) -> EngineResult<ChangeEvent> {
        let meta = fs::metadata(&self.source).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => EngineError::SourceNotFound(self.source.clone()),
            _ => EngineError::Io(e),
        })?;
        Ok(ChangeEvent::new(
            &self.source,
            meta.len(),
            Timestamp::from_system_time(self.clock.now()),
        ))
    }

    /// Context and decision for `event`, without acting on it
    pub fn evaluate(&self, event: &ChangeEvent) -> (ConflictContext, SyncDecision) {
        let editing = self.detector.detect(event.path(), &self.destination);
        let context =
            self.contexts
                .build(event, editing, self.clock.now(), self.state.stats.last_sync_at);
        let decision = self.policy.decide(&context);
        (context, decision)
    }

    /// Runs one complete cycle
    pub fn run_cycle(&mut self, event: ChangeEvent, cancel: &CancelToken) -> CycleReport {
        let started_at = Timestamp::from_system_time(self.clock.now());
        let (context, decision) = self.evaluate(&event);
        let cycle_id = self.state.begin_cycle(&context, &decision);

        info!(
            "Cycle {} for {}: {} in {}s (confidence {}%, impact {}, rule {})",
            cycle_id,
            event.file_name(),
            decision.action,
            decision.delay_seconds,
            decision.confidence,
            decision.impact,
            decision.rule
        );
        info!("Cycle {} reasoning: {}", cycle_id, decision.reasoning);
        if context.has_conflict() {
            warn!(
                "Cycle {}: editing conflict (source {}, destination {})",
                cycle_id, context.source_editing, context.dest_editing
            );
        }

        let mut report = CycleReport::begin(cycle_id, event, context, decision, started_at);
        self.executor.execute(&mut report, &self.destination, cancel);
        report.finished_at = Timestamp::from_system_time(self.clock.now());

        self.state.finish_cycle(&report);
        self.publish();
        log_report(&report);
        report
    }

    /// Snapshot of the counters
    pub fn stats(&self) -> EngineStats {
        self.state.stats().clone()
    }

    /// Shared handle that receives a fresh snapshot after every cycle
    pub fn stats_handle(&self) -> Arc<RwLock<EngineStats>> {
        Arc::clone(&self.published)
    }

    fn publish(&self) {
        match self.published.write() {
            Ok(mut stats) => *stats = self.state.stats().clone(),
            Err(poisoned) => *poisoned.into_inner() = self.state.stats().clone(),
        }
    }
}

fn join(errors: &[syncguard_config::ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

fn log_report(report: &CycleReport) {
    match &report.outcome {
        CycleOutcome::Synced => info!(
            "Cycle {} synced after {} attempt(s){}",
            report.cycle_id,
            report.attempts.len(),
            report
                .verification
                .map(|v| format!(", estimated confidence {}%", v.confidence_pct))
                .unwrap_or_default()
        ),
        CycleOutcome::Failed(e) => warn!("Cycle {} failed: {}", report.cycle_id, e),
        other => info!("Cycle {} ended {}", report.cycle_id, other.label()),
    }
    for degraded in &report.degraded {
        debug!("Cycle {} degraded: {}", report.cycle_id, degraded);
    }
    if log::log_enabled!(log::Level::Debug) {
        match serde_json::to_string(report) {
            Ok(json) => debug!("Cycle report: {}", json),
            Err(e) => debug!("Cycle report not serializable: {}", e),
        }
    }
}
