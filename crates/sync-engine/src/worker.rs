// crates/sync-engine/src/worker.rs
//! Background worker
//!
//! One thread drains a FIFO queue of change events and runs one cycle at a
//! time. Producers (the watcher, the CLI) only enqueue.

use crossbeam_channel::{unbounded, Receiver, Sender};
use log::{error, info, warn};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::thread;
use syncguard_core::{ChangeEvent, CycleReport, EngineStats};
use syncguard_resilience::CancelToken;

use crate::engine::SyncEngine;
use crate::error::{EngineError, EngineResult};

/// Messages understood by the worker thread
#[derive(Debug)]
pub enum WorkerCommand {
    Sync(ChangeEvent),
    Stop,
}

/// Cloneable producer side of the worker queue
#[derive(Debug, Clone)]
pub struct EventSender {
    tx: Sender<WorkerCommand>,
}

impl EventSender {
    /// Enqueues a change event
    pub fn send(&self, event: ChangeEvent) -> EngineResult<()> {
        self.tx
            .send(WorkerCommand::Sync(event))
            .map_err(|_| EngineError::WorkerStopped)
    }
}

impl From<Sender<WorkerCommand>> for EventSender {
    fn from(tx: Sender<WorkerCommand>) -> Self {
        Self { tx }
    }
}

/// Handle to the worker thread
pub struct SyncWorker {
    handle: Option<thread::JoinHandle<()>>,
    command_tx: Sender<WorkerCommand>,
    running: Arc<AtomicBool>,
    processed: Arc<AtomicU64>,
    cancel: CancelToken,
    stats: Arc<RwLock<EngineStats>>,
}

impl SyncWorker {
    /// Starts the worker thread with `engine`
    pub fn start(engine: SyncEngine) -> EngineResult<Self> {
        Self::spawn(engine, None)
    }

    /// Starts the worker and forwards every finished report to `reports`
    pub fn start_with_reports(engine: SyncEngine, reports: Sender<CycleReport>) -> EngineResult<Self> {
        Self::spawn(engine, Some(reports))
    }

    fn spawn(engine: SyncEngine, reports: Option<Sender<CycleReport>>) -> EngineResult<Self> {
        let (command_tx, command_rx) = unbounded();
        let running = Arc::new(AtomicBool::new(true));
        let processed = Arc::new(AtomicU64::new(0));
        let cancel = CancelToken::new();
        let stats = engine.stats_handle();

        let running_clone = Arc::clone(&running);
        let processed_clone = Arc::clone(&processed);
        let cancel_clone = cancel.clone();

        let handle = thread::Builder::new()
            .name("syncguard-worker".to_string())
            .spawn(move || {
                worker_loop(engine, command_rx, reports, &cancel_clone, &processed_clone);
                running_clone.store(false, Ordering::SeqCst);
            })
            .map_err(EngineError::WorkerSpawn)?;

        info!("Sync worker started");
        Ok(Self {
            handle: Some(handle),
            command_tx,
            running,
            processed,
            cancel,
            stats,
        })
    }

    /// Enqueues a change event
    pub fn submit(&self, event: ChangeEvent) -> EngineResult<()> {
        if !self.is_running() {
            return Err(EngineError::WorkerStopped);
        }
        self.sender().send(event)
    }

    /// Producer handle for other threads
    pub fn sender(&self) -> EventSender {
        EventSender {
            tx: self.command_tx.clone(),
        }
    }

    /// Latest published counters
    pub fn stats(&self) -> EngineStats {
        match self.stats.read() {
            Ok(stats) => stats.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Number of cycles finished so far
    pub fn processed(&self) -> u64 {
        self.processed.load(Ordering::SeqCst)
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Interrupts the current cycle and joins the thread
    ///
    /// Events still queued are discarded.
    pub fn stop(&mut self) {
        self.cancel.cancel();
        let _ = self.command_tx.send(WorkerCommand::Stop);

        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("Sync worker thread panicked");
            }
            self.running.store(false, Ordering::SeqCst);
            info!("Sync worker stopped after {} cycle(s)", self.processed());
        }
    }
}

impl Drop for SyncWorker {
    fn drop(&mut self) {
        self.stop();
    }
}

fn worker_loop(
    mut engine: SyncEngine,
    command_rx: Receiver<WorkerCommand>,
    reports: Option<Sender<CycleReport>>,
    cancel: &CancelToken,
    processed: &AtomicU64,
) {
    while let Ok(command) = command_rx.recv() {
        let event = match command {
            WorkerCommand::Sync(event) => event,
            WorkerCommand::Stop => break,
        };

        if cancel.is_cancelled() {
            break;
        }

        let report = engine.run_cycle(event, cancel);
        processed.fetch_add(1, Ordering::SeqCst);

        if let Some(reports) = &reports {
            if reports.send(report).is_err() {
                warn!("Report receiver dropped; reports are no longer forwarded");
            }
        }
    }

    let pending = command_rx
        .try_iter()
        .filter(|c| matches!(c, WorkerCommand::Sync(_)))
        .count();
    if pending > 0 {
        warn!("Discarded {} queued change event(s) on shutdown", pending);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::NullClient;
    use std::fs;
    use std::time::Duration;
    use syncguard_config::Config;
    use syncguard_core::Timestamp;
    use syncguard_resilience::VirtualClock;
    use tempfile::TempDir;

    fn engine(dir: &TempDir) -> SyncEngine {
        let source = dir.path().join("notes.docx");
        fs::write(&source, b"content").unwrap();
        let mut config = Config::default();
        config.paths.source = source;
        config.paths.destination = dir.path().join("share").join("notes.docx");
        SyncEngine::new(
            &config,
            Arc::new(VirtualClock::starting_now()),
            Arc::new(NullClient),
        )
        .unwrap()
    }

    #[test]
    fn test_events_processed_in_order() {
        let dir = TempDir::new().unwrap();
        let engine = engine(&dir);
        let source = engine.source().to_path_buf();
        let (report_tx, report_rx) = unbounded();
        let mut worker = SyncWorker::start_with_reports(engine, report_tx).unwrap();

        for size in [1u64, 2, 3] {
            worker
                .submit(ChangeEvent::new(&source, size, Timestamp::now()))
                .unwrap();
        }

        let sizes: Vec<u64> = (0..3)
            .map(|_| {
                report_rx
                    .recv_timeout(Duration::from_secs(30))
                    .unwrap()
                    .event
                    .size
            })
            .collect();
        assert_eq!(sizes, vec![1, 2, 3]);

        worker.stop();
        assert_eq!(worker.processed(), 3);
        assert_eq!(worker.stats().cycles_attempted, 3);
        assert!(!worker.is_running());
    }

    #[test]
    fn test_submit_after_stop_fails() {
        let dir = TempDir::new().unwrap();
        let mut worker = SyncWorker::start(engine(&dir)).unwrap();
        worker.stop();

        let result = worker.submit(ChangeEvent::new("x", 0, Timestamp::now()));
        assert!(matches!(result, Err(EngineError::WorkerStopped)));
    }

    #[test]
    fn test_drop_stops_worker() {
        let dir = TempDir::new().unwrap();
        let worker = SyncWorker::start(engine(&dir)).unwrap();
        let sender = worker.sender();
        drop(worker);
        assert!(sender.send(ChangeEvent::new("x", 0, Timestamp::now())).is_err());
    }
}
