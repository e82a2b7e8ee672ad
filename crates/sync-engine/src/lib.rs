// crates/sync-engine/src/lib.rs
//! Conflict-aware synchronization engine
//!
//! Publishes one local file into a directory watched by a cloud-sync client
//! the engine does not control:
//! - Lock detection from editor companion files
//! - A deterministic decision policy (rule table)
//! - Copy with bounded retries, backups and a durable blocked marker
//! - Visible alert markers and force-visibility nudges
//! - A heuristic confidence score for every copy
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use syncguard_config::Config;
//! use syncguard_engine::{client_from_config, SyncEngine};
//! use syncguard_resilience::{CancelToken, Clock, SystemClock};
//!
//! let mut config = Config::default();
//! config.paths.source = "/data/catalogo.xlsx".into();
//! config.paths.destination = "/share/catalogo.xlsx".into();
//!
//! let clock: Arc<dyn Clock> = Arc::new(SystemClock::new());
//! let client = client_from_config(&config.client, Arc::clone(&clock));
//! let mut engine = SyncEngine::new(&config, clock, client).unwrap();
//!
//! let event = engine.current_event().unwrap();
//! let report = engine.run_cycle(event, &CancelToken::new());
//! println!("{}", report.outcome.label());
//! ```

mod alert;
mod client;
mod detector;
mod engine;
mod error;
mod executor;
pub mod maintenance;
mod nudge;
mod policy;
mod verify;
mod watcher;
mod worker;

pub use alert::AlertManager;
pub use client::{
    client_from_config, ClientError, ClientResult, ClientStatus, ExternalSyncClient, NullClient,
    SysinfoClient,
};
pub use detector::{ArtifactKind, LockArtifact, LockDetector};
pub use engine::{EngineState, SyncEngine};
pub use error::{EngineError, EngineResult};
pub use executor::SyncExecutor;
pub use maintenance::{sweep, SweepReport};
pub use nudge::{ForceVisibility, Nudge, NudgeReport, NUDGE_PREFIX};
pub use policy::{ContextBuilder, DecisionPolicy};
pub use verify::{VerificationScorer, MIN_EFFECTIVE_NUDGES};
pub use watcher::{Debouncer, SourceWatcher};
pub use worker::{EventSender, SyncWorker, WorkerCommand};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_exports_accessible() {
        let _: LockDetector = LockDetector::new();
        let _: DecisionPolicy = DecisionPolicy::default();
        let _: VerificationScorer = VerificationScorer::default();
        let _: EngineState = EngineState::new();
        let _: NullClient = NullClient;
        assert_eq!(Nudge::ALL.len(), 4);
    }
}
