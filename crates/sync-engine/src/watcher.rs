// crates/sync-engine/src/watcher.rs
//! Source file watcher
//!
//! Watches the directory of the tracked file (editors often save by
//! replacing the file, which a watch on the file itself would miss) and
//! enqueues a `ChangeEvent` for every debounced change to that one name.

use log::{debug, error, info};
use notify::{Error as NotifyError, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, Instant};
use syncguard_core::{ChangeEvent, Timestamp};

use crate::error::{EngineError, EngineResult};
use crate::worker::EventSender;

/// Drops events that follow an accepted one within the window
#[derive(Debug)]
pub struct Debouncer {
    window: Duration,
    last: Option<Instant>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self { window, last: None }
    }

    /// Returns true if an event at `now` should go through
    pub fn accept(&mut self, now: Instant) -> bool {
        match self.last {
            Some(last) if now.saturating_duration_since(last) < self.window => false,
            _ => {
                self.last = Some(now);
                true
            }
        }
    }
}

/// Keeps the notify watcher alive; dropping it stops watching
pub struct SourceWatcher {
    source: PathBuf,
    _watcher: RecommendedWatcher,
}

impl SourceWatcher {
    /// Starts watching `source`, sending events to `sink`
    pub fn start(source: &Path, debounce: Duration, sink: EventSender) -> EngineResult<Self> {
        let dir = match source.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let Some(file_name) = source.file_name().map(|n| n.to_os_string()) else {
            return Err(EngineError::InvalidConfig(format!(
                "source has no file name: {}",
                source.display()
            )));
        };
        if !dir.is_dir() {
            return Err(EngineError::SourceNotFound(source.to_path_buf()));
        }

        let tracked = source.to_path_buf();
        let debouncer = Mutex::new(Debouncer::new(debounce));

        let mut watcher =
            notify::recommended_watcher(move |res: Result<Event, NotifyError>| match res {
                Ok(event) => {
                    if !is_change_to(&event, &file_name) {
                        return;
                    }
                    let accepted = match debouncer.lock() {
                        Ok(mut d) => d.accept(Instant::now()),
                        Err(poisoned) => poisoned.into_inner().accept(Instant::now()),
                    };
                    if !accepted {
                        debug!("Debounced change to {}", tracked.display());
                        return;
                    }
                    let size = fs::metadata(&tracked).map(|m| m.len()).unwrap_or(0);
                    let change = ChangeEvent::new(&tracked, size, Timestamp::now());
                    info!("Change detected: {} ({} bytes)", tracked.display(), size);
                    if let Err(e) = sink.send(change) {
                        error!("Could not enqueue change event: {}", e);
                    }
                }
                Err(e) => error!("Watch error: {}", e),
            })?;

        watcher.watch(&dir, RecursiveMode::NonRecursive)?;
        info!("Watching {}", source.display());

        Ok(Self {
            source: source.to_path_buf(),
            _watcher: watcher,
        })
    }

    pub fn source(&self) -> &Path {
        &self.source
    }
}

/// Returns true for create/modify events that touch the tracked name
fn is_change_to(event: &Event, file_name: &OsString) -> bool {
    matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_))
        && event
            .paths
            .iter()
            .any(|p| p.file_name() == Some(file_name.as_os_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, ModifyKind, RemoveKind};

    #[test]
    fn test_debouncer_window() {
        let mut debouncer = Debouncer::new(Duration::from_secs(3));
        let start = Instant::now();

        assert!(debouncer.accept(start));
        assert!(!debouncer.accept(start + Duration::from_secs(1)));
        assert!(!debouncer.accept(start + Duration::from_millis(2_999)));
        assert!(debouncer.accept(start + Duration::from_secs(3)));
    }

    #[test]
    fn test_zero_window_accepts_everything() {
        let mut debouncer = Debouncer::new(Duration::ZERO);
        let now = Instant::now();
        assert!(debouncer.accept(now));
        assert!(debouncer.accept(now));
    }

    #[test]
    fn test_event_filter() {
        let name = OsString::from("catalogo.xlsx");
        let modify = Event::new(EventKind::Modify(ModifyKind::Any))
            .add_path(PathBuf::from("/data/catalogo.xlsx"));
        let create_other = Event::new(EventKind::Create(CreateKind::File))
            .add_path(PathBuf::from("/data/~$catalogo.xlsx"));
        let remove = Event::new(EventKind::Remove(RemoveKind::File))
            .add_path(PathBuf::from("/data/catalogo.xlsx"));

        assert!(is_change_to(&modify, &name));
        assert!(!is_change_to(&create_other, &name));
        assert!(!is_change_to(&remove, &name));
    }

    #[test]
    fn test_start_rejects_missing_directory() {
        let (tx, _rx) = crossbeam_channel::unbounded();
        let sink = EventSender::from(tx);
        let result = SourceWatcher::start(
            Path::new("/definitely/not/here/catalogo.xlsx"),
            Duration::from_secs(3),
            sink,
        );
        assert!(matches!(result, Err(EngineError::SourceNotFound(_))));
    }
}
