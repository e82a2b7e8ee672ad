// crates/resilience/src/clock.rs
//! Time source and cancellable sleeping
//!
//! Every wait in a sync cycle (decision delay, lock backoff, alert settle,
//! removal backoff) goes through a [`Clock`], so tests can run whole cycles
//! on a [`VirtualClock`] without waiting on the wall clock.

use crossbeam_channel::{after, bounded, select, Receiver, Sender};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, SystemTime};

/// How a sleep ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SleepOutcome {
    /// The full duration elapsed
    Completed,
    /// The cancel token fired first
    Cancelled,
}

impl SleepOutcome {
    /// Returns true if the sleep was interrupted
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Source of wall-clock time and of waits
pub trait Clock: Send + Sync {
    /// Current wall-clock time
    fn now(&self) -> SystemTime;

    /// Blocks for `duration` unless `cancel` fires
    fn sleep(&self, duration: Duration, cancel: &CancelToken) -> SleepOutcome;
}

fn lock_ignoring_poison<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

struct CancelSignal {
    fired: AtomicBool,
    // Dropping the sender disconnects every receiver, which wakes all waiters.
    sender: Mutex<Option<Sender<()>>>,
    receiver: Receiver<()>,
}

/// Shared shutdown flag that wakes sleeping threads
#[derive(Clone)]
pub struct CancelToken {
    signal: Arc<CancelSignal>,
}

impl CancelToken {
    /// Creates a token that has not fired
    pub fn new() -> Self {
        let (sender, receiver) = bounded(0);
        Self {
            signal: Arc::new(CancelSignal {
                fired: AtomicBool::new(false),
                sender: Mutex::new(Some(sender)),
                receiver,
            }),
        }
    }

    /// Fires the token and wakes every waiter
    pub fn cancel(&self) {
        self.signal.fired.store(true, Ordering::SeqCst);
        lock_ignoring_poison(&self.signal.sender).take();
    }

    /// Returns true once the token has fired
    pub fn is_cancelled(&self) -> bool {
        self.signal.fired.load(Ordering::SeqCst)
    }

    /// Waits up to `duration`; returns true if cancelled before it elapsed
    pub fn wait_timeout(&self, duration: Duration) -> bool {
        if self.is_cancelled() {
            return true;
        }
        select! {
            recv(self.signal.receiver) -> _ => true,
            recv(after(duration)) -> _ => self.is_cancelled(),
        }
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// Production clock backed by the operating system
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl SystemClock {
    pub fn new() -> Self {
        Self
    }
}

impl Clock for SystemClock {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }

    fn sleep(&self, duration: Duration, cancel: &CancelToken) -> SleepOutcome {
        if cancel.wait_timeout(duration) {
            SleepOutcome::Cancelled
        } else {
            SleepOutcome::Completed
        }
    }
}

type SleepHook = Box<dyn FnMut(Duration, SystemTime) + Send>;

struct VirtualState {
    now: SystemTime,
    sleeps: Vec<Duration>,
    hook: Option<SleepHook>,
}

/// Test clock whose sleeps return immediately and advance virtual time
///
/// Every completed sleep is recorded. A hook can observe each sleep after
/// time has advanced, which lets tests change the filesystem "during" a
/// delay or fire a cancel token.
#[derive(Clone)]
pub struct VirtualClock {
    state: Arc<Mutex<VirtualState>>,
}

impl VirtualClock {
    /// Creates a virtual clock starting at `start`
    pub fn new(start: SystemTime) -> Self {
        Self {
            state: Arc::new(Mutex::new(VirtualState {
                now: start,
                sleeps: Vec::new(),
                hook: None,
            })),
        }
    }

    /// Creates a virtual clock starting at the real current time
    pub fn starting_now() -> Self {
        Self::new(SystemTime::now())
    }

    /// Moves virtual time forward without recording a sleep
    pub fn advance(&self, duration: Duration) {
        lock_ignoring_poison(&self.state).now += duration;
    }

    /// Installs a hook called after every completed sleep
    pub fn on_sleep<F>(&self, hook: F)
    where
        F: FnMut(Duration, SystemTime) + Send + 'static,
    {
        lock_ignoring_poison(&self.state).hook = Some(Box::new(hook));
    }

    /// Durations of all completed sleeps, in order
    pub fn sleeps(&self) -> Vec<Duration> {
        lock_ignoring_poison(&self.state).sleeps.clone()
    }

    /// Sum of all completed sleeps
    pub fn total_slept(&self) -> Duration {
        self.sleeps().iter().sum()
    }
}

impl Clock for VirtualClock {
    fn now(&self) -> SystemTime {
        lock_ignoring_poison(&self.state).now
    }

    fn sleep(&self, duration: Duration, cancel: &CancelToken) -> SleepOutcome {
        if cancel.is_cancelled() {
            return SleepOutcome::Cancelled;
        }

        let (now, hook) = {
            let mut state = lock_ignoring_poison(&self.state);
            state.now += duration;
            state.sleeps.push(duration);
            (state.now, state.hook.take())
        };

        // The hook runs unlocked so it may read the clock.
        if let Some(mut hook) = hook {
            hook(duration, now);
            let mut state = lock_ignoring_poison(&self.state);
            if state.hook.is_none() {
                state.hook = Some(hook);
            }
        }

        if cancel.is_cancelled() {
            SleepOutcome::Cancelled
        } else {
            SleepOutcome::Completed
        }
    }
}

impl fmt::Debug for VirtualClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = lock_ignoring_poison(&self.state);
        f.debug_struct("VirtualClock")
            .field("now", &state.now)
            .field("sleeps", &state.sleeps.len())
            .finish()
    }
}
