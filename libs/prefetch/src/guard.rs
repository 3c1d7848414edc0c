//! Run-once guard shared by every suite in a test process.
//!
//! Lifecycle: `NotRun → Running → Done | Failed`. The outcome is published
//! only once the run has finished, so a concurrent caller either blocks until
//! then or sees the final result; nobody observes a half-finished "done".

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use tracing::warn;

use crate::{PrefetchError, PrefetchReport};

/// Result shared by every caller of one guard.
pub type PrefetchOutcome = Result<PrefetchReport, Arc<PrefetchError>>;

/// Observable state of an [`ExecutionGuard`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardState {
    NotRun,
    Running,
    Done,
    Failed,
}

/// Ensures the prefetch protocol runs at most once.
#[derive(Debug, Default)]
pub struct ExecutionGuard {
    started: AtomicBool,
    outcome: OnceLock<PrefetchOutcome>,
}

impl ExecutionGuard {
    /// A fresh guard in the `NotRun` state.
    pub const fn new() -> Self {
        Self {
            started: AtomicBool::new(false),
            outcome: OnceLock::new(),
        }
    }

    /// The guard shared by the whole process.
    pub fn process() -> Arc<ExecutionGuard> {
        static PROCESS: OnceLock<Arc<ExecutionGuard>> = OnceLock::new();
        Arc::clone(PROCESS.get_or_init(|| Arc::new(ExecutionGuard::new())))
    }

    /// Run `f` if no run has started yet, otherwise wait for and return the
    /// outcome of the run that did.
    ///
    /// If a run panics, later callers get [`PrefetchError::Interrupted`]
    /// rather than a second attempt.
    pub fn run_once<F>(&self, f: F) -> PrefetchOutcome
    where
        F: FnOnce() -> Result<PrefetchReport, PrefetchError>,
    {
        self.outcome
            .get_or_init(|| {
                if self.started.swap(true, Ordering::SeqCst) {
                    warn!("Earlier prefetch attempt stopped without a result");
                    return Err(Arc::new(PrefetchError::Interrupted));
                }
                f().map_err(Arc::new)
            })
            .clone()
    }

    /// Current state.
    pub fn state(&self) -> GuardState {
        match self.outcome.get() {
            Some(Ok(_)) => GuardState::Done,
            Some(Err(_)) => GuardState::Failed,
            None if self.started.load(Ordering::SeqCst) => GuardState::Running,
            None => GuardState::NotRun,
        }
    }

    /// The published outcome, if the run has finished.
    pub fn outcome(&self) -> Option<&PrefetchOutcome> {
        self.outcome.get()
    }
}
