//! The result of one timed barrier run.

use std::fmt;
use std::time::{Duration, Instant};

use crate::types::WorkerId;

/// Where a worker was when it stopped without finishing its work unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Interruption {
    /// The start gate was dropped unopened, so the work unit never ran
    GateClosed,
    /// The pool dropped the worker future before it completed
    Dropped,
}

impl fmt::Display for Interruption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Interruption::GateClosed => f.write_str("start gate closed before opening"),
            Interruption::Dropped => f.write_str("worker dropped by the execution pool"),
        }
    }
}

/// A worker that did not complete its work unit normally.
///
/// Failures never abort the measurement; each is recorded once, after which
/// the worker still releases the completion latch.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum WorkFailure {
    /// The work unit resolved to an error
    Failed { worker: WorkerId, message: String },
    /// The work unit panicked
    Panicked { worker: WorkerId, panic_message: String },
    /// The worker was cancelled before or during the work unit
    Interrupted { worker: WorkerId, at: Interruption },
}

impl WorkFailure {
    pub fn worker(&self) -> WorkerId {
        match self {
            WorkFailure::Failed { worker, .. }
            | WorkFailure::Panicked { worker, .. }
            | WorkFailure::Interrupted { worker, .. } => *worker,
        }
    }
}

impl fmt::Display for WorkFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkFailure::Failed { worker, message } => {
                write!(f, "{} failed: {}", worker, message)
            }
            WorkFailure::Panicked {
                worker,
                panic_message,
            } => write!(f, "{} panicked: {}", worker, panic_message),
            WorkFailure::Interrupted { worker, at } => {
                write!(f, "{} interrupted: {}", worker, at)
            }
        }
    }
}

/// Timing of one run: the interval from the gate opening to the last worker finishing.
///
/// `started_at` is taken after every worker reported ready and immediately
/// before the start gate opens; `finished_at` right after the completion
/// latch reaches zero. Both come from [`Instant`], a monotonic clock.
#[derive(Debug, Clone)]
pub struct Measurement {
    pub(crate) concurrency: usize,
    pub(crate) started_at: Instant,
    pub(crate) finished_at: Instant,
    pub(crate) failures: Vec<WorkFailure>,
}

impl Measurement {
    /// `finished_at - started_at`
    pub fn elapsed(&self) -> Duration {
        self.finished_at.duration_since(self.started_at)
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    pub fn finished_at(&self) -> Instant {
        self.finished_at
    }

    /// Per-worker failures, sorted by worker id.
    pub fn failures(&self) -> &[WorkFailure] {
        &self.failures
    }

    /// True when every worker completed its work unit without failing.
    ///
    /// A duration measured with failures present is still returned, but the
    /// failed workers may have finished early and shortened it.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}
