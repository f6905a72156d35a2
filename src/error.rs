//! Error types for timed barrier runs.
//!
//! Only coordination problems are errors. A work unit that fails, panics, or is
//! interrupted is reported as data in [`crate::Measurement::failures`].

use std::time::Duration;

/// Errors that abort a measurement before a duration is produced
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TimerError {
    /// A barrier needs at least one worker
    ZeroConcurrency,

    /// Every outstanding worker was dropped by the pool before all of them were ready
    Coordination { pending: usize },

    /// The readiness wait timed out: the pool never ran `required` workers at once
    InsufficientCapacity {
        ready: usize,
        required: usize,
        waited: Duration,
    },
}

impl std::fmt::Display for TimerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TimerError::ZeroConcurrency => {
                write!(f, "Concurrency must be at least 1")
            }
            TimerError::Coordination { pending } => {
                write!(
                    f,
                    "Coordination failed while waiting for readiness: {} worker(s) were \
                     dropped by the pool before signalling\n\
                     \n\
                     The measurement was abandoned and no duration is available.",
                    pending
                )
            }
            TimerError::InsufficientCapacity {
                ready,
                required,
                waited,
            } => {
                write!(
                    f,
                    "Only {} of {} workers became ready within {:?}\n\
                     \n\
                     The execution pool cannot run {} work units at the same time. \
                     Use a pool with at least that many concurrent slots.",
                    ready, required, waited, required
                )
            }
        }
    }
}

impl std::error::Error for TimerError {}

/// Result type for timer operations
#[cfg(not(tarpaulin_include))]
pub type TimerResult<T> = Result<T, TimerError>;
