//! One participant in a timed barrier run.
//!
//! A worker is assembled on the coordinator's side and then handed to the pool
//! as a boxed future. Its [`CompletionGuard`] is moved into that future, so the
//! completion latch is released exactly once on every exit path: normal
//! return, work failure, panic, closed gate, or the pool dropping the future
//! (even before its first poll).

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::Mutex;

#[cfg(feature = "tracing")]
use tracing::{error, trace, warn};

use crate::latch::{CountdownLatch, GateWait};
use crate::measurement::{Interruption, WorkFailure};
use crate::outcome::WorkOutcome;
use crate::types::WorkerId;

/// Failures recorded by workers, read by the coordinator after completion.
pub(crate) type FailureLog = Arc<Mutex<Vec<WorkFailure>>>;

/// Releases the completion latch when dropped.
///
/// If the guard is dropped without [`CompletionGuard::finish`], the worker was
/// cancelled mid-flight and an [`Interruption::Dropped`] failure is recorded.
pub(crate) struct CompletionGuard {
    worker: WorkerId,
    latch: Arc<CountdownLatch>,
    failures: FailureLog,
    finished: bool,
}

impl CompletionGuard {
    pub(crate) fn new(worker: WorkerId, latch: Arc<CountdownLatch>, failures: FailureLog) -> Self {
        Self {
            worker,
            latch,
            failures,
            finished: false,
        }
    }

    /// Record the worker's result and release the latch.
    pub(crate) fn finish(mut self, failure: Option<WorkFailure>) {
        self.finished = true;
        if let Some(failure) = failure {
            self.record(failure);
        }
    }

    fn record(&self, failure: WorkFailure) {
        #[cfg(feature = "tracing")]
        if matches!(failure, WorkFailure::Panicked { .. }) {
            error!(worker = self.worker.0, %failure, "work unit panicked");
        } else {
            warn!(worker = self.worker.0, %failure, "work unit did not complete");
        }

        self.failures.lock().push(failure);
    }
}

impl Drop for CompletionGuard {
    fn drop(&mut self) {
        if !self.finished {
            self.record(WorkFailure::Interrupted {
                worker: self.worker,
                at: Interruption::Dropped,
            });
        }
        // Record before releasing: the coordinator reads the log once the latch hits zero.
        self.latch.count_down();
    }
}

pub(crate) struct Worker<W> {
    pub(crate) id: WorkerId,
    pub(crate) work: Arc<W>,
    pub(crate) ready: Arc<CountdownLatch>,
    pub(crate) gate: GateWait,
    pub(crate) completion: CompletionGuard,
}

impl<W, Fut> Worker<W>
where
    W: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future + Send + 'static,
    Fut::Output: WorkOutcome,
{
    /// Turn the worker into the future submitted to the pool.
    pub(crate) fn into_future(self) -> BoxFuture<'static, ()> {
        let Worker {
            id,
            work,
            ready,
            gate,
            completion,
        } = self;

        async move {
            ready.count_down();
            drop(ready);

            #[cfg(feature = "tracing")]
            trace!(worker = id.0, "worker ready, waiting at start gate");

            if gate.await.is_err() {
                completion.finish(Some(WorkFailure::Interrupted {
                    worker: id,
                    at: Interruption::GateClosed,
                }));
                return;
            }

            let result = AssertUnwindSafe(async { (*work)().await })
                .catch_unwind()
                .await;

            let failure = match result {
                Ok(output) => output
                    .failure()
                    .map(|message| WorkFailure::Failed { worker: id, message }),
                Err(payload) => Some(WorkFailure::Panicked {
                    worker: id,
                    panic_message: panic_message(payload.as_ref()),
                }),
            };
            completion.finish(failure);
        }
        .boxed()
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
