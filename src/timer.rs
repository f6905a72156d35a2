//! The coordinator: dispatches workers, opens the gate, and takes the timestamps.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::{self, BoxFuture, Either};
use futures::FutureExt;
use parking_lot::Mutex;

#[cfg(feature = "tracing")]
use tracing::{debug, error, info, trace};

use crate::error::{TimerError, TimerResult};
use crate::latch::{CountdownLatch, StartGate};
use crate::measurement::Measurement;
use crate::outcome::WorkOutcome;
use crate::types::WorkerId;
use crate::worker::{CompletionGuard, Worker};

type Sleeper = Box<dyn Fn(Duration) -> BoxFuture<'static, ()> + Send + Sync>;

struct ReadyTimeout {
    after: Duration,
    sleep: Sleeper,
}

/// Runs `concurrency` copies of a work unit behind a start barrier and times them.
///
/// # Protocol
///
/// 1. `concurrency` workers are submitted to the caller's spawner.
/// 2. Each worker counts down the readiness latch as soon as it is polled, then
///    parks on the start gate.
/// 3. Once the readiness latch is at zero the coordinator reads the clock
///    (`started_at`) and opens the gate.
/// 4. Every worker runs the work unit once and counts down the completion latch,
///    whatever the outcome.
/// 5. Once the completion latch is at zero the coordinator reads the clock again
///    (`finished_at`).
///
/// Reading the clock *before* opening the gate keeps the coordinator's own
/// wake-up from the readiness wait out of the measured interval.
///
/// # Pool capacity
///
/// The spawner must be able to make progress on `concurrency` submitted futures
/// at the same time. A pool that runs each future to completion on a fixed set
/// of threads needs at least `concurrency` threads, otherwise the workers
/// already parked at the gate starve the rest and the run never starts. Set
/// [`ConcurrentTimer::ready_timeout`] to turn that hang into
/// [`TimerError::InsufficientCapacity`].
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use concurrent_timer::{thread_per_task, ConcurrentTimer};
///
/// let measurement = ConcurrentTimer::new(4)
///     .unwrap()
///     .run_blocking(thread_per_task(), || async {
///         std::thread::sleep(Duration::from_millis(20));
///     })
///     .unwrap();
///
/// assert!(measurement.is_clean());
/// assert!(measurement.elapsed() >= Duration::from_millis(20));
/// ```
pub struct ConcurrentTimer {
    concurrency: usize,
    ready_timeout: Option<ReadyTimeout>,
}

impl ConcurrentTimer {
    /// Create a timer for `concurrency` simultaneous workers.
    ///
    /// # Errors
    ///
    /// Returns [`TimerError::ZeroConcurrency`] if `concurrency` is 0.
    pub fn new(concurrency: usize) -> TimerResult<Self> {
        if concurrency == 0 {
            return Err(TimerError::ZeroConcurrency);
        }
        Ok(Self {
            concurrency,
            ready_timeout: None,
        })
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Bound the wait for all workers to become ready.
    ///
    /// `sleep` is the runtime's timer, e.g. `tokio::time::sleep`. Only the
    /// readiness phase is bounded; once the gate opens the coordinator waits
    /// for the work units however long they take.
    ///
    /// `sleep` is called on the coordinator's thread, after the workers are
    /// dispatched. Under [`ConcurrentTimer::run_blocking`] that thread is not
    /// inside any runtime, so a timer that needs one (tokio's does) must enter
    /// it itself:
    ///
    /// ```
    /// use std::time::Duration;
    /// use concurrent_timer::ConcurrentTimer;
    ///
    /// let rt = tokio::runtime::Runtime::new().unwrap();
    /// let timers = rt.handle().clone();
    /// let pool = rt.handle().clone();
    ///
    /// let measurement = ConcurrentTimer::new(4)
    ///     .unwrap()
    ///     .ready_timeout(Duration::from_secs(5), move |after| {
    ///         let _guard = timers.enter();
    ///         tokio::time::sleep(after)
    ///     })
    ///     .run_blocking(
    ///         move |fut| {
    ///             pool.spawn(fut);
    ///         },
    ///         || async {},
    ///     )
    ///     .unwrap();
    ///
    /// assert!(measurement.is_clean());
    /// ```
    pub fn ready_timeout<Sl, SlFut>(mut self, after: Duration, sleep: Sl) -> Self
    where
        Sl: Fn(Duration) -> SlFut + Send + Sync + 'static,
        SlFut: Future<Output = ()> + Send + 'static,
    {
        self.ready_timeout = Some(ReadyTimeout {
            after,
            sleep: Box::new(move |d| sleep(d).boxed()),
        });
        self
    }

    /// Dispatch the workers and measure how long the work units ran together.
    ///
    /// # Errors
    ///
    /// - [`TimerError::Coordination`] if every outstanding worker was dropped by
    ///   the pool before all of them became ready.
    /// - [`TimerError::InsufficientCapacity`] if a readiness timeout is set and
    ///   expires.
    ///
    /// Failing work units are not errors; see [`Measurement::failures`].
    ///
    /// Dropping the returned future before it resolves closes the start gate,
    /// so workers still parked there finish as interrupted without running the
    /// work unit.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(skip(self, spawner, work), fields(concurrency = self.concurrency))
    )]
    pub async fn run<S, W, Fut>(&self, spawner: S, work: W) -> TimerResult<Measurement>
    where
        S: Fn(BoxFuture<'static, ()>),
        W: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future + Send + 'static,
        Fut::Output: WorkOutcome,
    {
        let concurrency = self.concurrency;
        let (ready, mut ready_wait) = CountdownLatch::new(concurrency);
        let (done, done_wait) = CountdownLatch::new(concurrency);
        let (gate, gate_wait) = StartGate::new();
        let failures = Arc::new(Mutex::new(Vec::new()));
        let work = Arc::new(work);

        #[cfg(feature = "tracing")]
        debug!(concurrency, "dispatching workers");

        for i in 0..concurrency {
            let worker = Worker {
                id: WorkerId(i),
                work: Arc::clone(&work),
                ready: Arc::clone(&ready),
                gate: gate_wait.clone(),
                completion: CompletionGuard::new(
                    WorkerId(i),
                    Arc::clone(&done),
                    Arc::clone(&failures),
                ),
            };
            spawner(worker.into_future());
        }
        // The coordinator keeps no latch handles: if the pool drops every
        // worker, the waits observe the latch abandoned instead of hanging.
        drop((ready, done, gate_wait, work));

        let readiness = match &self.ready_timeout {
            None => (&mut ready_wait).await,
            Some(timeout) => {
                match future::select(&mut ready_wait, (timeout.sleep)(timeout.after)).await {
                    Either::Left((res, _)) => res,
                    Either::Right(((), pending)) => {
                        let ready = concurrency - pending.remaining();

                        #[cfg(feature = "tracing")]
                        error!(
                            ready,
                            required = concurrency,
                            waited = ?timeout.after,
                            "workers did not become ready in time"
                        );

                        // `gate` drops here, releasing the workers that did arrive.
                        return Err(TimerError::InsufficientCapacity {
                            ready,
                            required: concurrency,
                            waited: timeout.after,
                        });
                    }
                }
            }
        };
        readiness.map_err(|_| {
            #[cfg(feature = "tracing")]
            error!("workers dropped before becoming ready");

            TimerError::Coordination {
                pending: ready_wait.remaining(),
            }
        })?;

        let started_at = Instant::now();
        gate.open();

        #[cfg(feature = "tracing")]
        trace!("all workers ready, start gate open");

        // Each CompletionGuard counts down before it lets go of the latch, so
        // this wait can only end with the count at zero.
        let _ = done_wait.await;
        let finished_at = Instant::now();

        let mut failures = std::mem::take(&mut *failures.lock());
        failures.sort_by_key(|f| f.worker());

        #[cfg(feature = "tracing")]
        info!(
            elapsed = ?finished_at.duration_since(started_at),
            failures = failures.len(),
            "measurement complete"
        );

        Ok(Measurement {
            concurrency,
            started_at,
            finished_at,
            failures,
        })
    }

    /// Like [`ConcurrentTimer::run`], blocking the calling thread until done.
    ///
    /// The spawner must not run futures on the calling thread. The coordinator
    /// runs on a bare `block_on` with no runtime context, which matters for a
    /// [`ready_timeout`](ConcurrentTimer::ready_timeout) sleeper: a tokio
    /// sleeper must enter its runtime's `Handle` before creating the timer.
    pub fn run_blocking<S, W, Fut>(&self, spawner: S, work: W) -> TimerResult<Measurement>
    where
        S: Fn(BoxFuture<'static, ()>),
        W: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future + Send + 'static,
        Fut::Output: WorkOutcome,
    {
        futures::executor::block_on(self.run(spawner, work))
    }
}

/// Measure `concurrency` concurrent runs of `work` on the pool behind `spawner`.
///
/// Shorthand for [`ConcurrentTimer::new`] followed by [`ConcurrentTimer::run`].
///
/// # Examples
///
/// ```no_run
/// # async {
/// use std::time::Duration;
///
/// let measurement = concurrent_timer::measure(
///     |fut| {
///         tokio::spawn(fut);
///     },
///     10,
///     || tokio::time::sleep(Duration::from_millis(200)),
/// )
/// .await
/// .unwrap();
///
/// println!("cost time: {:?}", measurement.elapsed());
/// # };
/// ```
pub async fn measure<S, W, Fut>(spawner: S, concurrency: usize, work: W) -> TimerResult<Measurement>
where
    S: Fn(BoxFuture<'static, ()>),
    W: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future + Send + 'static,
    Fut::Output: WorkOutcome,
{
    ConcurrentTimer::new(concurrency)?.run(spawner, work).await
}

/// Blocking form of [`measure`].
pub fn measure_blocking<S, W, Fut>(spawner: S, concurrency: usize, work: W) -> TimerResult<Measurement>
where
    S: Fn(BoxFuture<'static, ()>),
    W: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future + Send + 'static,
    Fut::Output: WorkOutcome,
{
    ConcurrentTimer::new(concurrency)?.run_blocking(spawner, work)
}
