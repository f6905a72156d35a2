//! A spawner backed by plain OS threads.

use std::io;
use std::thread;

use futures::future::BoxFuture;

#[cfg(feature = "tracing")]
use tracing::warn;

/// A spawner that drives each submitted future on its own new OS thread.
///
/// Every submission gets a dedicated thread, so any number of workers can be
/// parked at the start gate at once, and a work unit may block its thread
/// (`std::thread::sleep`, blocking I/O) without stalling the other workers.
/// Threads exit when their future completes; there is nothing to shut down.
///
/// If the OS refuses to create a thread, the future is dropped unpolled. The
/// worker is then recorded as [`Interruption::Dropped`](crate::Interruption)
/// and the run ends with [`TimerError::Coordination`](crate::TimerError)
/// rather than a panic.
///
/// # Examples
///
/// ```
/// use concurrent_timer::{measure_blocking, thread_per_task};
///
/// let measurement = measure_blocking(thread_per_task(), 3, || async {}).unwrap();
/// assert_eq!(measurement.concurrency(), 3);
/// ```
pub fn thread_per_task() -> impl Fn(BoxFuture<'static, ()>) {
    |fut| {
        // On failure the closure, and the future with it, is dropped.
        let _ = spawn_on(thread::Builder::new(), fut);
    }
}

pub(crate) fn spawn_on(builder: thread::Builder, fut: BoxFuture<'static, ()>) -> io::Result<()> {
    builder
        .name("concurrent-timer-worker".to_string())
        .spawn(move || futures::executor::block_on(fut))
        .map(drop)
        .map_err(|e| {
            #[cfg(feature = "tracing")]
            warn!(error = %e, "could not spawn worker thread");

            e
        })
}
