//! Concurrent Execution Timer
//!
//! Measures the wall-clock time of `N` copies of a work unit running at the
//! same time, with thread start-up and scheduling jitter kept out of the
//! measurement.
//!
//! # How it works
//!
//! A run coordinates three primitives:
//!
//! - a **readiness latch** starting at `N`, counted down by each worker as soon
//!   as it is running,
//! - a **start gate**, a one-shot signal every worker parks on,
//! - a **completion latch** starting at `N`, counted down by each worker once
//!   its work unit is over, however it ended.
//!
//! The coordinator waits for the readiness latch, reads the clock, opens the
//! gate, waits for the completion latch and reads the clock again. Reading the
//! clock right before opening the gate (instead of after being woken by a
//! "ready" signal) keeps the coordinator's own wake-up latency out of the
//! interval.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::time::Duration;
//!
//! # async {
//! let measurement = concurrent_timer::measure(
//!     |fut| {
//!         tokio::spawn(fut);
//!     },
//!     10,
//!     || tokio::time::sleep(Duration::from_millis(200)),
//! )
//! .await
//! .unwrap();
//!
//! // Roughly 200ms, not 2s: the ten sleeps overlapped.
//! println!("cost time: {:?}", measurement.elapsed());
//! # };
//! ```
//!
//! # Runtime-agnostic
//!
//! The execution pool is whatever the spawner closure submits to:
//!
//! - Tokio: `|fut| { tokio::spawn(fut); }`
//! - Smol: `|fut| smol::spawn(fut).detach()`
//! - `futures::executor::ThreadPool`: `move |fut| pool.spawn_ok(fut)`
//! - One OS thread per worker: [`thread_per_task()`]
//!
//! The crate never shuts the pool down. The pool must be able to progress all
//! `N` workers at once; see [`ConcurrentTimer`] for what happens when it can't.
//!
//! # Failures
//!
//! A work unit may resolve to `()` or to any `Result<T, E: Display>` (see
//! [`WorkOutcome`]). Errors, panics and cancelled workers are collected in
//! [`Measurement::failures`]; they never stop the other workers and never keep
//! the completion latch from reaching zero. Only coordination problems, such
//! as the pool dropping every worker or a readiness timeout, are returned as
//! [`TimerError`].
//!
//! # Tracing
//!
//! Enable the `tracing` feature to emit spans and events for dispatch, gate
//! opening, completion and per-worker failures.

mod error;
mod latch;
mod measurement;
mod outcome;
mod pool;
mod timer;
mod types;
mod worker;

pub use error::{TimerError, TimerResult};
pub use measurement::{Interruption, Measurement, WorkFailure};
pub use outcome::WorkOutcome;
pub use pool::thread_per_task;
pub use timer::{measure, measure_blocking, ConcurrentTimer};
pub use types::WorkerId;
