// Common test utilities and helpers for the test suite

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc};
use std::thread::JoinHandle;

use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::Mutex;

/// Spawner for the ambient tokio runtime.
pub fn tokio_spawner() -> impl Fn(BoxFuture<'static, ()>) {
    |fut| {
        tokio::spawn(fut);
    }
}

/// Initialize tracing subscriber for tests (idempotent)
#[cfg(feature = "tracing")]
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[cfg(not(feature = "tracing"))]
pub fn init_tracing() {}

/// A pool of `size` threads, each driving one submitted future to completion
/// before taking the next.
///
/// A worker parked at the start gate holds its thread, so this pool can only
/// ever have `size` workers ready at once.
pub struct FixedPool {
    jobs: Option<mpsc::Sender<BoxFuture<'static, ()>>>,
    threads: Vec<JoinHandle<()>>,
    finished: Arc<AtomicUsize>,
}

impl FixedPool {
    pub fn new(size: usize) -> Self {
        let (tx, rx) = mpsc::channel::<BoxFuture<'static, ()>>();
        let rx = Arc::new(Mutex::new(rx));
        let finished = Arc::new(AtomicUsize::new(0));

        let threads = (0..size)
            .map(|_| {
                let rx = Arc::clone(&rx);
                let finished = Arc::clone(&finished);
                std::thread::spawn(move || loop {
                    let job = rx.lock().recv();
                    match job {
                        Ok(fut) => {
                            futures::executor::block_on(fut);
                            finished.fetch_add(1, Ordering::SeqCst);
                        }
                        Err(_) => break,
                    }
                })
            })
            .collect();

        Self {
            jobs: Some(tx),
            threads,
            finished,
        }
    }

    pub fn spawner(&self) -> impl Fn(BoxFuture<'static, ()>) {
        let jobs = self.jobs.clone().expect("pool already shut down");
        move |fut| {
            jobs.send(fut).expect("pool threads exited");
        }
    }

    /// Number of submitted futures that ran to completion.
    pub fn finished(&self) -> usize {
        self.finished.load(Ordering::SeqCst)
    }

    /// Stop accepting work and wait for every queued future to finish.
    pub fn shutdown(mut self) -> usize {
        self.jobs.take();
        for thread in self.threads.drain(..) {
            thread.join().unwrap();
        }
        self.finished()
    }
}

/// Wraps a spawner so every submitted future bumps `polled` on its first poll.
pub fn counting_spawner<S>(
    spawner: S,
    polled: Arc<AtomicUsize>,
) -> impl Fn(BoxFuture<'static, ()>)
where
    S: Fn(BoxFuture<'static, ()>),
{
    move |fut| {
        let polled = Arc::clone(&polled);
        spawner(
            async move {
                polled.fetch_add(1, Ordering::SeqCst);
                fut.await
            }
            .boxed(),
        )
    }
}
