//! # Timing Concurrent Sleeps
//!
//! Runs `--concurrency` copies of a sleep behind the start barrier and prints
//! how long they took together. With enough pool capacity the result is close
//! to one sleep, not the sum of all of them.
//!
//! ```text
//! cargo run --example concurrent_timer
//! cargo run --example concurrent_timer -- --pool tokio --concurrency 100 --work-ms 50
//! RUST_LOG=concurrent_timer=trace cargo run --features tracing --example concurrent_timer
//! ```
//!
//! ## Pools
//! - `threads`: one OS thread per worker, so it never runs out of capacity
//! - `tokio`: a multi-threaded tokio runtime; combine with `--blocking` and a
//!   small `--tokio-threads` to watch blocking work serialize, or add
//!   `--ready-timeout-ms` to see the capacity guard fire

use std::time::Duration;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use concurrent_timer::{thread_per_task, ConcurrentTimer, Measurement};
use futures::future::BoxFuture;
use tracing_subscriber::EnvFilter;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Pool {
    Threads,
    Tokio,
}

#[derive(Parser)]
#[command(
    name = "concurrent_timer",
    version,
    about = "Time N concurrent sleeps behind a start barrier"
)]
struct Cli {
    /// Number of workers released together
    #[arg(short, long, default_value_t = 10)]
    concurrency: usize,

    /// Duration of each work unit, in milliseconds
    #[arg(short, long, default_value_t = 200)]
    work_ms: u64,

    /// Give up if the workers are not all ready within this many milliseconds
    #[arg(long)]
    ready_timeout_ms: Option<u64>,

    #[arg(long, value_enum, default_value_t = Pool::Threads)]
    pool: Pool,

    /// Worker threads for the tokio pool
    #[arg(long, default_value_t = 4)]
    tokio_threads: usize,

    /// Block the worker's thread instead of awaiting an async timer
    #[arg(long)]
    blocking: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let work = Duration::from_millis(cli.work_ms);
    let blocking = cli.blocking;

    // The timer drives its own clock; tokio only backs the sleeps and the pool.
    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(cli.tokio_threads)
        .enable_all()
        .build()?;
    let handle = rt.handle().clone();

    let mut timer = ConcurrentTimer::new(cli.concurrency)?;
    if let Some(ms) = cli.ready_timeout_ms {
        timer = timer.ready_timeout(Duration::from_millis(ms), tokio::time::sleep);
    }

    let spawner: Box<dyn Fn(BoxFuture<'static, ()>)> = match cli.pool {
        Pool::Threads => Box::new(thread_per_task()),
        Pool::Tokio => Box::new(move |fut| {
            handle.spawn(fut);
        }),
    };

    let sleeper = rt.handle().clone();
    let measurement = rt.block_on(timer.run(spawner, move || {
        let sleeper = sleeper.clone();
        async move {
            if blocking {
                std::thread::sleep(work);
            } else {
                // Enter the runtime so the timer works from plain threads too.
                let sleep = {
                    let _guard = sleeper.enter();
                    tokio::time::sleep(work)
                };
                sleep.await;
            }
        }
    }))?;

    report(&measurement, work);

    // The pool belongs to the caller: dispose of it once the run is over.
    rt.shutdown_timeout(Duration::from_secs(1));
    Ok(())
}

fn report(measurement: &Measurement, work: Duration) {
    let elapsed = measurement.elapsed();
    println!("cost time: {} ns ({:?})", elapsed.as_nanos(), elapsed);
    let sequential = match sequential_estimate(work, measurement.concurrency()) {
        Some(total) => format!("{:?}", total),
        None => "beyond Duration::MAX".to_string(),
    };
    println!(
        "{} workers x {:?} each, sequential would be {}",
        measurement.concurrency(),
        work,
        sequential
    );

    if !measurement.is_clean() {
        println!("{} worker(s) failed:", measurement.failures().len());
        for failure in measurement.failures() {
            println!("  {}", failure);
        }
    }
}

/// `work * concurrency`, or `None` if it does not fit in a `Duration`.
fn sequential_estimate(work: Duration, concurrency: usize) -> Option<Duration> {
    u32::try_from(concurrency)
        .ok()
        .and_then(|n| work.checked_mul(n))
}
