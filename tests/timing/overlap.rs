//! The work units overlap: N sleeps of D take about D, not N×D

use std::time::Duration;

use concurrent_timer::{measure, measure_blocking, thread_per_task, TimerResult};
use test_case::test_case;

use crate::common::{init_tracing, tokio_spawner};

#[tokio::test(flavor = "multi_thread")]
async fn ten_workers_sleeping_200ms_take_about_200ms() -> TimerResult<()> {
    init_tracing();
    let work = Duration::from_millis(200);

    let m = measure(tokio_spawner(), 10, move || tokio::time::sleep(work)).await?;

    println!("cost time: {:?} (sequential would be {:?})", m.elapsed(), work * 10);
    assert!(m.is_clean());
    assert!(m.elapsed() >= work, "finished early: {:?}", m.elapsed());
    assert!(
        m.elapsed() < work + Duration::from_millis(50),
        "work units did not overlap: {:?}",
        m.elapsed()
    );
    Ok(())
}

#[test]
fn ten_blocking_workers_on_threads_take_about_200ms() -> TimerResult<()> {
    let work = Duration::from_millis(200);

    let m = measure_blocking(thread_per_task(), 10, move || async move {
        std::thread::sleep(work);
    })?;

    assert!(m.elapsed() >= work);
    assert!(
        m.elapsed() < work + Duration::from_millis(50),
        "work units did not overlap: {:?}",
        m.elapsed()
    );
    Ok(())
}

#[test_case(1 ; "single worker")]
#[test_case(2 ; "two workers")]
#[test_case(8 ; "eight workers")]
#[test_case(32 ; "thirty-two workers")]
fn measured_time_does_not_scale_with_worker_count(concurrency: usize) {
    let work = Duration::from_millis(50);

    let m = measure_blocking(thread_per_task(), concurrency, move || async move {
        std::thread::sleep(work);
    })
    .unwrap();

    assert_eq!(m.concurrency(), concurrency);
    assert!(m.elapsed() >= work);
    assert!(
        m.elapsed() < work + Duration::from_millis(100),
        "{} workers took {:?}",
        concurrency,
        m.elapsed()
    );
}

#[tokio::test]
async fn single_worker_measures_its_own_duration() -> TimerResult<()> {
    let work = Duration::from_millis(80);

    let m = measure(tokio_spawner(), 1, move || tokio::time::sleep(work)).await?;

    assert!(m.elapsed() >= work);
    assert!(m.elapsed() < work + Duration::from_millis(50));
    Ok(())
}
