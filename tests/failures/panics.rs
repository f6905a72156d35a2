//! Work units that panic

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use concurrent_timer::{measure, measure_blocking, thread_per_task, WorkFailure};

use crate::common::tokio_spawner;

// Panics from a function returning `()`, so async blocks calling it keep a `()` output.
fn explode(message: &str) {
    panic!("{}", message);
}

#[tokio::test(flavor = "multi_thread")]
async fn one_panicking_worker_is_reported() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);

    let m = measure(tokio_spawner(), 4, move || {
        let call = counter.fetch_add(1, Ordering::SeqCst);
        async move {
            if call == 0 {
                panic!("corrupt input");
            }
        }
    })
    .await
    .unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 4);
    assert_eq!(m.failures().len(), 1);
    match &m.failures()[0] {
        WorkFailure::Panicked { panic_message, .. } => assert_eq!(panic_message, "corrupt input"),
        other => panic!("expected a panic failure, got {:?}", other),
    }
}

#[test]
fn every_worker_panicking_on_threads_does_not_hang() {
    let m = measure_blocking(thread_per_task(), 8, || async { explode("always") })
    .unwrap();

    assert_eq!(m.failures().len(), 8);
    assert!(m
        .failures()
        .iter()
        .all(|f| matches!(f, WorkFailure::Panicked { .. })));
}

#[test]
fn formatted_panic_message_is_kept() {
    let m = measure_blocking(thread_per_task(), 1, || async {
        let index = 7;
        explode(&format!("slot {} out of range", index));
    })
    .unwrap();

    assert_eq!(
        m.failures()[0].to_string(),
        "worker #0 panicked: slot 7 out of range"
    );
}
