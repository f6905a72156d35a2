//! Countdown latch and one-shot start gate.
//!
//! Both primitives are split into a shared half held by workers and a waiting
//! half held by the coordinator. The coordinator never holds a shared half, so
//! when every worker has been dropped the waiting half resolves with
//! [`Abandoned`] instead of hanging.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::channel::oneshot;
use futures::future::Shared;
use futures::FutureExt;
use parking_lot::Mutex;

/// Every holder of a latch or gate went away before it was released.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Abandoned;

/// Counts down from `n`; fires a one-shot signal when it reaches zero.
#[derive(Debug)]
pub(crate) struct CountdownLatch {
    remaining: Arc<AtomicUsize>,
    zero: Mutex<Option<oneshot::Sender<()>>>,
}

impl CountdownLatch {
    /// Create a latch and the future that resolves once it reaches zero.
    ///
    /// A latch created with `count == 0` is already released.
    pub(crate) fn new(count: usize) -> (Arc<Self>, LatchWait) {
        let (tx, rx) = oneshot::channel();
        let remaining = Arc::new(AtomicUsize::new(count));
        let latch = Arc::new(Self {
            remaining: Arc::clone(&remaining),
            zero: Mutex::new(Some(tx)),
        });
        if count == 0 {
            latch.release();
        }
        (latch, LatchWait { rx, remaining })
    }

    /// Decrement by one. Counting down an already released latch is a no-op.
    pub(crate) fn count_down(&self) {
        let previous = self
            .remaining
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1));
        if previous == Ok(1) {
            self.release();
        }
    }

    fn release(&self) {
        if let Some(tx) = self.zero.lock().take() {
            // The waiter may already be gone; nothing to notify then.
            let _ = tx.send(());
        }
    }
}

/// Resolves when its [`CountdownLatch`] reaches zero.
#[derive(Debug)]
#[must_use = "futures do nothing unless polled"]
pub(crate) struct LatchWait {
    rx: oneshot::Receiver<()>,
    remaining: Arc<AtomicUsize>,
}

impl LatchWait {
    /// Count still outstanding; stays readable after the latch is abandoned.
    pub(crate) fn remaining(&self) -> usize {
        self.remaining.load(Ordering::Acquire)
    }
}

impl Future for LatchWait {
    type Output = Result<(), Abandoned>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.rx.poll_unpin(cx).map(|res| res.map_err(|_| Abandoned))
    }
}

/// One-shot gate. Opening consumes it; dropping it unopened closes it for good.
#[derive(Debug)]
pub(crate) struct StartGate {
    tx: oneshot::Sender<()>,
}

impl StartGate {
    pub(crate) fn new() -> (Self, GateWait) {
        let (tx, rx) = oneshot::channel();
        (Self { tx }, GateWait { rx: rx.shared() })
    }

    /// Release every current and future waiter.
    pub(crate) fn open(self) {
        let _ = self.tx.send(());
    }
}

/// Cloneable wait side of a [`StartGate`].
///
/// Resolves `Ok(())` once the gate is opened, or `Err(Abandoned)` if the gate
/// was dropped without opening.
#[derive(Clone)]
#[must_use = "futures do nothing unless polled"]
pub(crate) struct GateWait {
    rx: Shared<oneshot::Receiver<()>>,
}

impl Future for GateWait {
    type Output = Result<(), Abandoned>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.rx.poll_unpin(cx).map(|res| res.map_err(|_| Abandoned))
    }
}
