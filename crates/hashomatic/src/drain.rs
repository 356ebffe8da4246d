//! Outstanding-work counter backing the shutdown drain.
//!
//! Every accepted unit of work (a request being handled, a pending digest)
//! holds a [`WorkGuard`]. The count drops when the guard is dropped, which
//! also happens while a panicking task unwinds, so a failed worker can never
//! hold shutdown open.

use std::pin::pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::Notify;

#[derive(Debug, Default)]
struct BarrierInner {
    outstanding: AtomicUsize,
    idle: Notify,
}

/// Cloneable handle to the shared counter.
#[derive(Debug, Clone, Default)]
pub struct DrainBarrier {
    inner: Arc<BarrierInner>,
}

impl DrainBarrier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register one unit of work. The returned guard must live until the work is done.
    pub fn enter(&self) -> WorkGuard {
        self.inner.outstanding.fetch_add(1, Ordering::AcqRel);
        WorkGuard {
            inner: Arc::clone(&self.inner),
        }
    }

    pub fn outstanding(&self) -> usize {
        self.inner.outstanding.load(Ordering::Acquire)
    }

    /// Resolve once no work is outstanding.
    pub async fn drained(&self) {
        loop {
            // Register interest before checking the count so a release
            // between the check and the await is not lost.
            let mut notified = pin!(self.inner.idle.notified());
            notified.as_mut().enable();

            if self.outstanding() == 0 {
                return;
            }
            notified.await;
        }
    }
}

/// RAII registration on a [`DrainBarrier`].
#[derive(Debug)]
#[must_use = "dropping the guard immediately marks the work as finished"]
pub struct WorkGuard {
    inner: Arc<BarrierInner>,
}

impl Drop for WorkGuard {
    fn drop(&mut self) {
        if self.inner.outstanding.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.inner.idle.notify_waiters();
        }
    }
}
