//! Bounded-fan-out task queue
//!
//! Units of work are spawned onto the tokio runtime behind a semaphore that
//! bounds how many run at once. The queue tracks how many submitted units
//! have not yet settled; `drain` resolves once that count reaches zero,
//! which covers work submitted while draining — visiting a node's children
//! routinely submits more work after `drain` has been entered.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::{Notify, Semaphore, oneshot};

#[derive(Clone)]
pub struct TaskQueue {
    semaphore: Arc<Semaphore>,
    pending: Arc<AtomicUsize>,
    notify: Arc<Notify>,
}

/// Marks a unit settled when dropped, so a panicking unit cannot wedge
/// `drain`.
struct Settled {
    pending: Arc<AtomicUsize>,
    notify: Arc<Notify>,
}

impl Drop for Settled {
    fn drop(&mut self) {
        if self.pending.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.notify.notify_waiters();
        }
    }
}

impl TaskQueue {
    pub fn new(concurrency: usize) -> Self {
        TaskQueue {
            semaphore: Arc::new(Semaphore::new(concurrency.max(1))),
            pending: Arc::new(AtomicUsize::new(0)),
            notify: Arc::new(Notify::new()),
        }
    }

    /// Submit a unit of work. The returned receiver yields the unit's
    /// output once it settles; a unit that panics closes its channel. A
    /// failing unit never stops other queued units from running.
    pub fn submit<F, T>(&self, future: F) -> oneshot::Receiver<T>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let (result_tx, result_rx) = oneshot::channel();
        self.pending.fetch_add(1, Ordering::AcqRel);
        let settled = Settled {
            pending: Arc::clone(&self.pending),
            notify: Arc::clone(&self.notify),
        };
        let semaphore = Arc::clone(&self.semaphore);

        tokio::spawn(async move {
            let _settled = settled;
            // The semaphore is never closed, so acquisition only fails if
            // the queue itself is gone
            let Ok(_permit) = semaphore.acquire_owned().await else {
                return;
            };
            let output = future.await;
            // The submitter may have dropped its receiver
            let _ = result_tx.send(output);
        });

        result_rx
    }

    /// Number of submitted units that have not yet settled.
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }

    /// Wait until every submitted unit — including units submitted while
    /// waiting — has settled.
    pub async fn drain(&self) {
        loop {
            let notified = self.notify.notified();
            if self.pending.load(Ordering::Acquire) == 0 {
                return;
            }
            notified.await;
        }
    }
}
