use std::fmt;
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};
use tokio::sync::Notify;

/// Counts jobs that have been submitted but have not finished yet, and lets
/// callers wait until that count drops to zero.
pub(crate) struct CompletionTracker {
  outstanding: Mutex<usize>,
  idle_blocking: Condvar,
  idle_async: Notify,
}

impl fmt::Debug for CompletionTracker {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("CompletionTracker")
      .field("outstanding", &self.outstanding())
      .finish_non_exhaustive()
  }
}

impl CompletionTracker {
  pub(crate) fn new() -> Self {
    Self {
      outstanding: Mutex::new(0),
      idle_blocking: Condvar::new(),
      idle_async: Notify::new(),
    }
  }

  /// Counts one more outstanding job. The returned guard uncounts it when
  /// dropped.
  pub(crate) fn register(self: &Arc<Self>) -> CompletionGuard {
    *self.outstanding.lock() += 1;
    CompletionGuard { tracker: self.clone() }
  }

  pub(crate) fn outstanding(&self) -> usize {
    *self.outstanding.lock()
  }

  fn complete_one(&self) {
    let mut outstanding = self.outstanding.lock();
    *outstanding -= 1;
    if *outstanding == 0 {
      self.idle_blocking.notify_all();
      self.idle_async.notify_waiters();
    }
  }

  /// Resolves once no jobs are outstanding.
  pub(crate) async fn wait_idle(&self) {
    loop {
      let notified = self.idle_async.notified();
      tokio::pin!(notified);
      // Register interest before sampling so a concurrent `notify_waiters`
      // between the check and the await is not missed.
      notified.as_mut().enable();
      if self.outstanding() == 0 {
        return;
      }
      notified.await;
    }
  }

  /// Blocks the current thread until no jobs are outstanding.
  pub(crate) fn wait_idle_blocking(&self) {
    let mut outstanding = self.outstanding.lock();
    while *outstanding > 0 {
      self.idle_blocking.wait(&mut outstanding);
    }
  }
}

/// Marks one outstanding job. Dropping it records the job as finished.
#[derive(Debug)]
pub(crate) struct CompletionGuard {
  tracker: Arc<CompletionTracker>,
}

impl Drop for CompletionGuard {
  fn drop(&mut self) {
    self.tracker.complete_one();
  }
}
