use crate::capacity_gate::{CapacityGate, GatePermit};
use crate::completion::{CompletionGuard, CompletionTracker};
use crate::error::PoolError;
use crate::job::Job;
use crate::priority::{Preset, Priority};

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::runtime::Handle as TokioHandle;
use tracing::{debug, error, info, info_span, trace, Instrument};

lazy_static::lazy_static! {
  static ref NEXT_POOL_JOB_ID_COUNTER: AtomicU64 = AtomicU64::new(0);
}

/// The two operations every pool offers: hand over a job, and wait for all
/// handed-over jobs to finish.
///
/// The trait is object safe, so a pool can be passed around as `Arc<dyn Pool>`.
pub trait Pool: Send + Sync {
  /// Submits a job without blocking the caller.
  fn submit_job(&self, job: Job);

  /// Resolves once every job submitted before the call has finished.
  fn wait_all(&self) -> BoxFuture<'_, ()>;
}

/// A pool that runs at most `capacity` jobs at the same time on a Tokio
/// runtime.
///
/// Submitting never blocks: each job is spawned as its own task that waits
/// for a permit, runs, gives the permit back and then marks itself finished.
/// [`wait`](TaskPool::wait) resolves when every submitted job has finished.
///
/// Jobs are trusted to terminate. A job that never returns keeps its permit
/// forever, shrinking the pool by one, and `wait` never resolves.
///
/// Cloning is cheap and every clone drives the same pool.
#[derive(Clone, Debug)]
pub struct TaskPool {
  pool_name: Arc<String>,
  gate: Arc<CapacityGate>,
  tracker: Arc<CompletionTracker>,
  tokio_handle: TokioHandle,
}

impl TaskPool {
  /// Creates a pool that runs up to `capacity` jobs at once. A capacity of
  /// zero behaves as one.
  pub fn new(capacity: usize, tokio_handle: TokioHandle, pool_name: &str) -> Self {
    let gate = Arc::new(CapacityGate::new(capacity));
    info!(pool_name = %pool_name, capacity = gate.capacity(), "Task pool created.");
    Self {
      pool_name: Arc::new(pool_name.to_string()),
      gate,
      tracker: Arc::new(CompletionTracker::new()),
      tokio_handle,
    }
  }

  pub fn with_priority(priority: Priority, tokio_handle: TokioHandle, pool_name: &str) -> Self {
    Self::new(priority.capacity(), tokio_handle, pool_name)
  }

  /// A pool sized to one job per logical CPU.
  pub fn with_default_priority(tokio_handle: TokioHandle, pool_name: &str) -> Self {
    Self::with_priority(Priority::from_preset(Preset::Normal), tokio_handle, pool_name)
  }

  /// Creates a pool on the runtime the caller is running in.
  ///
  /// # Errors
  /// Returns `PoolError::NoRuntime` when called outside a Tokio runtime.
  pub fn try_current(capacity: usize, pool_name: &str) -> Result<Self, PoolError> {
    let tokio_handle = TokioHandle::try_current().map_err(|_| PoolError::NoRuntime)?;
    Ok(Self::new(capacity, tokio_handle, pool_name))
  }

  pub fn name(&self) -> &str {
    &self.pool_name
  }

  pub fn capacity(&self) -> usize {
    self.gate.capacity()
  }

  /// Permits not held by any running job.
  pub fn available_permits(&self) -> usize {
    self.gate.get_permits()
  }

  /// Jobs currently holding a permit.
  pub fn running_jobs(&self) -> usize {
    self.capacity() - self.available_permits()
  }

  /// Jobs submitted but not yet finished, including those waiting for a permit.
  pub fn outstanding_jobs(&self) -> usize {
    self.tracker.outstanding()
  }

  /// Submits an async job.
  ///
  /// The job is counted before this returns, so a later `wait` from the same
  /// caller always covers it. The call never waits for a permit.
  pub fn submit<F>(&self, job: F)
  where
    F: Future<Output = ()> + Send + 'static,
  {
    let completion = self.tracker.register();
    let job_id = NEXT_POOL_JOB_ID_COUNTER.fetch_add(1, AtomicOrdering::Relaxed);
    debug!(pool_name = %*self.pool_name, %job_id, "Submitting job.");

    let gate = self.gate.clone();
    let pool_name = self.pool_name.clone();
    let span = info_span!("pool_job", pool_name = %*self.pool_name, %job_id);

    self.tokio_handle.spawn(
      async move {
        let permit = gate.acquire_owned().await;
        trace!("Acquired permit. Available: {}", gate.get_permits());

        if AssertUnwindSafe(job).catch_unwind().await.is_err() {
          error!(pool_name = %*pool_name, %job_id, "Job panicked during execution.");
        }

        Self::finish(permit, completion);
        debug!("Job finished.");
      }
      .instrument(span),
    );
  }

  /// Submits a synchronous job. It runs on Tokio's blocking thread pool while
  /// a permit is held, so it may block freely without stalling async workers.
  pub fn submit_blocking<F>(&self, job: F)
  where
    F: FnOnce() + Send + 'static,
  {
    let completion = self.tracker.register();
    let job_id = NEXT_POOL_JOB_ID_COUNTER.fetch_add(1, AtomicOrdering::Relaxed);
    debug!(pool_name = %*self.pool_name, %job_id, "Submitting blocking job.");

    let gate = self.gate.clone();
    let pool_name = self.pool_name.clone();
    let tokio_handle = self.tokio_handle.clone();
    let span = info_span!("pool_job", pool_name = %*self.pool_name, %job_id);

    self.tokio_handle.spawn(
      async move {
        let permit = gate.acquire_owned().await;
        trace!("Acquired permit. Available: {}", gate.get_permits());

        match tokio_handle.spawn_blocking(job).await {
          Ok(()) => {}
          Err(join_error) if join_error.is_panic() => {
            error!(pool_name = %*pool_name, %job_id, "Blocking job panicked during execution.");
          }
          Err(join_error) => {
            error!(pool_name = %*pool_name, %job_id, "Blocking job did not complete: {}", join_error);
          }
        }

        Self::finish(permit, completion);
        debug!("Blocking job finished.");
      }
      .instrument(span),
    );
  }

  // The permit goes back before the job is uncounted, so `wait` never sees
  // quiescence while a permit is still held.
  fn finish(permit: GatePermit, completion: CompletionGuard) {
    drop(permit);
    drop(completion);
  }

  /// Waits until every job submitted so far has finished.
  ///
  /// Returns immediately when nothing is outstanding and may be called any
  /// number of times.
  ///
  /// Only jobs whose `submit` returned before this call started are covered.
  /// A `submit` racing with `wait` from an unrelated task may or may not be
  /// observed.
  pub async fn wait(&self) {
    trace!(pool_name = %*self.pool_name, outstanding = self.tracker.outstanding(), "Waiting for outstanding jobs.");
    self.tracker.wait_idle().await;
    trace!(pool_name = %*self.pool_name, "Pool is idle.");
  }

  /// Blocking form of [`wait`](TaskPool::wait) for synchronous callers.
  ///
  /// # Errors
  /// Returns `PoolError::BlockingWaitInRuntime` when called from inside a
  /// Tokio runtime context, where blocking could starve the jobs being waited
  /// on. Use `wait().await` there.
  pub fn wait_blocking(&self) -> Result<(), PoolError> {
    if TokioHandle::try_current().is_ok() {
      return Err(PoolError::BlockingWaitInRuntime);
    }
    trace!(pool_name = %*self.pool_name, outstanding = self.tracker.outstanding(), "Blocking until outstanding jobs finish.");
    self.tracker.wait_idle_blocking();
    Ok(())
  }
}

impl Pool for TaskPool {
  fn submit_job(&self, job: Job) {
    self.submit(job);
  }

  fn wait_all(&self) -> BoxFuture<'_, ()> {
    self.wait().boxed()
  }
}
