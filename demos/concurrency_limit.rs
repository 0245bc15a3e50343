use bounded_pool::TaskPool;
use std::time::{Duration, Instant};
use tokio::runtime::Handle;
use tracing::info;

async fn long_job_fn(id: usize) {
  info!("Job {} starting (concurrency test - should take 1s)", id);
  tokio::time::sleep(Duration::from_secs(1)).await;
  info!("Job {} finished", id);
}

#[tokio::main]
async fn main() {
  tracing_subscriber::fmt()
    .with_max_level(tracing::Level::DEBUG)
    .with_target(false)
    .init();

  info!("--- Concurrency Limit Example (Limit: 2) ---");

  let concurrency_limit = 2;
  let pool = TaskPool::new(concurrency_limit, Handle::current(), "concurrency_pool");

  let num_jobs = 5;
  info!(
    "Submitting {} jobs, each takes 1 sec. With concurrency {}, this should take ~{} secs.",
    num_jobs,
    concurrency_limit,
    (num_jobs as f32 / concurrency_limit as f32).ceil()
  );

  let started = Instant::now();
  for i in 0..num_jobs {
    pool.submit(long_job_fn(i));
  }

  tokio::time::sleep(Duration::from_millis(100)).await;
  info!(
    "Running: {}, outstanding: {}",
    pool.running_jobs(),
    pool.outstanding_jobs()
  );

  pool.wait().await;
  info!("All jobs processed in {:.2?}.", started.elapsed());
  info!("--- Concurrency Limit Example End ---");
}
