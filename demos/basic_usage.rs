use bounded_pool::TaskPool;
use std::time::Duration;
use tokio::runtime::Handle;
use tracing::info;

async fn my_job_fn(id: usize) {
  info!("Job {} starting, will sleep for 2s", id);
  tokio::time::sleep(Duration::from_secs(2)).await;
  info!("Job {} finished", id);
}

#[tokio::main]
async fn main() {
  tracing_subscriber::fmt()
    .with_max_level(tracing::Level::DEBUG)
    .with_target(false) // Disable module paths for cleaner example output
    .init();

  info!("--- Basic Usage Example ---");

  let pool = TaskPool::with_default_priority(Handle::current(), "basic_pool");
  info!("Pool '{}' runs up to {} jobs at once.", pool.name(), pool.capacity());

  for i in 1..=10 {
    pool.submit(my_job_fn(i));
  }

  info!("All jobs submitted ({} outstanding). Waiting...", pool.outstanding_jobs());
  pool.wait().await;

  info!("All jobs completed.");
  info!("--- Basic Usage Example End ---");
}
