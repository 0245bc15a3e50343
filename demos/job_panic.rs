use bounded_pool::TaskPool;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tracing::info;

#[tokio::main]
async fn main() {
  tracing_subscriber::fmt()
    .with_max_level(tracing::Level::DEBUG)
    .with_target(false)
    .init();
  info!("--- Job Panic Example ---");

  let pool = TaskPool::new(1, Handle::current(), "panic_pool");

  pool.submit(async {
    info!("Panicking Job: Starting...");
    tokio::time::sleep(Duration::from_millis(100)).await;
    info!("Panicking Job: About to panic!");
    panic!("This job is designed to panic!");
  });

  // The only permit must come back even though the first job panicked.
  let follow_up_ran = Arc::new(AtomicBool::new(false));
  let follow_up_flag = follow_up_ran.clone();
  pool.submit(async move {
    info!("Follow-up Job: Running after the panic.");
    follow_up_flag.store(true, Ordering::SeqCst);
  });

  pool.wait().await;
  info!(
    "Pool idle. Follow-up job ran: {}. Available permits: {}/{}",
    follow_up_ran.load(Ordering::SeqCst),
    pool.available_permits(),
    pool.capacity()
  );
  info!("--- Job Panic Example End ---");
}
