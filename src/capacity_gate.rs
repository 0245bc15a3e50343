use std::fmt;
use std::sync::Arc;

use futures_intrusive::sync::Semaphore;
use tracing::{debug, error};

/// A fixed-capacity pool of interchangeable permits.
///
/// The gate starts with exactly `capacity` permits available. Every
/// [`acquire`](CapacityGate::acquire) must be matched by exactly one
/// [`release`](CapacityGate::release); [`acquire_owned`](CapacityGate::acquire_owned)
/// does the pairing automatically through [`GatePermit`].
///
/// Waiters are served in FIFO order.
pub struct CapacityGate {
  semaphore: Semaphore,
  capacity: usize,
}

impl fmt::Debug for CapacityGate {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("CapacityGate")
      .field("capacity", &self.capacity)
      .field("permits", &self.get_permits())
      .finish()
  }
}

impl CapacityGate {
  /// Creates a gate pre-loaded with `capacity` permits. A capacity of zero is
  /// treated as one so the gate can always make progress.
  pub fn new(capacity: usize) -> Self {
    if capacity == 0 {
      debug!("CapacityGate: requested capacity 0, clamping to 1.");
    }
    let capacity = capacity.max(1);
    Self {
      semaphore: Semaphore::new(true, capacity),
      capacity,
    }
  }

  /// The fixed number of permits this gate was created with.
  pub fn capacity(&self) -> usize {
    self.capacity
  }

  /// Number of permits available right now. Useful for monitoring only; the
  /// value may be stale as soon as it is returned.
  pub fn get_permits(&self) -> usize {
    self.semaphore.permits()
  }

  /// Waits until a permit is available and consumes it.
  ///
  /// There is no timeout and no failure mode. The caller owns the permit and
  /// must hand it back with [`release`](CapacityGate::release).
  pub async fn acquire(&self) {
    let mut releaser = self.semaphore.acquire(1).await;
    releaser.disarm();
  }

  /// Consumes a permit if one is immediately available.
  pub fn try_acquire(&self) -> bool {
    match self.semaphore.try_acquire(1) {
      Some(mut releaser) => {
        releaser.disarm();
        true
      }
      None => false,
    }
  }

  /// Returns one permit to the gate, waking at most one waiter.
  ///
  /// Releasing more permits than were acquired would let more than `capacity`
  /// holders in at once, so such a release is logged and dropped.
  pub fn release(&self) {
    let available = self.semaphore.permits();
    if available >= self.capacity {
      error!(
        capacity = self.capacity,
        available, "CapacityGate: release without a matching acquire. Ignoring."
      );
      return;
    }
    self.semaphore.release(1);
  }

  /// Waits for a permit and wraps it in a guard that releases it on drop.
  pub async fn acquire_owned(self: &Arc<Self>) -> GatePermit {
    self.acquire().await;
    GatePermit { gate: self.clone() }
  }
}

/// A permit held from a [`CapacityGate`]. Dropping it releases the permit,
/// including when the holder unwinds.
#[derive(Debug)]
pub struct GatePermit {
  gate: Arc<CapacityGate>,
}

impl Drop for GatePermit {
  fn drop(&mut self) {
    self.gate.release();
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::atomic::{AtomicUsize, Ordering};
  use std::time::Duration;

  #[test]
  fn test_zero_capacity_is_clamped_to_one() {
    let gate = CapacityGate::new(0);
    assert_eq!(gate.capacity(), 1);
    assert_eq!(gate.get_permits(), 1);
  }

  #[tokio::test]
  async fn test_acquire_release() {
    let gate = CapacityGate::new(3);
    assert_eq!(gate.get_permits(), 3);

    gate.acquire().await;
    gate.acquire().await;
    assert_eq!(gate.get_permits(), 1);

    gate.release();
    assert_eq!(gate.get_permits(), 2);
    gate.release();
    assert_eq!(gate.get_permits(), 3);
  }

  #[test]
  fn test_try_acquire_exhausts() {
    let gate = CapacityGate::new(1);
    assert!(gate.try_acquire());
    assert!(!gate.try_acquire());
    gate.release();
    assert!(gate.try_acquire());
  }

  #[test]
  fn test_unmatched_release_is_ignored() {
    let gate = CapacityGate::new(2);
    gate.release();
    assert_eq!(gate.get_permits(), 2);
  }

  #[tokio::test]
  async fn test_owned_permit_released_on_drop() {
    let gate = Arc::new(CapacityGate::new(2));
    let permit = gate.acquire_owned().await;
    assert_eq!(gate.get_permits(), 1);
    drop(permit);
    assert_eq!(gate.get_permits(), 2);
  }

  #[tokio::test]
  async fn test_acquire_blocks_when_exhausted() {
    let gate = Arc::new(CapacityGate::new(1));
    let held = gate.acquire_owned().await;

    let acquire_future = gate.acquire_owned();
    tokio::pin!(acquire_future);

    tokio::select! {
        _ = &mut acquire_future => {
            panic!("Acquire should have blocked because no permit is available.");
        },
        _ = tokio::time::sleep(Duration::from_millis(50)) => {}
    }

    drop(held);
    let second = tokio::time::timeout(Duration::from_millis(50), acquire_future)
      .await
      .expect("Acquire did not complete after the permit was released.");
    assert_eq!(gate.get_permits(), 0);
    drop(second);
    assert_eq!(gate.get_permits(), 1);
  }

  #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
  async fn test_concurrent_holders_never_exceed_capacity() {
    let gate = Arc::new(CapacityGate::new(3));
    let holders = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));

    let mut handles = Vec::new();
    for _ in 0..30 {
      let gate = gate.clone();
      let holders = holders.clone();
      let peak = peak.clone();
      handles.push(tokio::spawn(async move {
        let _permit = gate.acquire_owned().await;
        let now = holders.fetch_add(1, Ordering::SeqCst) + 1;
        peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(5)).await;
        holders.fetch_sub(1, Ordering::SeqCst);
      }));
    }
    for handle in handles {
      handle.await.unwrap();
    }

    assert!(peak.load(Ordering::SeqCst) <= 3);
    assert_eq!(gate.get_permits(), 3);
  }
}
