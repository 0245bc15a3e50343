//! A Tokio-based pool that bounds how many jobs run at once and lets callers
//! wait until every submitted job has finished.

mod capacity_gate;
mod completion;
mod error;
mod job;
mod pool;
mod priority;

pub use capacity_gate::{CapacityGate, GatePermit};
pub use error::PoolError;
pub use job::{BlockingJob, Job};
pub use pool::{Pool, TaskPool};
pub use priority::{hardware_parallelism, Preset, Priority};
