use std::future::Future;
use std::pin::Pin;

/// An asynchronous unit of work. It takes no input and produces nothing;
/// callers that need outcomes record them inside the job.
pub type Job = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// A synchronous unit of work, run on the blocking thread pool.
pub type BlockingJob = Box<dyn FnOnce() + Send + 'static>;
