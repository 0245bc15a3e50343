use thiserror::Error;

/// Errors that can occur within the `bounded_pool` convenience entry points.
///
/// Submitting and waiting never fail; these only come from binding a pool to
/// the ambient runtime or from waiting synchronously in the wrong context.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum PoolError {
  #[error("No Tokio runtime is available in the current context")]
  NoRuntime,

  #[error("Blocking wait called from inside a Tokio runtime context; use `wait().await` instead")]
  BlockingWaitInRuntime,
}
