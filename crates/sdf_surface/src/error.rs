//! Error types for octree sampling.

use task_pool::SchedulerError;

#[derive(Debug, thiserror::Error)]
pub enum SamplerError {
  /// Region radius or depth outside the supported range.
  #[error("invalid sample region: {0}")]
  InvalidRegion(&'static str),

  #[error("scheduler error: {0}")]
  Scheduler(#[from] SchedulerError),

  /// The sampling phase ended with cells still queued.
  #[error("sampling phase left {remaining} cells unprocessed")]
  Incomplete { remaining: usize },
}
