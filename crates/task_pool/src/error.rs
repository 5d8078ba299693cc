//! Scheduler error type.

/// Errors returned by the scheduler API.
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
  #[error("Invalid scheduler config: {0}")]
  InvalidConfig(&'static str),

  #[error("Unknown work category {category} (scheduler has {count} categories)")]
  UnknownCategory { category: usize, count: usize },

  #[error("Failed to spawn worker thread {index}")]
  SpawnWorker {
    index: usize,
    #[source]
    source: std::io::Error,
  },

  #[error("Scheduler has been shut down")]
  ShutDown,

  #[error("Worker thread {0} is no longer reachable")]
  WorkerLost(usize),
}
