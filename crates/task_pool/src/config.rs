//! Scheduler configuration, work categories and phase budgets.

use std::time::Duration;

use crate::SchedulerError;

/// Identifies one of the scheduler's work queues.
///
/// Unrelated subsystems pick distinct categories so their work never shares a
/// phase.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct WorkCategory(usize);

impl WorkCategory {
  #[inline]
  pub const fn new(index: usize) -> Self {
    Self(index)
  }

  #[inline]
  pub const fn index(self) -> usize {
    self.0
  }
}

/// How long a phase started with [`Scheduler::start`](crate::Scheduler::start)
/// may keep the workers busy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PhaseBudget {
  /// Run until every item, including items submitted while the phase runs,
  /// has finished.
  #[default]
  Drain,

  /// Stop picking up new items once the slice has elapsed. Items still queued
  /// stay buffered for a later phase.
  Slice(Duration),
}

impl PhaseBudget {
  /// Effective time slice, rounded up to the scheduler's granularity.
  /// `None` means no deadline.
  #[inline]
  pub fn time_slice(self, granularity: Duration) -> Option<Duration> {
    match self {
      PhaseBudget::Drain => None,
      PhaseBudget::Slice(slice) => Some(slice.max(granularity)),
    }
  }
}

/// Startup configuration for a [`Scheduler`](crate::Scheduler).
///
/// Supplied once by the host process. There is no runtime reconfiguration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SchedulerConfig {
  /// Number of worker threads (fixed for the scheduler's lifetime).
  pub thread_count: usize,

  /// Smallest time slice a [`PhaseBudget::Slice`] is rounded up to.
  pub slice_granularity: Duration,

  /// Number of work categories (one queue each).
  pub categories: usize,

  /// Maximum items a worker takes from the queue per lock acquisition.
  pub pop_batch: usize,

  /// Worker thread name prefix; workers are named `{prefix}-{index}`.
  pub thread_name: &'static str,
}

impl SchedulerConfig {
  /// Default configuration: 4 workers, 1ms granularity, 4 categories.
  pub const DEFAULT: Self = Self {
    thread_count: 4,
    slice_granularity: Duration::from_millis(1),
    categories: 4,
    pop_batch: 1,
    thread_name: "task-pool-worker",
  };

  /// One worker per available hardware thread, falling back to the default
  /// count when parallelism cannot be queried.
  pub fn from_available_parallelism() -> Self {
    let thread_count = std::thread::available_parallelism()
      .map(|n| n.get())
      .unwrap_or(Self::DEFAULT.thread_count);
    Self {
      thread_count,
      ..Self::DEFAULT
    }
  }

  pub fn with_thread_count(mut self, thread_count: usize) -> Self {
    self.thread_count = thread_count;
    self
  }

  pub fn with_slice_granularity(mut self, granularity: Duration) -> Self {
    self.slice_granularity = granularity;
    self
  }

  pub fn with_categories(mut self, categories: usize) -> Self {
    self.categories = categories;
    self
  }

  pub fn with_pop_batch(mut self, pop_batch: usize) -> Self {
    self.pop_batch = pop_batch;
    self
  }

  /// Check the configuration before any thread is spawned.
  pub fn validate(&self) -> Result<(), SchedulerError> {
    if self.thread_count == 0 {
      return Err(SchedulerError::InvalidConfig("thread_count must be at least 1"));
    }
    if self.categories == 0 {
      return Err(SchedulerError::InvalidConfig("categories must be at least 1"));
    }
    if self.pop_batch == 0 {
      return Err(SchedulerError::InvalidConfig("pop_batch must be at least 1"));
    }
    Ok(())
  }
}

impl Default for SchedulerConfig {
  fn default() -> Self {
    Self::DEFAULT
  }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;
