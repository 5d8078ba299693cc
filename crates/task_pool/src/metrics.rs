//! Engine-agnostic phase metrics for the scheduler.
//!
//! Feature-gated and runtime-toggled to ensure zero overhead when disabled.
//!
//! # Usage
//!
//! ```ignore
//! use task_pool::metrics::COLLECT_METRICS;
//!
//! // Compile with --features metrics
//! // Runtime toggle:
//! COLLECT_METRICS.store(false, Ordering::Relaxed);
//!
//! let report = scheduler.start(category, PhaseBudget::Drain)?;
//! println!("avg phase: {}us", scheduler.metrics().average_phase_us());
//! ```

use std::collections::VecDeque;
use std::sync::atomic::AtomicBool;
#[cfg(feature = "metrics")]
use std::sync::atomic::Ordering;

use crate::{PhaseReport, WorkCategory};

/// Runtime toggle for metrics collection.
pub static COLLECT_METRICS: AtomicBool = AtomicBool::new(true);

/// Check if metrics collection is enabled (both compile-time and runtime).
#[inline]
pub fn is_enabled() -> bool {
  #[cfg(feature = "metrics")]
  {
    COLLECT_METRICS.load(Ordering::Relaxed)
  }
  #[cfg(not(feature = "metrics"))]
  {
    false
  }
}

/// Phases kept in [`SchedulerMetrics::recent`].
pub const PHASE_HISTORY: usize = 64;

/// Condensed [`PhaseReport`] kept in the recent-phase history.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PhaseSample {
  pub category: WorkCategory,
  pub elapsed_us: u64,
  pub executed: usize,
  pub remaining: usize,
}

impl From<&PhaseReport> for PhaseSample {
  fn from(report: &PhaseReport) -> Self {
    Self {
      category: report.category,
      elapsed_us: report.elapsed.as_micros() as u64,
      executed: report.executed,
      remaining: report.remaining,
    }
  }
}

/// Scheduler-level statistics, updated after every phase.
#[derive(Debug, Clone, Default)]
pub struct SchedulerMetrics {
  /// Last [`PHASE_HISTORY`] phases, oldest first.
  recent: VecDeque<PhaseSample>,
  /// Phases that ended with work still queued (time slice ran out).
  pub truncated_phases: u64,
  pub total_phases: u64,
  pub total_items: u64,
}

impl SchedulerMetrics {
  pub fn new() -> Self {
    Self::default()
  }

  /// Record a finished phase.
  pub fn record_phase(&mut self, report: &PhaseReport) {
    if !is_enabled() {
      return;
    }
    if self.recent.len() == PHASE_HISTORY {
      self.recent.pop_front();
    }
    self.recent.push_back(PhaseSample::from(report));

    self.total_phases += 1;
    self.total_items += report.executed as u64;
    if !report.is_drained() {
      self.truncated_phases += 1;
    }
  }

  pub fn recent(&self) -> impl Iterator<Item = &PhaseSample> {
    self.recent.iter()
  }

  pub fn last_phase(&self) -> Option<&PhaseSample> {
    self.recent.back()
  }

  /// Mean wall time of the recent phases, 0 when none were recorded.
  pub fn average_phase_us(&self) -> f64 {
    if self.recent.is_empty() {
      return 0.0;
    }
    let total: u64 = self.recent.iter().map(|sample| sample.elapsed_us).sum();
    total as f64 / self.recent.len() as f64
  }

  /// Items per microsecond over the recent phases of `category`.
  pub fn throughput(&self, category: WorkCategory) -> Option<f64> {
    let (items, us) = self
      .recent
      .iter()
      .filter(|sample| sample.category == category)
      .fold((0u64, 0u64), |(items, us), sample| {
        (items + sample.executed as u64, us + sample.elapsed_us)
      });
    (us > 0).then(|| items as f64 / us as f64)
  }

  pub fn reset(&mut self) {
    *self = Self::default();
  }
}
