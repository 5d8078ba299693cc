//! OctreeSampler - parallel adaptive subdivision on the task pool.
//!
//! Every cell is one work item. A worker evaluates the field at the cell
//! center and either prunes the cell, records it as a sample point, or
//! submits its eight children back into the running phase. One drained phase
//! therefore covers the whole recursion.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use glam::Vec3;
use task_pool::{PhaseBudget, Scheduler, Task, WorkCategory, WorkContext, WorkItem};
use tracing::debug;
use web_time::Instant;

use super::{Cell, SampleRegion};
use crate::{ImplicitSurface, SamplerError};

/// Sampler configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SamplerConfig {
  /// Scheduler category the cell items run in. Should not be shared with
  /// unrelated work.
  pub category: WorkCategory,
}

impl SamplerConfig {
  pub const DEFAULT: Self = Self {
    category: WorkCategory::new(0),
  };

  pub fn with_category(mut self, category: WorkCategory) -> Self {
    self.category = category;
    self
  }
}

impl Default for SamplerConfig {
  fn default() -> Self {
    Self::DEFAULT
  }
}

/// Statistics from one [`OctreeSampler::create_points`] call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SamplingStats {
  /// Cells whose center was evaluated (seeds included).
  pub cells_evaluated: u64,
  /// Cells discarded because the surface cannot reach them.
  pub cells_pruned: u64,
  /// Cells that reached `max_depth` and became sample points.
  pub points_emitted: u64,
  /// Wall time of the sampling phase.
  pub elapsed_us: u64,
}

impl SamplingStats {
  /// Cells that were split into children.
  #[inline]
  pub fn cells_subdivided(&self) -> u64 {
    self.cells_evaluated - self.cells_pruned - self.points_emitted
  }
}

/// Surface-adjacent sample points at terminal resolution.
#[derive(Clone, Debug, Default)]
pub struct SampleCloud {
  /// Centers of surviving terminal cells, in no particular order.
  pub points: Vec<Vec3>,
  /// Edge length of a terminal cell.
  pub cell_size: f32,
  pub stats: SamplingStats,
}

impl SampleCloud {
  pub fn len(&self) -> usize {
    self.points.len()
  }

  pub fn is_empty(&self) -> bool {
    self.points.is_empty()
  }
}

// =============================================================================
// Phase environment
// =============================================================================

/// Shared state every cell item reads during the sampling phase.
struct SamplingEnv {
  field: Arc<dyn ImplicitSurface>,
  max_depth: u32,
  points: Mutex<Vec<Vec3>>,
  cells_evaluated: AtomicU64,
  cells_pruned: AtomicU64,
}

impl SamplingEnv {
  fn visit(&self, cell: Cell, ctx: &WorkContext<'_>) {
    self.cells_evaluated.fetch_add(1, Ordering::Relaxed);

    let center = cell.center();
    if cell.should_prune(self.field.distance(center)) {
      self.cells_pruned.fetch_add(1, Ordering::Relaxed);
      return;
    }

    if cell.depth >= self.max_depth {
      self
        .points
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .push(center);
      return;
    }

    ctx.submit(&cell.children().map(WorkItem::new));
  }

  fn take_points(&self) -> Vec<Vec3> {
    std::mem::take(&mut *self.points.lock().unwrap_or_else(PoisonError::into_inner))
  }
}

impl Task for Cell {
  #[inline]
  fn execute(self, ctx: &WorkContext<'_>) {
    if let Some(env) = ctx.environment::<SamplingEnv>() {
      env.visit(self, ctx);
    }
  }
}

// =============================================================================
// Sampler
// =============================================================================

/// Adaptive octree sampler driven by a [`Scheduler`].
#[derive(Clone, Debug, Default)]
pub struct OctreeSampler {
  pub config: SamplerConfig,
}

impl OctreeSampler {
  pub fn new(config: SamplerConfig) -> Self {
    Self { config }
  }

  /// Subdivide `region` against `field` and return the centers of all
  /// terminal cells the surface may pass through.
  ///
  /// Blocks until the recursion has fully drained.
  #[tracing::instrument(skip_all, name = "octree::create_points")]
  pub fn create_points(
    &self,
    scheduler: &mut Scheduler,
    field: Arc<dyn ImplicitSurface>,
    region: &SampleRegion,
  ) -> Result<SampleCloud, SamplerError> {
    region.validate()?;
    let category = self.config.category;

    let env = Arc::new(SamplingEnv {
      field,
      max_depth: region.max_depth,
      points: Mutex::new(Vec::new()),
      cells_evaluated: AtomicU64::new(0),
      cells_pruned: AtomicU64::new(0),
    });

    let seeds: Vec<WorkItem> = region.seed_cells().into_iter().map(WorkItem::new).collect();
    let started = Instant::now();
    scheduler.submit(category, &seeds)?;
    let report = scheduler.start_with_env(category, PhaseBudget::Drain, env.clone())?;
    if !report.is_drained() {
      return Err(SamplerError::Incomplete {
        remaining: report.remaining,
      });
    }

    let points = env.take_points();
    let stats = SamplingStats {
      cells_evaluated: env.cells_evaluated.load(Ordering::Relaxed),
      cells_pruned: env.cells_pruned.load(Ordering::Relaxed),
      points_emitted: points.len() as u64,
      elapsed_us: started.elapsed().as_micros() as u64,
    };

    debug!(
      cells = stats.cells_evaluated,
      pruned = stats.cells_pruned,
      points = stats.points_emitted,
      elapsed_us = stats.elapsed_us,
      "octree sampling complete"
    );

    Ok(SampleCloud {
      points,
      cell_size: region.terminal_cell_size(),
      stats,
    })
  }
}

#[cfg(test)]
#[path = "sampler_test.rs"]
mod sampler_test;
