//! SampleRegion - cubical region of interest and its seed grid.

use glam::Vec3;

use super::Cell;
use crate::SamplerError;

/// Deepest subdivision accepted by [`SampleRegion::validate`].
///
/// Depth 12 already means 2^36 potential cells per seed.
pub const MAX_DEPTH_LIMIT: u32 = 12;

/// Seed cells per axis at depth 0.
pub const SEED_GRID: usize = 5;

/// Cube `center ± radius` sampled down to `max_depth`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SampleRegion {
  pub center: Vec3,
  /// Half the edge length of the region.
  pub radius: f32,
  /// Depth at which surviving cells become sample points.
  pub max_depth: u32,
}

impl SampleRegion {
  pub fn new(center: Vec3, radius: f32, max_depth: u32) -> Self {
    Self {
      center,
      radius,
      max_depth,
    }
  }

  pub fn validate(&self) -> Result<(), SamplerError> {
    if !self.center.is_finite() {
      return Err(SamplerError::InvalidRegion("center must be finite"));
    }
    if !self.radius.is_finite() || self.radius <= 0.0 {
      return Err(SamplerError::InvalidRegion("radius must be finite and positive"));
    }
    if self.max_depth > MAX_DEPTH_LIMIT {
      return Err(SamplerError::InvalidRegion("max_depth exceeds MAX_DEPTH_LIMIT"));
    }
    Ok(())
  }

  /// Half size of a depth-0 seed cell.
  #[inline]
  pub fn seed_half_size(&self) -> f32 {
    self.radius / SEED_GRID as f32
  }

  /// Edge length of a cell at `max_depth`.
  ///
  /// cell_size = radius / 5 / 2^(max_depth - 1)
  #[inline]
  pub fn terminal_cell_size(&self) -> f32 {
    self.seed_half_size() / 2.0_f32.powi(self.max_depth as i32 - 1)
  }

  /// The 5×5×5 depth-0 cells tiling the region, X fastest.
  pub fn seed_cells(&self) -> Vec<Cell> {
    let half_size = self.seed_half_size();
    let mid = (SEED_GRID / 2) as f32;
    let step = |i: usize| (i as f32 - mid) * 2.0 * half_size;

    let mut cells = Vec::with_capacity(SEED_GRID * SEED_GRID * SEED_GRID);
    for z in 0..SEED_GRID {
      for y in 0..SEED_GRID {
        for x in 0..SEED_GRID {
          let offset = Vec3::new(step(x), step(y), step(z));
          cells.push(Cell::new(self.center + offset, half_size, 0));
        }
      }
    }
    cells
  }
}
