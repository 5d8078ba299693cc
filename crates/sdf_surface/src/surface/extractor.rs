//! SurfaceExtractor - expand sample points into surface vertices.
//!
//! Each point is treated as the center of a terminal cell. Its cube faces are
//! probed one cell outward; faces whose probe is far from the surface are
//! dropped, and the remaining corners are pulled onto the iso-surface by
//! following the field gradient.

use glam::Vec3;
use rayon::prelude::*;
use tracing::trace;

use super::cube::{face_corners, FACE_NORMALS};
use super::{ExtractionStats, SurfaceMesh, Vertex};
use crate::octree::SQRT_3;
use crate::ImplicitSurface;

/// Extraction settings.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ExtractorConfig {
  /// Projection steps per corner before giving up.
  pub max_iterations: u32,
  /// A corner has converged once `|distance| < tolerance`.
  pub tolerance: f32,
  /// Process points on the rayon pool.
  pub parallel: bool,
}

impl ExtractorConfig {
  pub const DEFAULT: Self = Self {
    max_iterations: 16,
    tolerance: 1e-3,
    parallel: true,
  };

  pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
    self.max_iterations = max_iterations;
    self
  }

  pub fn with_tolerance(mut self, tolerance: f32) -> Self {
    self.tolerance = tolerance;
    self
  }

  pub fn with_parallel(mut self, parallel: bool) -> Self {
    self.parallel = parallel;
    self
  }
}

impl Default for ExtractorConfig {
  fn default() -> Self {
    Self::DEFAULT
  }
}

/// Outcome of projecting one corner onto the surface.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Projection {
  pub position: Vec3,
  pub converged: bool,
  pub iterations: u32,
}

/// Converts sample points into candidate surface vertices.
#[derive(Clone, Debug, Default)]
pub struct SurfaceExtractor {
  pub config: ExtractorConfig,
}

impl SurfaceExtractor {
  pub fn new(config: ExtractorConfig) -> Self {
    Self { config }
  }

  /// Emit up to 24 vertices per point, in point order.
  #[tracing::instrument(skip_all, name = "surface::points_to_cubes")]
  pub fn points_to_cubes<F>(&self, points: &[Vec3], cell_size: f32, field: &F) -> SurfaceMesh
  where
    F: ImplicitSurface + ?Sized,
  {
    let per_point: Vec<(Vec<Vertex>, ExtractionStats)> = if self.config.parallel {
      points
        .par_iter()
        .map(|&point| self.extract_point(point, cell_size, field))
        .collect()
    } else {
      points
        .iter()
        .map(|&point| self.extract_point(point, cell_size, field))
        .collect()
    };

    let mut mesh = SurfaceMesh::default();
    mesh
      .vertices
      .reserve(per_point.iter().map(|(vertices, _)| vertices.len()).sum());
    for (vertices, stats) in per_point {
      mesh.vertices.extend(vertices);
      mesh.stats.merge(&stats);
    }

    if mesh.stats.iteration_capped > 0 {
      trace!(
        capped = mesh.stats.iteration_capped,
        converged = mesh.stats.converged,
        "some corners hit the projection cap"
      );
    }
    mesh
  }

  fn extract_point<F>(&self, point: Vec3, cell_size: f32, field: &F) -> (Vec<Vertex>, ExtractionStats)
  where
    F: ImplicitSurface + ?Sized,
  {
    let reach = cell_size * 0.5 * SQRT_3;
    let mut vertices = Vec::new();
    let mut stats = ExtractionStats::default();

    for (face, normal) in FACE_NORMALS.iter().enumerate() {
      let corners = face_corners(face);
      stats.corners_probed += corners.len() as u64;

      let probe = field.distance(point + *normal * cell_size);
      if probe.abs() > reach {
        stats.corners_discarded += corners.len() as u64;
        continue;
      }

      for corner in corners {
        let start = point + corner.offset * cell_size;
        let projection = self.project(start, field);
        if projection.converged {
          stats.converged += 1;
        } else {
          stats.iteration_capped += 1;
        }
        vertices.push(Vertex {
          position: projection.position.to_array(),
          normal: field.normal(projection.position).to_array(),
          ao: 1.0,
          uv: corner.uv,
        });
      }
    }

    stats.vertices_emitted = vertices.len() as u64;
    (vertices, stats)
  }

  /// Move `start` along the field gradient until it lies within tolerance of
  /// the surface or the iteration cap is reached.
  pub fn project<F>(&self, start: Vec3, field: &F) -> Projection
  where
    F: ImplicitSurface + ?Sized,
  {
    let mut position = start;
    for iteration in 1..=self.config.max_iterations {
      let normal = field.normal(position);
      let distance = field.distance(position);
      position -= normal * distance;
      if distance.abs() < self.config.tolerance {
        return Projection {
          position,
          converged: true,
          iterations: iteration,
        };
      }
    }
    Projection {
      position,
      converged: false,
      iterations: self.config.max_iterations,
    }
  }
}
