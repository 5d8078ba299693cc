//! Surface extraction: sample points → projected cube-corner vertices.

pub mod cube;
mod extractor;

pub use extractor::{ExtractorConfig, Projection, SurfaceExtractor};

use bytemuck::{Pod, Zeroable};

/// Output vertex, laid out for direct upload.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct Vertex {
  /// World-space position after projection.
  pub position: [f32; 3],

  /// Field normal at `position`. Zero where the gradient vanishes.
  pub normal: [f32; 3],

  /// Ambient occlusion placeholder, always 1.0.
  pub ao: f32,

  /// Texture coordinate of the originating cube corner.
  pub uv: [f32; 2],
}

/// Statistics from one extraction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ExtractionStats {
  /// Corners considered (24 per point).
  pub corners_probed: u64,
  /// Corners dropped with their face because the probe was far from the
  /// surface.
  pub corners_discarded: u64,
  pub vertices_emitted: u64,
  /// Corners that reached the tolerance.
  pub converged: u64,
  /// Corners emitted at their last position after `max_iterations`.
  pub iteration_capped: u64,
}

impl ExtractionStats {
  pub fn merge(&mut self, other: &Self) {
    self.corners_probed += other.corners_probed;
    self.corners_discarded += other.corners_discarded;
    self.vertices_emitted += other.vertices_emitted;
    self.converged += other.converged;
    self.iteration_capped += other.iteration_capped;
  }
}

/// Non-indexed vertex buffer plus extraction statistics.
#[derive(Clone, Debug, Default)]
pub struct SurfaceMesh {
  pub vertices: Vec<Vertex>,
  pub stats: ExtractionStats,
}

impl SurfaceMesh {
  pub fn len(&self) -> usize {
    self.vertices.len()
  }

  pub fn is_empty(&self) -> bool {
    self.vertices.is_empty()
  }

  /// Raw vertex bytes for a GPU upload.
  pub fn as_bytes(&self) -> &[u8] {
    bytemuck::cast_slice(&self.vertices)
  }
}
