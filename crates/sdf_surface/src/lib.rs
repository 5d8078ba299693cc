//! sdf_surface - adaptive sampling of blended signed-distance fields
//!
//! Turns an ordered list of implicit shapes into surface-adjacent vertices:
//!
//! ```text
//!   Field (shapes + blend modes)
//!     │
//!     ├─► OctreeSampler::create_points   (task_pool phase, recursive cells)
//!     │       └─► SampleCloud { points at terminal resolution }
//!     │
//!     └─► SurfaceExtractor::points_to_cubes   (rayon, per-point)
//!             └─► SurfaceMesh { Vec<Vertex> }  ──► mesh upload (external)
//! ```
//!
//! Vertices are candidates, not an indexed mesh: every surviving cube corner of
//! every sample point becomes one vertex.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use glam::Vec3;
//! use sdf_surface::prelude::*;
//! use task_pool::{Scheduler, SchedulerConfig};
//!
//! let field = Field::new()
//!   .with(ShapeDef::sphere(1.0), BlendMode::Add)
//!   .with(ShapeDef::cuboid(Vec3::splat(0.5)).with_smoothness(0.1), BlendMode::SmoothSubtract);
//!
//! let mut scheduler = Scheduler::new(SchedulerConfig::from_available_parallelism())?;
//! let region = SampleRegion::new(Vec3::ZERO, 2.0, 4);
//! let output = generate_surface(
//!   &mut scheduler,
//!   &OctreeSampler::default(),
//!   &SurfaceExtractor::default(),
//!   Arc::new(field),
//!   &region,
//! )?;
//! upload(output.mesh.as_bytes());
//! ```

pub mod error;
pub mod field;
pub mod octree;
pub mod pipeline;
pub mod surface;

pub use error::SamplerError;
pub use field::{
  BlendMode, Field, FieldEntry, FieldHit, ImplicitSurface, ShapeDef, ShapeKind, FAR_DISTANCE,
};
pub use octree::{
  Cell, OctreeSampler, SampleCloud, SampleRegion, SamplerConfig, SamplingStats, MAX_DEPTH_LIMIT,
};
pub use pipeline::{generate_surface, PipelineTimings, SurfaceOutput};
pub use surface::{ExtractionStats, ExtractorConfig, SurfaceExtractor, SurfaceMesh, Vertex};

/// Common imports for field authors and pipeline callers.
pub mod prelude {
  pub use crate::field::{BlendMode, Field, ImplicitSurface, ShapeDef};
  pub use crate::octree::{OctreeSampler, SampleRegion, SamplerConfig};
  pub use crate::pipeline::generate_surface;
  pub use crate::surface::{ExtractorConfig, SurfaceExtractor, Vertex};
}
