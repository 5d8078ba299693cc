//! Pipeline - sample then extract in one call.
//!
//! ```ignore
//! let output = generate_surface(&mut scheduler, &sampler, &extractor, field, &region)?;
//! upload(output.mesh.as_bytes());
//! ```

use std::sync::Arc;

use tracing::debug;
use web_time::Instant;

use crate::octree::{OctreeSampler, SampleRegion, SamplingStats};
use crate::surface::{SurfaceExtractor, SurfaceMesh};
use crate::{ImplicitSurface, SamplerError};

/// Wall time per pipeline stage.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PipelineTimings {
  pub sample_us: u64,
  pub extract_us: u64,
}

impl PipelineTimings {
  #[inline]
  pub fn total_us(&self) -> u64 {
    self.sample_us + self.extract_us
  }
}

/// Everything produced by one [`generate_surface`] call.
#[derive(Clone, Debug, Default)]
pub struct SurfaceOutput {
  pub mesh: SurfaceMesh,
  pub sampling: SamplingStats,
  /// Number of sample points fed to the extractor.
  pub point_count: usize,
  pub timings: PipelineTimings,
}

/// Sample `region` on the scheduler, then extract vertices on rayon.
#[tracing::instrument(skip_all, name = "pipeline::generate_surface")]
pub fn generate_surface(
  scheduler: &mut task_pool::Scheduler,
  sampler: &OctreeSampler,
  extractor: &SurfaceExtractor,
  field: Arc<dyn ImplicitSurface>,
  region: &SampleRegion,
) -> Result<SurfaceOutput, SamplerError> {
  let t0 = Instant::now();
  let cloud = sampler.create_points(scheduler, Arc::clone(&field), region)?;
  let t1 = Instant::now();
  let mesh = extractor.points_to_cubes(&cloud.points, cloud.cell_size, field.as_ref());
  let t2 = Instant::now();

  let timings = PipelineTimings {
    sample_us: t1.duration_since(t0).as_micros() as u64,
    extract_us: t2.duration_since(t1).as_micros() as u64,
  };

  debug!(
    points = cloud.points.len(),
    vertices = mesh.len(),
    sample_us = timings.sample_us,
    extract_us = timings.extract_us,
    "surface generated"
  );

  Ok(SurfaceOutput {
    mesh,
    sampling: cloud.stats,
    point_count: cloud.points.len(),
    timings,
  })
}
