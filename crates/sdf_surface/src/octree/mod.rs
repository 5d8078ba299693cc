//! Adaptive octree sampling.
//!
//! A 5×5×5 grid of seed cells covers the region. Each cell whose center lies
//! farther from the surface than its circumradius is pruned; survivors split
//! into octants until `max_depth`, where they become sample points.
//!
//! ```text
//!   depth 0: 125 seeds (half_size = radius / 5)
//!   depth d: half_size = radius / 5 / 2^d
//!   prune  : |distance(center)| > half_size * √3
//! ```

mod cell;
mod region;
mod sampler;

pub use cell::Cell;
pub(crate) use cell::SQRT_3;
pub use region::{SampleRegion, MAX_DEPTH_LIMIT, SEED_GRID};
pub use sampler::{OctreeSampler, SampleCloud, SamplerConfig, SamplingStats};
