//! Shape primitives and their signed distance functions.
//!
//! All distances are negative inside, positive outside. Sphere, box and plane
//! are exact metrics; the ridge-noise height field is an approximation and
//! can over- or under-estimate the true distance.

use fastnoise_lite::{FastNoiseLite, FractalType, NoiseType};
use glam::Vec3;

const RIDGE_LACUNARITY: f32 = 2.0;
const RIDGE_GAIN: f32 = 0.5;

/// Primitive geometry of a [`ShapeDef`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ShapeKind {
  Sphere {
    radius: f32,
  },
  /// Axis-aligned box.
  Cuboid {
    half_extents: Vec3,
  },
  /// Infinite plane through the shape center. Positive on the normal side.
  Plane {
    normal: Vec3,
  },
  /// Ridged fractal terrain: a height field over the XZ plane.
  RidgeNoise {
    amplitude: f32,
    frequency: f32,
    octaves: u32,
    seed: u32,
  },
}

/// A positioned shape plus the smoothing radius used when it is blended in.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ShapeDef {
  pub kind: ShapeKind,
  pub center: Vec3,
  /// Smoothing radius `k` for smooth blend modes (0 = hard).
  pub smoothness: f32,
}

impl ShapeDef {
  pub fn new(kind: ShapeKind) -> Self {
    Self {
      kind,
      center: Vec3::ZERO,
      smoothness: 0.0,
    }
  }

  pub fn sphere(radius: f32) -> Self {
    Self::new(ShapeKind::Sphere { radius })
  }

  pub fn cuboid(half_extents: Vec3) -> Self {
    Self::new(ShapeKind::Cuboid { half_extents })
  }

  /// Plane with the given normal. A zero normal falls back to +Y.
  pub fn plane(normal: Vec3) -> Self {
    Self::new(ShapeKind::Plane {
      normal: normal.try_normalize().unwrap_or(Vec3::Y),
    })
  }

  pub fn ridge_noise(amplitude: f32, frequency: f32, octaves: u32, seed: u32) -> Self {
    Self::new(ShapeKind::RidgeNoise {
      amplitude,
      frequency,
      octaves,
      seed,
    })
  }

  pub fn with_center(mut self, center: Vec3) -> Self {
    self.center = center;
    self
  }

  pub fn with_smoothness(mut self, smoothness: f32) -> Self {
    self.smoothness = smoothness;
    self
  }

  /// Signed distance from `point` to this shape.
  #[inline]
  pub fn distance(&self, point: Vec3) -> f32 {
    let local = point - self.center;
    match self.kind {
      ShapeKind::Sphere { radius } => local.length() - radius,
      ShapeKind::Cuboid { half_extents } => {
        let q = local.abs() - half_extents;
        q.max(Vec3::ZERO).length() + q.max_element().min(0.0)
      }
      ShapeKind::Plane { normal } => local.dot(normal),
      ShapeKind::RidgeNoise {
        amplitude,
        frequency,
        octaves,
        seed,
      } => local.y - amplitude * ridged_height(local, frequency, octaves, seed),
    }
  }
}

/// Ridged Perlin fractal at `local`, remapped to `[0, 1]`. Zero octaves is flat.
fn ridged_height(local: Vec3, frequency: f32, octaves: u32, seed: u32) -> f32 {
  if octaves == 0 {
    return 0.0;
  }
  let mut noise = FastNoiseLite::with_seed(seed as i32);
  noise.set_noise_type(Some(NoiseType::Perlin));
  noise.set_fractal_type(Some(FractalType::Ridged));
  noise.set_fractal_octaves(Some(octaves.min(i32::MAX as u32) as i32));
  noise.set_fractal_lacunarity(Some(RIDGE_LACUNARITY));
  noise.set_fractal_gain(Some(RIDGE_GAIN));
  noise.set_frequency(Some(frequency));

  let n = noise.get_noise_3d(local.x, local.y, local.z);
  ((n + 1.0) * 0.5).clamp(0.0, 1.0)
}
