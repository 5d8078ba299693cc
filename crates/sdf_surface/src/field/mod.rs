//! Implicit fields: shapes folded left to right through blend operators.
//!
//! ```text
//!   acc = FAR_DISTANCE
//!   for (shape, mode) in field:
//!     acc = blend(acc, shape.distance(p), mode, shape.smoothness)
//! ```
//!
//! Order matters: subtracting before any shape was added leaves the field
//! empty, and a filter shape reads everything accumulated before it.

pub mod blend;
pub mod shape;

use std::sync::Arc;

use glam::Vec3;

pub use blend::{blend, smooth_min, BlendMode};
pub use shape::{ShapeDef, ShapeKind};

/// Distance of an empty field.
pub const FAR_DISTANCE: f32 = f32::MAX;

/// Central-difference step for [`ImplicitSurface::normal`], in world units.
pub const NORMAL_EPSILON: f32 = 1e-3;

/// Result of evaluating a field at one point.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FieldHit {
  /// Index of the shape that determined the distance, `None` for an empty
  /// field.
  pub shape: Option<usize>,
  pub distance: f32,
}

impl FieldHit {
  pub const EMPTY: Self = Self {
    shape: None,
    distance: FAR_DISTANCE,
  };
}

/// Anything that can be sampled as a signed distance field.
///
/// Evaluation must be pure: the same point always yields the same result, and
/// implementors are shared read-only across worker threads.
pub trait ImplicitSurface: Send + Sync {
  fn map(&self, point: Vec3) -> FieldHit;

  #[inline]
  fn distance(&self, point: Vec3) -> f32 {
    self.map(point).distance
  }

  /// Normalized central-difference gradient. Zero where the gradient
  /// vanishes.
  fn normal(&self, point: Vec3) -> Vec3 {
    let dx = Vec3::X * NORMAL_EPSILON;
    let dy = Vec3::Y * NORMAL_EPSILON;
    let dz = Vec3::Z * NORMAL_EPSILON;
    Vec3::new(
      self.distance(point + dx) - self.distance(point - dx),
      self.distance(point + dy) - self.distance(point - dy),
      self.distance(point + dz) - self.distance(point - dz),
    )
    .normalize_or_zero()
  }
}

impl ImplicitSurface for ShapeDef {
  #[inline]
  fn map(&self, point: Vec3) -> FieldHit {
    FieldHit {
      shape: Some(0),
      distance: ShapeDef::distance(self, point),
    }
  }
}

impl<T: ImplicitSurface + ?Sized> ImplicitSurface for Box<T> {
  #[inline]
  fn map(&self, point: Vec3) -> FieldHit {
    (**self).map(point)
  }

  fn normal(&self, point: Vec3) -> Vec3 {
    (**self).normal(point)
  }
}

impl<T: ImplicitSurface + ?Sized> ImplicitSurface for Arc<T> {
  #[inline]
  fn map(&self, point: Vec3) -> FieldHit {
    (**self).map(point)
  }

  fn normal(&self, point: Vec3) -> Vec3 {
    (**self).normal(point)
  }
}

/// One shape and the operator that blends it in.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FieldEntry {
  pub shape: ShapeDef,
  pub mode: BlendMode,
}

/// Ordered shape list evaluated as one signed distance field.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Field {
  entries: Vec<FieldEntry>,
}

impl Field {
  pub fn new() -> Self {
    Self::default()
  }

  /// Append a shape (builder style).
  pub fn with(mut self, shape: ShapeDef, mode: BlendMode) -> Self {
    self.push(shape, mode);
    self
  }

  pub fn push(&mut self, shape: ShapeDef, mode: BlendMode) {
    self.entries.push(FieldEntry { shape, mode });
  }

  pub fn entries(&self) -> &[FieldEntry] {
    &self.entries
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }
}

impl FromIterator<FieldEntry> for Field {
  fn from_iter<I: IntoIterator<Item = FieldEntry>>(iter: I) -> Self {
    Self {
      entries: iter.into_iter().collect(),
    }
  }
}

impl ImplicitSurface for Field {
  fn map(&self, point: Vec3) -> FieldHit {
    let mut hit = FieldHit::EMPTY;
    for (index, entry) in self.entries.iter().enumerate() {
      let next = entry.shape.distance(point);
      if entry.mode.takes_over(hit.distance, next) {
        hit.shape = Some(index);
      }
      hit.distance = blend(hit.distance, next, entry.mode, entry.shape.smoothness);
    }
    hit
  }
}
