//! Cell - value type for one cube of the adaptive subdivision.
//!
//! Cells are never stored in a tree. Each one lives only as the payload of a
//! work item: it is evaluated, then either dropped, emitted as a sample point
//! or replaced by its eight children.

use bytemuck::{Pod, Zeroable};
use glam::Vec3;

/// √3: ratio of a cube's circumradius to its half size.
pub(crate) const SQRT_3: f32 = 1.732_050_8;

/// Axis-aligned cube at a given subdivision depth.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct Cell {
  /// World-space center.
  pub center: [f32; 3],
  /// Half the cube's edge length.
  pub half_size: f32,
  /// Subdivision depth (0 = seed grid).
  pub depth: u32,
}

impl Cell {
  pub fn new(center: Vec3, half_size: f32, depth: u32) -> Self {
    Self {
      center: center.to_array(),
      half_size,
      depth,
    }
  }

  #[inline]
  pub fn center(&self) -> Vec3 {
    Vec3::from_array(self.center)
  }

  /// Edge length.
  #[inline]
  pub fn size(&self) -> f32 {
    self.half_size * 2.0
  }

  /// Distance from the center to a corner.
  #[inline]
  pub fn circumradius(&self) -> f32 {
    self.half_size * SQRT_3
  }

  /// True if a field distance of `distance` at the center proves the surface
  /// cannot pass through this cell.
  #[inline]
  pub fn should_prune(&self, distance: f32) -> bool {
    distance.abs() > self.circumradius()
  }

  /// Child cell in the given octant (0-7).
  ///
  /// Octant bits select the positive half per axis:
  /// - bit 0: +X
  /// - bit 1: +Y
  /// - bit 2: +Z
  #[inline]
  pub fn child(&self, octant: u8) -> Self {
    let quarter = self.half_size * 0.5;
    let sign = |bit: u8| if octant & bit != 0 { quarter } else { -quarter };
    let offset = Vec3::new(sign(1), sign(2), sign(4));
    Self::new(self.center() + offset, quarter, self.depth + 1)
  }

  /// All eight children, in octant order.
  pub fn children(&self) -> [Self; 8] {
    std::array::from_fn(|octant| self.child(octant as u8))
  }
}

#[cfg(test)]
#[path = "cell_test.rs"]
mod cell_test;
