//! Unit cube corner table: 6 faces × 4 corners.
//!
//! Face order: +X, -X, +Y, -Y, +Z, -Z. Corners of each face wind
//! counter-clockwise seen from outside, with uv (0,0) (1,0) (1,1) (0,1).

use glam::Vec3;

/// Number of faces on a cube.
pub const FACE_COUNT: usize = 6;

/// Corners per face.
pub const CORNERS_PER_FACE: usize = 4;

/// Outward normal per face, in table order.
pub const FACE_NORMALS: [Vec3; FACE_COUNT] = [
  Vec3::X,
  Vec3::NEG_X,
  Vec3::Y,
  Vec3::NEG_Y,
  Vec3::Z,
  Vec3::NEG_Z,
];

/// One corner of one face.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CubeCorner {
  /// Offset from the cube center in units of the edge length, each axis ±0.5.
  pub offset: Vec3,
  pub uv: [f32; 2],
}

const fn corner(x: f32, y: f32, z: f32, u: f32, v: f32) -> CubeCorner {
  CubeCorner {
    offset: Vec3::new(x, y, z),
    uv: [u, v],
  }
}

const H: f32 = 0.5;

/// Corners grouped by face: `CUBE_CORNERS[face * 4 + i]`.
#[rustfmt::skip]
pub const CUBE_CORNERS: [CubeCorner; FACE_COUNT * CORNERS_PER_FACE] = [
  // +X
  corner( H, -H,  H, 0.0, 0.0), corner( H, -H, -H, 1.0, 0.0),
  corner( H,  H, -H, 1.0, 1.0), corner( H,  H,  H, 0.0, 1.0),
  // -X
  corner(-H, -H, -H, 0.0, 0.0), corner(-H, -H,  H, 1.0, 0.0),
  corner(-H,  H,  H, 1.0, 1.0), corner(-H,  H, -H, 0.0, 1.0),
  // +Y
  corner(-H,  H,  H, 0.0, 0.0), corner( H,  H,  H, 1.0, 0.0),
  corner( H,  H, -H, 1.0, 1.0), corner(-H,  H, -H, 0.0, 1.0),
  // -Y
  corner(-H, -H, -H, 0.0, 0.0), corner( H, -H, -H, 1.0, 0.0),
  corner( H, -H,  H, 1.0, 1.0), corner(-H, -H,  H, 0.0, 1.0),
  // +Z
  corner(-H, -H,  H, 0.0, 0.0), corner( H, -H,  H, 1.0, 0.0),
  corner( H,  H,  H, 1.0, 1.0), corner(-H,  H,  H, 0.0, 1.0),
  // -Z
  corner( H, -H, -H, 0.0, 0.0), corner(-H, -H, -H, 1.0, 0.0),
  corner(-H,  H, -H, 1.0, 1.0), corner( H,  H, -H, 0.0, 1.0),
];

/// The four corners of `face`.
#[inline]
pub fn face_corners(face: usize) -> &'static [CubeCorner] {
  let start = face * CORNERS_PER_FACE;
  &CUBE_CORNERS[start..start + CORNERS_PER_FACE]
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_corners_lie_on_their_face() {
    for (face, normal) in FACE_NORMALS.iter().enumerate() {
      for corner in face_corners(face) {
        assert_eq!(corner.offset.dot(*normal), 0.5);
        assert_eq!(corner.offset.abs(), Vec3::splat(0.5));
      }
    }
  }

  #[test]
  fn test_face_corners_distinct() {
    for face in 0..FACE_COUNT {
      let corners = face_corners(face);
      for i in 0..CORNERS_PER_FACE {
        for j in (i + 1)..CORNERS_PER_FACE {
          assert_ne!(corners[i].offset, corners[j].offset);
        }
      }
    }
  }

  /// (c1 - c0) × (c2 - c0) points along the face normal.
  #[test]
  fn test_winding_is_counter_clockwise_from_outside() {
    for (face, normal) in FACE_NORMALS.iter().enumerate() {
      let c = face_corners(face);
      let cross = (c[1].offset - c[0].offset).cross(c[2].offset - c[0].offset);
      assert!(cross.dot(*normal) > 0.0, "face {face}");
    }
  }
}
