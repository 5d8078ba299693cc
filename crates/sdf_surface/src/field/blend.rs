//! Blend operators folding one shape's distance into the accumulated field.

/// How a shape combines with everything before it in a [`Field`](super::Field).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum BlendMode {
  /// Hard union: `min(acc, next)`.
  #[default]
  Add,
  /// Hard subtraction of `next` from the accumulated field.
  Subtract,
  /// Polynomial smooth union with the incoming shape's smoothness.
  SmoothAdd,
  /// Smooth subtraction with the incoming shape's smoothness.
  SmoothSubtract,
  /// `next + |acc|`: offsets the incoming shape by the accumulated
  /// field's magnitude. Stylized, not a distance metric.
  Filter,
}

impl BlendMode {
  /// Whether `next` determines the blended result, i.e. whether the incoming
  /// shape becomes the nearest shape.
  #[inline]
  pub fn takes_over(self, acc: f32, next: f32) -> bool {
    match self {
      BlendMode::Add | BlendMode::SmoothAdd => next < acc,
      BlendMode::Subtract | BlendMode::SmoothSubtract => -next > acc,
      BlendMode::Filter => true,
    }
  }
}

/// Polynomial smooth minimum with radius `k`.
///
/// Stays within `[min(a, b) - k/4, min(a, b)]`; `k <= 0` is exactly `min`.
#[inline]
pub fn smooth_min(a: f32, b: f32, k: f32) -> f32 {
  if k <= 0.0 {
    return a.min(b);
  }
  let h = (k - (a - b).abs()).max(0.0) / k;
  a.min(b) - h * h * k * 0.25
}

/// Combine the accumulated distance with the next shape's distance.
#[inline]
pub fn blend(acc: f32, next: f32, mode: BlendMode, k: f32) -> f32 {
  match mode {
    BlendMode::Add => acc.min(next),
    BlendMode::Subtract => acc.max(-next),
    BlendMode::SmoothAdd => smooth_min(acc, next, k),
    BlendMode::SmoothSubtract => -smooth_min(-acc, next, k),
    BlendMode::Filter => next + acc.abs(),
  }
}
