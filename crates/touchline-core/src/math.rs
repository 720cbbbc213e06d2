use serde::{Deserialize, Serialize};

/// Linear interpolation between `a` and `b`.
pub fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

/// Normalized position of `query` inside `[start, end]`, clamped to [0, 1].
///
/// A zero-length segment yields 0.0.
pub fn segment_t(start: f64, end: f64, query: f64) -> f64 {
    let span = end - start;
    if span <= 0.0 {
        return 0.0;
    }
    ((query - start) / span).clamp(0.0, 1.0)
}

/// A sampled value at a frame position, used as a spline control point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ControlPoint {
    pub frame: f64,
    pub value: f64,
}

impl ControlPoint {
    pub fn new(frame: f64, value: f64) -> Self {
        Self { frame, value }
    }
}

/// Cubic Hermite basis: value at `t` given endpoint values and tangents
/// (tangents expressed per unit of `t`).
pub fn hermite(v0: f64, v1: f64, m0: f64, m1: f64, t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    let t2 = t * t;
    let t3 = t2 * t;
    (2.0 * t3 - 3.0 * t2 + 1.0) * v0
        + (t3 - 2.0 * t2 + t) * m0
        + (-2.0 * t3 + 3.0 * t2) * v1
        + (t3 - t2) * m1
}

/// Catmull-Rom segment between `p1` and `p2`.
///
/// Tangents are finite differences over the neighbouring control points,
/// scaled to the `p1..p2` span so unevenly spaced keyframes do not
/// overshoot. With evenly spaced points this is the classic uniform
/// Catmull-Rom spline.
pub fn catmull_rom(
    p0: ControlPoint,
    p1: ControlPoint,
    p2: ControlPoint,
    p3: ControlPoint,
    t: f64,
) -> f64 {
    let span = p2.frame - p1.frame;
    let tangent = |a: ControlPoint, b: ControlPoint| {
        let width = b.frame - a.frame;
        if width <= 0.0 {
            0.0
        } else {
            (b.value - a.value) / width * span
        }
    };
    hermite(p1.value, p2.value, tangent(p0, p2), tangent(p1, p3), t)
}
