//! Planar circle and the three-point fit.

use super::PointF;

/// Determinant threshold below which three points are treated as collinear
/// and no circle is fitted.
const FIT_EPSILON: f64 = 1e-10;

/// A circle on the XY plane.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Circle {
    pub center: PointF,
    pub radius: f64,
}

impl Circle {
    /// Create a circle from a center and radius.
    #[inline]
    pub fn new(center: PointF, radius: f64) -> Self {
        Self { center, radius }
    }

    /// Fit the circle passing through three points, solving the linear
    /// system formed by the perpendicular bisectors of `ab` and `bc`.
    ///
    /// Returns `None` when the points are collinear within tolerance
    /// (the system's determinant vanishes).
    pub fn from_three_points(a: PointF, b: PointF, c: PointF) -> Option<Circle> {
        let d = 2.0 * (a.x * (b.y - c.y) + b.x * (c.y - a.y) + c.x * (a.y - b.y));
        if d.abs() < FIT_EPSILON {
            return None;
        }

        let a2 = a.x * a.x + a.y * a.y;
        let b2 = b.x * b.x + b.y * b.y;
        let c2 = c.x * c.x + c.y * c.y;

        let ux = (a2 * (b.y - c.y) + b2 * (c.y - a.y) + c2 * (a.y - b.y)) / d;
        let uy = (a2 * (c.x - b.x) + b2 * (a.x - c.x) + c2 * (b.x - a.x)) / d;

        let center = PointF::new(ux, uy);
        Some(Circle {
            center,
            radius: center.distance_to(a),
        })
    }

    /// Radial deviation of a point from the circle: the absolute difference
    /// between the point's distance to the center and the radius.
    ///
    /// For a point whose polar angle lies within an arc's span this equals
    /// the shortest distance to that arc.
    #[inline]
    pub fn radial_deviation(&self, p: PointF) -> f64 {
        (self.center.distance_to(p) - self.radius).abs()
    }

    /// Polar angle of a point around the center, in `(-π, π]`.
    #[inline]
    pub fn angle_of(&self, p: PointF) -> f64 {
        (p.y - self.center.y).atan2(p.x - self.center.x)
    }
}
