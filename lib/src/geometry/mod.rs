//! Geometry primitives for the welder.
//!
//! This module provides the fundamental geometric types used by the
//! arc-fitting pipeline:
//! - [`Point`] - a machine point: Cartesian XYZ plus the extruder axis and feedrate
//! - [`PointF`] - a 2D point on the XY plane, used by the circle fit
//! - [`Circle`] - a planar circle with the three-point fit
//! - [`Arc`] - a directed circular arc between two machine points
//!
//! All geometry is carried in `f64`; coordinates are millimetres.

mod arc;
mod circle;
mod point;

pub use arc::{sweep_between, Arc, ArcDirection};
pub use circle::Circle;
pub use point::{Point, PointF};

/// Twice the signed area of the triangle `(a, b, c)`.
///
/// Positive when the triangle winds counter-clockwise, negative when it
/// winds clockwise, zero when the points are collinear.
#[inline]
pub fn signed_area2(a: PointF, b: PointF, c: PointF) -> f64 {
    (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)
}
