//! Point types.
//!
//! [`Point`] is the full machine point carried through the pipeline: XYZ in
//! millimetres, the absolute extruder position and the feedrate in effect
//! for the move that produced it. [`PointF`] is the planar projection the
//! circle fit works on.

use std::fmt;

/// A 2D point on the XY plane (mm).
#[derive(Clone, Copy, Default, PartialEq)]
pub struct PointF {
    pub x: f64,
    pub y: f64,
}

impl PointF {
    /// Create a new planar point.
    #[inline]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    #[inline]
    pub fn distance_to(&self, other: PointF) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

impl fmt::Debug for PointF {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.4}, {:.4})", self.x, self.y)
    }
}

/// A machine point: Cartesian position in millimetres, absolute extruder
/// position in millimetres of filament, and feedrate in mm/min.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    /// Absolute extruder position (mm of filament).
    pub e: f64,
    /// Feedrate in effect (mm/min). Zero when no feedrate has been seen.
    pub f: f64,
}

impl Point {
    /// Create a new machine point.
    #[inline]
    pub fn new(x: f64, y: f64, z: f64, e: f64, f: f64) -> Self {
        Self { x, y, z, e, f }
    }

    /// The planar projection onto the XY plane.
    #[inline]
    pub fn xy(&self) -> PointF {
        PointF::new(self.x, self.y)
    }

    /// Distance to another point on the XY plane.
    #[inline]
    pub fn distance_xy(&self, other: &Point) -> f64 {
        self.xy().distance_to(other.xy())
    }

    /// Cartesian distance to another point.
    #[inline]
    pub fn distance_xyz(&self, other: &Point) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2) + (self.z - other.z).powi(2))
            .sqrt()
    }
}
