//! Directed circular arcs.

use std::f64::consts::TAU;
use std::fmt;

use super::{Circle, Point, PointF};

/// Direction of an arc around its center.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArcDirection {
    /// Clockwise (`G2`).
    Clockwise,
    /// Counter-clockwise (`G3`).
    CounterClockwise,
}

impl ArcDirection {
    /// The G-code word for this direction.
    pub fn gcode_word(&self) -> &'static str {
        match self {
            ArcDirection::Clockwise => "G2",
            ArcDirection::CounterClockwise => "G3",
        }
    }

    /// Direction implied by twice the signed area of a point triple:
    /// positive winds counter-clockwise, negative clockwise.
    pub fn from_signed_area(area2: f64) -> ArcDirection {
        if area2 > 0.0 {
            ArcDirection::CounterClockwise
        } else {
            ArcDirection::Clockwise
        }
    }
}

impl fmt::Display for ArcDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.gcode_word())
    }
}

/// Angle swept from `from` to `to` around `center`, measured in the given
/// direction and normalised into `[0, 2π)`.
///
/// A result of `0` means the two points sit at the same polar angle.
pub fn sweep_between(center: PointF, from: PointF, to: PointF, direction: ArcDirection) -> f64 {
    let angle_from = (from.y - center.y).atan2(from.x - center.x);
    let angle_to = (to.y - center.y).atan2(to.x - center.x);

    let diff = match direction {
        ArcDirection::CounterClockwise => angle_to - angle_from,
        ArcDirection::Clockwise => angle_from - angle_to,
    };

    diff.rem_euclid(TAU)
}

/// A circular arc on the XY plane, between two machine points.
///
/// The plane is always XY: candidates never span a Z change, so the start
/// and end share their Z coordinate.
#[derive(Clone, Debug)]
pub struct Arc {
    /// The fitted circle.
    pub circle: Circle,
    /// Start point (current machine position when the arc begins).
    pub start: Point,
    /// End point.
    pub end: Point,
    /// Traversal direction.
    pub direction: ArcDirection,
    /// Swept angle from start to end in the traversal direction, in
    /// `(0, 2π)`.
    pub sweep_radians: f64,
    /// Total extruder advance over the arc (mm of filament).
    pub e_relative: f64,
    /// Feedrate shared by the absorbed segments (mm/min), zero if none was
    /// ever set.
    pub feedrate: f64,
    /// Number of buffered points the arc spans, start included.
    pub point_count: usize,
}

impl Arc {
    /// Arc radius (mm).
    #[inline]
    pub fn radius(&self) -> f64 {
        self.circle.radius
    }

    /// Arc length (mm): radius times the swept angle.
    #[inline]
    pub fn length(&self) -> f64 {
        self.circle.radius * self.sweep_radians
    }

    /// `I` word: X offset from the start point to the center.
    #[inline]
    pub fn i(&self) -> f64 {
        self.circle.center.x - self.start.x
    }

    /// `J` word: Y offset from the start point to the center.
    #[inline]
    pub fn j(&self) -> f64 {
        self.circle.center.y - self.start.y
    }

    /// Render the arc as a `G2`/`G3` line with the center-offset form.
    ///
    /// `e` and `f` are included verbatim when given; the caller decides
    /// between absolute and relative `E` and whether `F` is redundant.
    pub fn to_gcode(&self, e: Option<f64>, f: Option<f64>) -> String {
        let mut cmd = format!(
            "{} X{:.3} Y{:.3} I{:.3} J{:.3}",
            self.direction.gcode_word(),
            self.end.x,
            self.end.y,
            self.i(),
            self.j()
        );

        if let Some(e_val) = e {
            cmd.push_str(&format!(" E{:.5}", e_val));
        }

        if let Some(f_val) = f {
            cmd.push_str(&format!(" F{:.0}", f_val));
        }

        cmd
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn arc_for_test(direction: ArcDirection) -> Arc {
        Arc {
            circle: Circle::new(PointF::new(0.0, 0.0), 10.0),
            start: Point::new(10.0, 0.0, 0.2, 0.0, 1800.0),
            end: Point::new(0.0, 10.0, 0.2, 1.5, 1800.0),
            direction,
            sweep_radians: PI / 2.0,
            e_relative: 1.5,
            feedrate: 1800.0,
            point_count: 10,
        }
    }

    #[test]
    fn test_sweep_ccw_quarter() {
        let center = PointF::new(0.0, 0.0);
        let sweep = sweep_between(
            center,
            PointF::new(10.0, 0.0),
            PointF::new(0.0, 10.0),
            ArcDirection::CounterClockwise,
        );
        assert!((sweep - PI / 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_sweep_cw_quarter() {
        let center = PointF::new(0.0, 0.0);
        let sweep = sweep_between(
            center,
            PointF::new(10.0, 0.0),
            PointF::new(0.0, -10.0),
            ArcDirection::Clockwise,
        );
        assert!((sweep - PI / 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_sweep_wraps_against_direction() {
        // Going CCW from (10, 0) to (0, -10) is three quarters of a turn.
        let center = PointF::new(0.0, 0.0);
        let sweep = sweep_between(
            center,
            PointF::new(10.0, 0.0),
            PointF::new(0.0, -10.0),
            ArcDirection::CounterClockwise,
        );
        assert!((sweep - 1.5 * PI).abs() < 1e-12);
    }

    #[test]
    fn test_sweep_same_angle_is_zero() {
        let center = PointF::new(0.0, 0.0);
        let sweep = sweep_between(
            center,
            PointF::new(10.0, 0.0),
            PointF::new(20.0, 0.0),
            ArcDirection::CounterClockwise,
        );
        assert!(sweep.abs() < 1e-12);
    }

    #[test]
    fn test_center_offsets() {
        // Start at (+x, 0), center at origin: I negative, J zero.
        let arc = arc_for_test(ArcDirection::CounterClockwise);
        assert!((arc.i() - (-10.0)).abs() < 1e-12);
        assert!(arc.j().abs() < 1e-12);
    }

    #[test]
    fn test_length() {
        let arc = arc_for_test(ArcDirection::CounterClockwise);
        assert!((arc.length() - 10.0 * PI / 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_to_gcode() {
        let arc = arc_for_test(ArcDirection::CounterClockwise);
        let line = arc.to_gcode(Some(1.5), Some(1800.0));
        assert_eq!(line, "G3 X0.000 Y10.000 I-10.000 J0.000 E1.50000 F1800");
    }

    #[test]
    fn test_to_gcode_travel() {
        let arc = arc_for_test(ArcDirection::Clockwise);
        let line = arc.to_gcode(None, None);
        assert_eq!(line, "G2 X0.000 Y10.000 I-10.000 J0.000");
    }
}
