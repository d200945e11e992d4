//! The online arc candidate.

use std::f64::consts::TAU;
use std::fmt;

use crate::config::WelderConfig;
use crate::geometry::{signed_area2, sweep_between, Arc, ArcDirection, Circle, Point, PointF};

/// Z difference beyond which a point leaves the candidate's plane.
const Z_TOLERANCE: f64 = 1e-6;

/// Feedrate difference treated as a change (mm/min).
const FEEDRATE_TOLERANCE: f64 = 1e-6;

/// Chord length below which a segment is degenerate (mm).
const MIN_CHORD_LENGTH: f64 = 1e-6;

/// Slack for the monotonic-traversal comparison (radians).
const ANGLE_TOLERANCE: f64 = 1e-9;

/// Candidates are rejected once the swept angle reaches this bound,
/// keeping well clear of the ambiguous full-circle case where the start
/// and end points coincide.
const MAX_SWEEP_RADIANS: f64 = TAU * 0.99;

/// Outcome of [`SegmentedArc::try_add_point`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AddOutcome {
    /// The point extends the candidate.
    Accepted,
    /// The point cannot join the candidate, which is left unchanged.
    Rejected(RejectReason),
}

/// Why a point was rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RejectReason {
    /// The segment to the new point has (near) zero length on the XY plane.
    ZeroLengthSegment,
    /// The point's Z differs from the candidate's plane.
    PlaneChange,
    /// The segment extrudes while the run does not, or vice versa, or it
    /// retracts.
    ExtrusionMismatch,
    /// The segment's extrusion-per-length rate strays from the run's mean.
    ExtrusionRateChange,
    /// The segment's feedrate differs from the run's.
    FeedrateChange,
    /// Three buffered points are collinear within tolerance.
    Collinear,
    /// The three-point fit degenerated with more points buffered.
    FitFailed,
    /// The fitted radius exceeds the configured maximum.
    RadiusExceeded,
    /// Traversal would double back against the arc direction.
    DirectionReversal,
    /// The swept angle would approach a full circle.
    SweepExceeded,
    /// A buffered vertex strays from the fitted arc by more than the
    /// resolution.
    DeviationExceeded,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RejectReason::ZeroLengthSegment => "zero-length segment",
            RejectReason::PlaneChange => "Z plane change",
            RejectReason::ExtrusionMismatch => "extrusion mismatch",
            RejectReason::ExtrusionRateChange => "extrusion rate change",
            RejectReason::FeedrateChange => "feedrate change",
            RejectReason::Collinear => "collinear points",
            RejectReason::FitFailed => "degenerate fit",
            RejectReason::RadiusExceeded => "radius exceeded",
            RejectReason::DirectionReversal => "direction reversal",
            RejectReason::SweepExceeded => "sweep exceeded",
            RejectReason::DeviationExceeded => "deviation exceeded",
        };
        write!(f, "{}", s)
    }
}

/// A point buffered in the candidate, with the segment that reached it.
#[derive(Clone, Copy, Debug)]
struct BufferedPoint {
    point: Point,
    /// Extruder advance of the segment ending at this point; zero for the
    /// start point.
    e_relative: f64,
    /// XY chord length of the segment ending at this point; zero for the
    /// start point.
    chord_length: f64,
}

/// The online arc candidate.
///
/// Points are added one at a time; the first point is the machine position
/// at which a prospective arc would begin. From the third point on, every
/// addition re-fits a circle through the first, middle and last buffered
/// points and re-checks all buffered vertices against it, so the candidate
/// is rejected the moment any invariant would break.
#[derive(Clone, Debug)]
pub struct SegmentedArc {
    config: WelderConfig,
    points: Vec<BufferedPoint>,
    arc: Option<Arc>,
}

impl SegmentedArc {
    /// Create an empty candidate.
    pub fn new(config: &WelderConfig) -> Self {
        Self {
            config: config.clone(),
            points: Vec::with_capacity(64),
            arc: None,
        }
    }

    /// Number of buffered points.
    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the candidate holds no points.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Whether the candidate currently represents a committable arc: at
    /// least the configured minimum of points, with a valid fit.
    #[inline]
    pub fn is_shape(&self) -> bool {
        self.points.len() >= self.config.min_arc_points && self.arc.is_some()
    }

    /// The current best fit, if any.
    #[inline]
    pub fn arc(&self) -> Option<&Arc> {
        self.arc.as_ref()
    }

    /// Try to append a point to the run.
    ///
    /// `e_relative` is the extruder advance of the segment from the last
    /// buffered point to `point`; it is ignored for the first point.
    pub fn try_add_point(&mut self, point: Point, e_relative: f64) -> AddOutcome {
        match self.check_point(&point, e_relative) {
            Ok(fit) => {
                let chord = self
                    .points
                    .last()
                    .map(|last| last.point.distance_xy(&point))
                    .unwrap_or(0.0);
                self.points.push(BufferedPoint {
                    point,
                    e_relative,
                    chord_length: chord,
                });
                self.arc = fit;
                AddOutcome::Accepted
            }
            Err(reason) => AddOutcome::Rejected(reason),
        }
    }

    /// Take the committed arc, resetting the candidate. Returns `None`
    /// (and leaves the buffer alone) when the candidate is not a shape.
    pub fn pop_arc(&mut self) -> Option<Arc> {
        if !self.is_shape() {
            return None;
        }
        let arc = self.arc.take();
        self.points.clear();
        arc
    }

    /// Discard the candidate.
    pub fn abort(&mut self) {
        self.points.clear();
        self.arc = None;
    }

    /// Run the gate sequence for a prospective point. On success returns
    /// the updated fit (`None` while fewer than three points would be
    /// buffered); on failure returns the rejection reason.
    fn check_point(&self, point: &Point, e_relative: f64) -> Result<Option<Arc>, RejectReason> {
        let Some(last) = self.points.last() else {
            // First point: the prospective arc start, accepted as-is.
            return Ok(None);
        };
        let first = &self.points[0];

        let chord = last.point.distance_xy(point);
        if chord < MIN_CHORD_LENGTH {
            return Err(RejectReason::ZeroLengthSegment);
        }
        if (point.z - first.point.z).abs() > Z_TOLERANCE {
            return Err(RejectReason::PlaneChange);
        }
        if e_relative < 0.0 {
            return Err(RejectReason::ExtrusionMismatch);
        }

        if self.points.len() >= 2 {
            // The first segment fixes the run's character: extruding or
            // travel, and the feedrate.
            let run_extrudes = self.points[1].e_relative > 0.0;
            if run_extrudes != (e_relative > 0.0) {
                return Err(RejectReason::ExtrusionMismatch);
            }
            if run_extrudes {
                let mean = self.mean_extrusion_rate();
                let rate = e_relative / chord;
                if (rate - mean).abs() > self.config.extrusion_rate_variance * mean {
                    return Err(RejectReason::ExtrusionRateChange);
                }
            }
            if (point.f - self.points[1].point.f).abs() > FEEDRATE_TOLERANCE {
                return Err(RejectReason::FeedrateChange);
            }
        }

        if self.points.len() < 2 {
            // Two points define no circle yet.
            return Ok(None);
        }

        self.fit(point, e_relative).map(Some)
    }

    /// Mean extrusion-per-length rate over the buffered segments.
    fn mean_extrusion_rate(&self) -> f64 {
        let segments = &self.points[1..];
        let sum: f64 = segments
            .iter()
            .map(|p| p.e_relative / p.chord_length)
            .sum();
        sum / segments.len() as f64
    }

    /// Fit a circle through the prospective run and check the geometric
    /// gates: radius, traversal monotonicity, sweep and deviation.
    fn fit(&self, point: &Point, e_relative: f64) -> Result<Arc, RejectReason> {
        let xy: Vec<PointF> = self
            .points
            .iter()
            .map(|p| p.point.xy())
            .chain(std::iter::once(point.xy()))
            .collect();

        let a = xy[0];
        let mid = xy[xy.len() / 2];
        let b = xy[xy.len() - 1];

        let circle = Circle::from_three_points(a, mid, b).ok_or(if xy.len() == 3 {
            RejectReason::Collinear
        } else {
            RejectReason::FitFailed
        })?;

        if circle.radius > self.config.max_radius_mm {
            return Err(RejectReason::RadiusExceeded);
        }

        let direction = ArcDirection::from_signed_area(signed_area2(a, mid, b));

        // Traversing from the start in the chosen direction must visit
        // every vertex in buffer order. The angle of the last vertex is
        // the total sweep.
        let mut prev = 0.0;
        let mut sweep = 0.0;
        for q in &xy[1..] {
            let theta = sweep_between(circle.center, a, *q, direction);
            if theta + ANGLE_TOLERANCE < prev {
                return Err(RejectReason::DirectionReversal);
            }
            prev = prev.max(theta);
            sweep = theta;
        }
        if sweep >= MAX_SWEEP_RADIANS {
            return Err(RejectReason::SweepExceeded);
        }

        // Every vertex sits within the arc's span (the traversal check
        // above), so radial deviation is the shortest distance to the arc.
        for q in &xy {
            if circle.radial_deviation(*q) > self.config.resolution_mm {
                return Err(RejectReason::DeviationExceeded);
            }
        }

        let total_e: f64 =
            self.points[1..].iter().map(|p| p.e_relative).sum::<f64>() + e_relative;

        Ok(Arc {
            circle,
            start: self.points[0].point,
            end: *point,
            direction,
            sweep_radians: sweep,
            e_relative: total_e,
            feedrate: self.points[1].point.f,
            point_count: xy.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn config() -> WelderConfig {
        WelderConfig::default()
    }

    /// Point on a circle of the given radius around the origin, extruding
    /// up to absolute position `e` at feedrate 1800.
    fn circle_point(radius: f64, angle_deg: f64, e: f64) -> Point {
        let angle = angle_deg.to_radians();
        Point::new(radius * angle.cos(), radius * angle.sin(), 0.2, e, 1800.0)
    }

    /// Feed a run of circle points (10 degrees apart, constant extrusion
    /// per chord) and assert each is accepted.
    fn feed_circle(arc: &mut SegmentedArc, count: usize) {
        for i in 0..count {
            let e = i as f64 * 0.05;
            let e_rel = if i == 0 { 0.0 } else { 0.05 };
            let outcome = arc.try_add_point(circle_point(10.0, i as f64 * 10.0, e), e_rel);
            assert_eq!(outcome, AddOutcome::Accepted, "point {} not accepted", i);
        }
    }

    #[test]
    fn test_accepts_circle_run_and_pops_arc() {
        let mut arc = SegmentedArc::new(&config());
        feed_circle(&mut arc, 10);

        assert!(arc.is_shape());
        let fitted = arc.pop_arc().expect("shape should pop");
        assert!((fitted.radius() - 10.0).abs() < 1e-6);
        assert_eq!(fitted.direction, ArcDirection::CounterClockwise);
        assert!((fitted.sweep_radians - PI / 2.0).abs() < 1e-6);
        assert!((fitted.e_relative - 0.45).abs() < 1e-9);
        assert_eq!(fitted.point_count, 10);
        assert!((fitted.feedrate - 1800.0).abs() < 1e-9);

        // Popping resets the candidate.
        assert!(arc.is_empty());
        assert!(!arc.is_shape());
    }

    #[test]
    fn test_two_points_are_not_a_shape() {
        let mut arc = SegmentedArc::new(&config());
        feed_circle(&mut arc, 2);
        assert!(!arc.is_shape());
        assert!(arc.pop_arc().is_none());
        assert_eq!(arc.len(), 2);
    }

    #[test]
    fn test_collinear_third_point_rejected() {
        let mut arc = SegmentedArc::new(&config());
        let p = |x: f64| Point::new(x, 0.0, 0.2, 0.0, 1800.0);
        assert_eq!(arc.try_add_point(p(0.0), 0.0), AddOutcome::Accepted);
        assert_eq!(arc.try_add_point(p(1.0), 0.0), AddOutcome::Accepted);
        assert_eq!(
            arc.try_add_point(p(2.0), 0.0),
            AddOutcome::Rejected(RejectReason::Collinear)
        );
        // Rejection leaves the candidate unchanged.
        assert_eq!(arc.len(), 2);
    }

    #[test]
    fn test_zero_length_segment_rejected() {
        let mut arc = SegmentedArc::new(&config());
        let p = circle_point(10.0, 0.0, 0.0);
        assert_eq!(arc.try_add_point(p, 0.0), AddOutcome::Accepted);
        assert_eq!(
            arc.try_add_point(p, 0.0),
            AddOutcome::Rejected(RejectReason::ZeroLengthSegment)
        );
    }

    #[test]
    fn test_plane_change_rejected() {
        let mut arc = SegmentedArc::new(&config());
        assert_eq!(
            arc.try_add_point(Point::new(0.0, 0.0, 0.2, 0.0, 0.0), 0.0),
            AddOutcome::Accepted
        );
        assert_eq!(
            arc.try_add_point(Point::new(1.0, 0.0, 0.4, 0.0, 0.0), 0.0),
            AddOutcome::Rejected(RejectReason::PlaneChange)
        );
    }

    #[test]
    fn test_extrusion_mismatch_rejected() {
        let mut arc = SegmentedArc::new(&config());
        feed_circle(&mut arc, 3);
        // Travel segment in an extruding run.
        assert_eq!(
            arc.try_add_point(circle_point(10.0, 30.0, 0.10), 0.0),
            AddOutcome::Rejected(RejectReason::ExtrusionMismatch)
        );
        // Retraction while moving.
        assert_eq!(
            arc.try_add_point(circle_point(10.0, 30.0, 0.05), -0.05),
            AddOutcome::Rejected(RejectReason::ExtrusionMismatch)
        );
    }

    #[test]
    fn test_extrusion_rate_change_rejected() {
        let mut arc = SegmentedArc::new(&config());
        feed_circle(&mut arc, 3);
        // Double the extrusion rate on an equal-length chord.
        assert_eq!(
            arc.try_add_point(circle_point(10.0, 30.0, 0.20), 0.10),
            AddOutcome::Rejected(RejectReason::ExtrusionRateChange)
        );
    }

    #[test]
    fn test_feedrate_change_rejected() {
        let mut arc = SegmentedArc::new(&config());
        feed_circle(&mut arc, 3);
        let mut p = circle_point(10.0, 30.0, 0.15);
        p.f = 2400.0;
        assert_eq!(
            arc.try_add_point(p, 0.05),
            AddOutcome::Rejected(RejectReason::FeedrateChange)
        );
    }

    #[test]
    fn test_radius_gate() {
        let cfg = config().max_radius_mm(5.0);
        let mut arc = SegmentedArc::new(&cfg);
        assert_eq!(
            arc.try_add_point(circle_point(10.0, 0.0, 0.0), 0.0),
            AddOutcome::Accepted
        );
        assert_eq!(
            arc.try_add_point(circle_point(10.0, 10.0, 0.0), 0.0),
            AddOutcome::Accepted
        );
        assert_eq!(
            arc.try_add_point(circle_point(10.0, 20.0, 0.0), 0.0),
            AddOutcome::Rejected(RejectReason::RadiusExceeded)
        );
    }

    #[test]
    fn test_direction_reversal_rejected() {
        let mut arc = SegmentedArc::new(&config());
        for angle in [0.0, 10.0, 20.0] {
            assert_eq!(
                arc.try_add_point(circle_point(10.0, angle, 0.0), 0.0),
                AddOutcome::Accepted
            );
        }
        // Doubling back to 15 degrees.
        assert_eq!(
            arc.try_add_point(circle_point(10.0, 15.0, 0.0), 0.0),
            AddOutcome::Rejected(RejectReason::DirectionReversal)
        );
    }

    #[test]
    fn test_sharp_corner_rejected_by_deviation() {
        let mut arc = SegmentedArc::new(&config());
        let p = |x: f64, y: f64| Point::new(x, y, 0.2, 0.0, 1800.0);
        assert_eq!(arc.try_add_point(p(0.0, 0.0), 0.0), AddOutcome::Accepted);
        assert_eq!(arc.try_add_point(p(5.0, 0.0), 0.0), AddOutcome::Accepted);
        assert_eq!(arc.try_add_point(p(5.0, 5.0), 0.0), AddOutcome::Accepted);
        assert_eq!(
            arc.try_add_point(p(10.0, 5.0), 0.0),
            AddOutcome::Rejected(RejectReason::DeviationExceeded)
        );
    }

    #[test]
    fn test_sweep_gate_near_full_circle() {
        let mut arc = SegmentedArc::new(&config());
        // Coarse polygon around the full circle: vertices stay on the
        // circle, so only the sweep bound can object.
        for i in 0..9 {
            assert_eq!(
                arc.try_add_point(circle_point(10.0, i as f64 * 40.0, 0.0), 0.0),
                AddOutcome::Accepted
            );
        }
        assert_eq!(
            arc.try_add_point(circle_point(10.0, 356.0, 0.0), 0.0),
            AddOutcome::Accepted
        );
        assert_eq!(
            arc.try_add_point(circle_point(10.0, 359.0, 0.0), 0.0),
            AddOutcome::Rejected(RejectReason::SweepExceeded)
        );
    }

    #[test]
    fn test_closing_the_circle_rejected() {
        let mut arc = SegmentedArc::new(&config());
        feed_circle(&mut arc, 36); // up to 350 degrees
        let outcome = arc.try_add_point(circle_point(10.0, 360.0, 36.0 * 0.05), 0.05);
        assert!(matches!(outcome, AddOutcome::Rejected(_)));
        assert!(arc.is_shape());
        let fitted = arc.pop_arc().expect("shape should pop");
        assert!((fitted.sweep_radians - 350.0_f64.to_radians()).abs() < 1e-6);
    }

    #[test]
    fn test_clockwise_run() {
        let mut arc = SegmentedArc::new(&config());
        for i in 0..5 {
            assert_eq!(
                arc.try_add_point(circle_point(10.0, -(i as f64) * 10.0, 0.0), 0.0),
                AddOutcome::Accepted
            );
        }
        let fitted = arc.pop_arc().expect("shape should pop");
        assert_eq!(fitted.direction, ArcDirection::Clockwise);
        assert!((fitted.sweep_radians - 40.0_f64.to_radians()).abs() < 1e-6);
    }

    #[test]
    fn test_min_arc_points_config() {
        let cfg = config().min_arc_points(5);
        let mut arc = SegmentedArc::new(&cfg);
        feed_circle(&mut arc, 4);
        assert!(!arc.is_shape());
        assert!(arc.pop_arc().is_none());
        assert_eq!(
            arc.try_add_point(circle_point(10.0, 40.0, 0.20), 0.05),
            AddOutcome::Accepted
        );
        assert!(arc.is_shape());
    }

    #[test]
    fn test_abort_resets() {
        let mut arc = SegmentedArc::new(&config());
        feed_circle(&mut arc, 5);
        arc.abort();
        assert!(arc.is_empty());
        assert!(arc.arc().is_none());
    }
}
