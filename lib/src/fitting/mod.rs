//! Online arc fitting.
//!
//! [`SegmentedArc`] is the geometric kernel of the welder: it maintains a
//! candidate arc over a growing run of points and answers, for each new
//! point, whether the run can still be represented as a single `G2`/`G3`
//! within the configured resolution.

mod segmented_arc;

pub use segmented_arc::{AddOutcome, RejectReason, SegmentedArc};
