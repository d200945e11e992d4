//! # Arc Welder
//!
//! Compresses runs of short linear moves (`G0`/`G1`) in 3D-printer G-code
//! into single circular arc commands (`G2`/`G3`), reducing file size and
//! per-second command throughput while keeping the tool path within a
//! configured resolution of the original polyline.
//!
//! The library is a one-pass streaming transformation:
//! - Each source line is parsed into a [`ParsedCommand`]
//! - A [`PositionTracker`] maintains the machine state (XYZE position,
//!   extruder mode, feedrate, units)
//! - A [`SegmentedArc`] candidate grows point by point and is rejected the
//!   moment it can no longer satisfy the deviation, radius, extrusion or
//!   feedrate constraints
//! - The [`Welder`] pipeline decides, line by line, whether to extend the
//!   candidate, commit it as a `G2`/`G3`, or pass the line through verbatim
//!
//! ## Example
//!
//! ```rust,ignore
//! use arc_welder::{Welder, WelderConfig};
//!
//! let config = WelderConfig::default().resolution_mm(0.05);
//! let result = Welder::new("input.gcode", "output.gcode", config)
//!     .with_progress(|progress| {
//!         println!("{}", progress);
//!         true // continue
//!     })
//!     .process();
//! assert!(result.success);
//! ```

pub mod config;
pub mod fitting;
pub mod gcode;
pub mod geometry;
pub mod pipeline;
pub mod stats;

// Re-export commonly used types
pub use config::WelderConfig;
pub use fitting::{AddOutcome, RejectReason, SegmentedArc};
pub use gcode::{
    parse_line, MachineState, OutputWriter, ParsedCommand, PositionTracker, PositionUpdate,
};
pub use geometry::{sweep_between, Arc, ArcDirection, Circle, Point, PointF};
pub use pipeline::Welder;
pub use stats::{
    Progress, SegmentBucket, SegmentStatistics, WeldResult, SEGMENT_STATISTIC_LENGTHS,
};

/// Result type used throughout the welder.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for welder operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Source file error: {0}")]
    Source(String),

    #[error("Target file error: {0}")]
    Target(String),

    #[error("G-code error: {0}")]
    GCode(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
