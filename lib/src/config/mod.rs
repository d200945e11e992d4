//! Welder configuration types.
//!
//! This module provides the configuration for the arc-welding pass:
//! the spatial resolution, the radius bound, extruder-mode handling and
//! the buffering/notification tuning knobs.

use serde::{Deserialize, Serialize};

/// Millimetres per inch, used to interpret parameters while `G20` is active.
pub const MM_PER_INCH: f64 = 25.4;

/// Default maximum allowed deviation between the fitted arc and any source
/// vertex (mm).
pub const DEFAULT_RESOLUTION_MM: f64 = 0.05;

/// Default upper bound on the fitted arc radius (mm). Arcs larger than this
/// are indistinguishable from straight lines at print scale.
pub const DEFAULT_MAX_RADIUS_MM: f64 = 1_000_000.0;

/// Default minimum number of buffered points before a candidate counts as
/// a committable arc.
pub const DEFAULT_MIN_ARC_POINTS: usize = 3;

/// Default capacity hint for the unwritten-command buffer.
pub const DEFAULT_BUFFER_SIZE: usize = 1000;

/// Default minimum interval between progress callbacks (seconds).
pub const DEFAULT_NOTIFICATION_PERIOD_SECONDS: f64 = 1.0;

/// Default allowed deviation of a segment's per-length extrusion rate from
/// the running mean of the candidate, as a fraction.
pub const DEFAULT_EXTRUSION_RATE_VARIANCE: f64 = 0.05;

/// Configuration for an arc-welding run.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct WelderConfig {
    /// Maximum allowed deviation (mm) between the fitted arc and any
    /// original polyline vertex.
    pub resolution_mm: f64,

    /// Upper bound on the fitted arc radius (mm). Larger fits are rejected.
    pub max_radius_mm: f64,

    /// Minimum number of buffered points (start point included) before a
    /// candidate is committable as an arc.
    pub min_arc_points: usize,

    /// If true, `G90`/`G91` also switch the extruder between absolute and
    /// relative mode (firmware-dependent behaviour).
    pub g90_g91_influences_extruder: bool,

    /// Capacity hint for the unwritten-command buffer.
    pub buffer_size: usize,

    /// Minimum interval between progress callbacks (seconds).
    pub notification_period_seconds: f64,

    /// Allowed deviation of a segment's extrusion-per-length rate from the
    /// candidate's running mean, as a fraction of the mean.
    pub extrusion_rate_variance: f64,
}

impl Default for WelderConfig {
    fn default() -> Self {
        Self {
            resolution_mm: DEFAULT_RESOLUTION_MM,
            max_radius_mm: DEFAULT_MAX_RADIUS_MM,
            min_arc_points: DEFAULT_MIN_ARC_POINTS,
            g90_g91_influences_extruder: false,
            buffer_size: DEFAULT_BUFFER_SIZE,
            notification_period_seconds: DEFAULT_NOTIFICATION_PERIOD_SECONDS,
            extrusion_rate_variance: DEFAULT_EXTRUSION_RATE_VARIANCE,
        }
    }
}

impl WelderConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: set the resolution (mm).
    pub fn resolution_mm(mut self, resolution: f64) -> Self {
        self.resolution_mm = resolution;
        self
    }

    /// Builder: set the maximum arc radius (mm).
    pub fn max_radius_mm(mut self, radius: f64) -> Self {
        self.max_radius_mm = radius;
        self
    }

    /// Builder: set the minimum number of points per arc.
    pub fn min_arc_points(mut self, points: usize) -> Self {
        self.min_arc_points = points;
        self
    }

    /// Builder: set whether `G90`/`G91` influence the extruder mode.
    pub fn g90_g91_influences_extruder(mut self, influences: bool) -> Self {
        self.g90_g91_influences_extruder = influences;
        self
    }

    /// Builder: set the unwritten-buffer capacity hint.
    pub fn buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size;
        self
    }

    /// Builder: set the progress notification period (seconds).
    pub fn notification_period_seconds(mut self, seconds: f64) -> Self {
        self.notification_period_seconds = seconds;
        self
    }

    /// Validate the configuration, returning a descriptive error for
    /// out-of-range values.
    pub fn validate(&self) -> crate::Result<()> {
        if self.resolution_mm <= 0.0 {
            return Err(crate::Error::Config(format!(
                "resolution_mm must be positive, got {}",
                self.resolution_mm
            )));
        }
        if self.max_radius_mm <= 0.0 {
            return Err(crate::Error::Config(format!(
                "max_radius_mm must be positive, got {}",
                self.max_radius_mm
            )));
        }
        if self.min_arc_points < 3 {
            return Err(crate::Error::Config(format!(
                "min_arc_points must be at least 3, got {}",
                self.min_arc_points
            )));
        }
        if self.notification_period_seconds < 0.0 {
            return Err(crate::Error::Config(format!(
                "notification_period_seconds must not be negative, got {}",
                self.notification_period_seconds
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = WelderConfig::default();
        assert!((config.resolution_mm - 0.05).abs() < 1e-12);
        assert!(!config.g90_g91_influences_extruder);
        assert_eq!(config.min_arc_points, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let config = WelderConfig::new()
            .resolution_mm(0.1)
            .max_radius_mm(500.0)
            .g90_g91_influences_extruder(true);

        assert!((config.resolution_mm - 0.1).abs() < 1e-12);
        assert!((config.max_radius_mm - 500.0).abs() < 1e-12);
        assert!(config.g90_g91_influences_extruder);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(WelderConfig::new().resolution_mm(0.0).validate().is_err());
        assert!(WelderConfig::new().max_radius_mm(-1.0).validate().is_err());
        assert!(WelderConfig::new().min_arc_points(2).validate().is_err());
    }

    #[test]
    fn test_json_round_trip() {
        let config = WelderConfig::new().resolution_mm(0.025);
        let json = serde_json::to_string(&config).unwrap();
        let parsed: WelderConfig = serde_json::from_str(&json).unwrap();
        assert!((parsed.resolution_mm - 0.025).abs() < 1e-12);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let parsed: WelderConfig = serde_json::from_str(r#"{"resolution_mm": 0.1}"#).unwrap();
        assert!((parsed.resolution_mm - 0.1).abs() < 1e-12);
        assert_eq!(parsed.buffer_size, DEFAULT_BUFFER_SIZE);
    }
}
