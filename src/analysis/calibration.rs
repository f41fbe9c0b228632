//! Coordinate transformation
//!
//! Maps pixel positions inside the plot to audiogram values. The x-axis is
//! logarithmic from the lowest to the highest standard frequency; the y-axis
//! is linear from 0 dB at the top edge to 120 dB at the bottom edge.

use tracing::{debug, warn};

use crate::config::TransformConfig;
use crate::shared::frequencies::{snap_within_range, HIGHEST_FREQUENCY_HZ, LOWEST_FREQUENCY_HZ};
use crate::shared::{GraphBounds, MarkerPoint, Measurement};

/// Best possible hearing threshold (top of the chart)
pub const MIN_THRESHOLD_DB: f64 = 0.0;

/// Worst plotted hearing threshold (bottom of the chart)
pub const MAX_THRESHOLD_DB: f64 = 120.0;

/// Mapping between pixel space and measurement space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisCalibration {
    /// Plot bounds the calibration was derived from
    pub bounds: GraphBounds,
    /// log10 of the frequency at the left edge
    pub freq_min_log: f64,
    /// log10 of the frequency at the right edge
    pub freq_max_log: f64,
    /// log10(Hz) per pixel
    pub freq_scale: f64,
    /// dB per pixel (positive: dB grows downward)
    pub db_scale: f64,
}

impl AxisCalibration {
    /// Raw frequency estimate in Hz for a pixel column
    pub fn frequency_at(&self, x: f64) -> f64 {
        let offset = x - f64::from(self.bounds.x_min);
        10f64.powf(self.freq_min_log + offset * self.freq_scale)
    }

    /// Raw threshold estimate in dB for a pixel row (unclamped)
    pub fn threshold_at(&self, y: f64) -> f64 {
        let offset = y - f64::from(self.bounds.y_min);
        MIN_THRESHOLD_DB + offset * self.db_scale
    }

    /// Pixel column of a frequency
    pub fn x_for_frequency(&self, frequency_hz: f64) -> f64 {
        f64::from(self.bounds.x_min) + (frequency_hz.log10() - self.freq_min_log) / self.freq_scale
    }

    /// Pixel row of a threshold
    pub fn y_for_threshold(&self, threshold_db: f64) -> f64 {
        f64::from(self.bounds.y_min) + (threshold_db - MIN_THRESHOLD_DB) / self.db_scale
    }
}

/// Derive the axis calibration from the plot bounds.
///
/// Bounds are first restricted to the image. The first and last pixel of the
/// region map to the ends of each axis.
pub fn calibrate(bounds: GraphBounds, image_width: u32, image_height: u32) -> AxisCalibration {
    let bounds = bounds.clamped_to(image_width, image_height);

    let freq_min_log = f64::from(LOWEST_FREQUENCY_HZ).log10();
    let freq_max_log = f64::from(HIGHEST_FREQUENCY_HZ).log10();

    let x_span = f64::from(bounds.width().saturating_sub(1).max(1));
    let y_span = f64::from(bounds.height().saturating_sub(1).max(1));

    let calibration = AxisCalibration {
        bounds,
        freq_min_log,
        freq_max_log,
        freq_scale: (freq_max_log - freq_min_log) / x_span,
        db_scale: (MAX_THRESHOLD_DB - MIN_THRESHOLD_DB) / y_span,
    };

    debug!(
        "Calibrated axes: {:.5} log10(Hz)/px, {:.4} dB/px",
        calibration.freq_scale, calibration.db_scale
    );

    calibration
}

/// Round to one decimal place
pub fn round_one_decimal(value: f64) -> f64 {
    // Adding 0.0 turns -0.0 into 0.0
    (value * 10.0).round() / 10.0 + 0.0
}

/// Why a marker produced no measurement
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RejectReason {
    /// Frequency estimate lies too far outside the chart's range to snap
    FrequencyOutOfRange { estimate_hz: f64 },
    /// Threshold lies too far outside 0..=120 dB to clamp
    ThresholdOutOfRange { raw_db: f64 },
}

/// A marker that could not be turned into a measurement
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RejectedMarker {
    pub marker: MarkerPoint,
    pub reason: RejectReason,
}

/// Output of transforming one ear's markers
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransformOutput {
    /// Valid (possibly clamped) measurements, in marker order
    pub measurements: Vec<Measurement>,
    /// Markers excluded from the result
    pub rejected: Vec<RejectedMarker>,
}

impl TransformOutput {
    /// Number of measurements whose threshold was clamped
    pub fn clamped_count(&self) -> usize {
        self.measurements.iter().filter(|m| m.clamped).count()
    }
}

/// Converts marker pixels to measurements
#[derive(Debug, Clone, Default)]
pub struct CoordinateTransformer {
    config: TransformConfig,
}

impl CoordinateTransformer {
    /// Create a transformer with default settings
    pub fn new() -> Self {
        Self::with_config(TransformConfig::default())
    }

    /// Create a transformer with custom settings
    pub fn with_config(config: TransformConfig) -> Self {
        Self { config }
    }

    /// Convert one marker.
    ///
    /// Frequencies are snapped to the standard set. Thresholds are rounded to
    /// one decimal; values slightly outside 0..=120 dB are clamped and
    /// flagged, since such overshoot comes from centroid error rather than a
    /// real reading. Values far outside are rejected.
    pub fn map_marker(
        &self,
        marker: &MarkerPoint,
        calibration: &AxisCalibration,
    ) -> Result<Measurement, RejectReason> {
        let estimate_hz = calibration.frequency_at(marker.x);
        let frequency_hz = snap_within_range(estimate_hz, self.config.max_snap_octaves)
            .ok_or(RejectReason::FrequencyOutOfRange { estimate_hz })?;

        let raw_db = calibration.threshold_at(marker.y);
        let overshoot = self.config.max_db_overshoot.max(0.0);
        if !raw_db.is_finite()
            || raw_db < MIN_THRESHOLD_DB - overshoot
            || raw_db > MAX_THRESHOLD_DB + overshoot
        {
            return Err(RejectReason::ThresholdOutOfRange { raw_db });
        }

        let rounded = round_one_decimal(raw_db);
        let clamped = !(MIN_THRESHOLD_DB..=MAX_THRESHOLD_DB).contains(&rounded);

        Ok(Measurement {
            frequency_hz,
            threshold_db: rounded.clamp(MIN_THRESHOLD_DB, MAX_THRESHOLD_DB),
            clamped,
        })
    }

    /// Convert a list of markers, separating out rejected ones
    pub fn transform(&self, markers: &[MarkerPoint], calibration: &AxisCalibration) -> TransformOutput {
        let mut output = TransformOutput::default();

        for marker in markers {
            match self.map_marker(marker, calibration) {
                Ok(measurement) => output.measurements.push(measurement),
                Err(reason) => {
                    warn!(
                        "Rejected {} marker at ({:.1}, {:.1}): {:?}",
                        marker.ear, marker.x, marker.y, reason
                    );
                    output.rejected.push(RejectedMarker {
                        marker: *marker,
                        reason,
                    });
                }
            }
        }

        output
    }
}

/// Convert markers with default settings, dropping rejected ones
pub fn transform(markers: &[MarkerPoint], calibration: &AxisCalibration) -> Vec<Measurement> {
    CoordinateTransformer::new()
        .transform(markers, calibration)
        .measurements
}
