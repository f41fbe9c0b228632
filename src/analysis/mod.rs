//! Measurement analysis
//!
//! Turns detected marker pixels into calibrated audiogram values and rates
//! how trustworthy the resulting set is.

pub mod calibration;
pub mod confidence;
pub mod dedup;

pub use calibration::{
    calibrate, transform, AxisCalibration, CoordinateTransformer, RejectReason, RejectedMarker,
    TransformOutput, MAX_THRESHOLD_DB, MIN_THRESHOLD_DB,
};
pub use confidence::{breakdown, score, ConfidenceBreakdown};
pub use dedup::deduplicate_by_frequency;
