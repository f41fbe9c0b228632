//! Shared types and constants
//!
//! Data model consumed by every pipeline stage and by callers
//! (display, persistence, review).

pub mod frequencies;
pub mod types;

pub use frequencies::{
    is_standard_frequency, snap_to_standard, snap_within_range, STANDARD_FREQUENCIES,
    STANDARD_FREQUENCY_COUNT,
};
pub use types::{Ear, ExtractionResult, GraphBounds, MarkerPoint, Measurement, Metadata};
