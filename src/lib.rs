//! Audiogram Digitizer - structured hearing data from audiogram images
//!
//! Reads a photo, scan or screenshot of an audiogram and returns the
//! plotted hearing thresholds for each ear, standardized to the audiometric
//! frequency set, with a confidence score for review routing.

pub mod analysis;
pub mod config;
pub mod error;
pub mod extractor;
pub mod shared;
pub mod vision;

#[cfg(test)]
mod testing;

pub use config::PipelineConfig;
pub use error::{ExtractionError, Result};
pub use extractor::{extract, ExtractionReport, Extractor};
pub use shared::{
    Ear, ExtractionResult, GraphBounds, MarkerPoint, Measurement, Metadata, STANDARD_FREQUENCIES,
};
