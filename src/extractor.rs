//! Extraction orchestrator
//!
//! The single entry point callers use: raw image bytes in, structured
//! audiogram out. Runs preprocessing, marker detection per ear, coordinate
//! transformation and scoring in order, then asks the metadata collaborator
//! for whatever text it can find.

use std::path::Path;
use std::time::Instant;

use image::RgbImage;
use tracing::{debug, info, warn};

use crate::analysis::calibration::{
    calibrate, AxisCalibration, CoordinateTransformer, RejectedMarker, TransformOutput,
};
use crate::analysis::confidence::{breakdown, ConfidenceBreakdown};
use crate::config::PipelineConfig;
use crate::error::Result;
use crate::shared::{Ear, ExtractionResult, Measurement, Metadata};
use crate::vision::detection::MarkerDetector;
use crate::vision::ocr::{MetadataExtractor, NoMetadata};
use crate::vision::preprocess::{GraphRegion, Preprocessor};

/// Extraction result plus the diagnostics behind it
#[derive(Debug, Clone)]
pub struct ExtractionReport {
    /// The structured result handed to callers
    pub result: ExtractionResult,
    /// Sub-scores behind `result.confidence`
    pub breakdown: ConfidenceBreakdown,
    /// Plot region used for calibration
    pub region: GraphRegion,
    /// Rotation applied during preprocessing, in degrees
    pub skew_correction_degrees: f32,
    /// Markers that produced no measurement
    pub rejected: Vec<RejectedMarker>,
    /// Wall-clock time spent, in milliseconds
    pub processing_time_ms: u64,
}

/// Audiogram extraction pipeline
pub struct Extractor {
    config: PipelineConfig,
    preprocessor: Preprocessor,
    detector: MarkerDetector,
    transformer: CoordinateTransformer,
    metadata: Box<dyn MetadataExtractor>,
}

impl Default for Extractor {
    fn default() -> Self {
        Self::new()
    }
}

impl Extractor {
    /// Create an extractor with default settings and no metadata source
    pub fn new() -> Self {
        Self::with_config(PipelineConfig::default())
    }

    /// Create an extractor with custom settings
    pub fn with_config(config: PipelineConfig) -> Self {
        Self {
            preprocessor: Preprocessor::with_config(config.preprocess.clone()),
            detector: MarkerDetector::with_config(config.markers.clone()),
            transformer: CoordinateTransformer::with_config(config.transform.clone()),
            metadata: Box::new(NoMetadata),
            config,
        }
    }

    /// Attach a metadata collaborator
    pub fn with_metadata_extractor(mut self, extractor: impl MetadataExtractor + 'static) -> Self {
        self.metadata = Box::new(extractor);
        self
    }

    /// Current settings
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Extract an audiogram from raw image bytes.
    ///
    /// Fails only when the bytes cannot be decoded. A chart without markers,
    /// without a recognizable plot region, or with unreadable metadata still
    /// yields a result; its confidence reflects what was missing.
    pub fn extract(&self, raw: &[u8]) -> Result<ExtractionResult> {
        self.extract_report(raw).map(|report| report.result)
    }

    /// Read a file and extract from its contents
    pub fn extract_file(&self, path: &Path) -> Result<ExtractionResult> {
        let raw = std::fs::read(path)?;
        debug!("Read {} bytes from {:?}", raw.len(), path);
        self.extract(&raw)
    }

    /// Extract and keep the intermediate diagnostics
    pub fn extract_report(&self, raw: &[u8]) -> Result<ExtractionReport> {
        let start = Instant::now();

        let image = self.preprocessor.process(raw)?;
        let (width, height) = image.dimensions();
        let calibration = calibrate(image.bounds(), width, height);

        let mut left = self.measure_ear(&image.color, Ear::Left, &calibration);
        let mut right = self.measure_ear(&image.color, Ear::Right, &calibration);

        let mut rejected = std::mem::take(&mut left.rejected);
        rejected.append(&mut right.rejected);

        let scores = breakdown(
            &left.measurements,
            &right.measurements,
            self.config.scoring.expected_count,
            rejected.len(),
        );
        let confidence = scores.total();

        let metadata = self.read_metadata(raw);

        let processing_time = start.elapsed();
        info!(
            "Extracted {} left / {} right measurements, confidence {:.2} in {:?}",
            left.measurements.len(),
            right.measurements.len(),
            confidence,
            processing_time
        );

        Ok(ExtractionReport {
            result: ExtractionResult {
                left_ear: left.measurements,
                right_ear: right.measurements,
                confidence,
                metadata,
            },
            breakdown: scores,
            region: image.region,
            skew_correction_degrees: image.skew_correction_degrees,
            rejected,
            processing_time_ms: processing_time.as_millis() as u64,
        })
    }

    /// Detect, transform and order one ear's measurements
    fn measure_ear(&self, color: &RgbImage, ear: Ear, calibration: &AxisCalibration) -> TransformOutput {
        let markers = self.detector.detect(color, ear);
        let mut output = self.transformer.transform(&markers, calibration);
        sort_measurements(&mut output.measurements);

        if output.clamped_count() > 0 {
            debug!("{} {} ear thresholds were clamped", output.clamped_count(), ear);
        }

        output
    }

    fn read_metadata(&self, raw: &[u8]) -> Metadata {
        match self.metadata.extract(raw) {
            Ok(metadata) => metadata,
            Err(e) => {
                warn!("Metadata extraction failed: {:#}", e);
                Metadata::default()
            }
        }
    }
}

/// Order by frequency, then threshold
fn sort_measurements(measurements: &mut [Measurement]) {
    measurements.sort_by(|a, b| {
        a.frequency_hz
            .cmp(&b.frequency_hz)
            .then(a.threshold_db.total_cmp(&b.threshold_db))
    });
}

/// Extract an audiogram with default settings
pub fn extract(raw: &[u8]) -> Result<ExtractionResult> {
    Extractor::new().extract(raw)
}
