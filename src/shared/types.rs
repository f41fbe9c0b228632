//! Data types shared across pipeline stages

use serde::{Deserialize, Serialize};

/// Which ear a marker or measurement belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Ear {
    /// Left ear, plotted as blue crosses
    Left,
    /// Right ear, plotted as red circles
    Right,
}

impl Ear {
    /// Both ears, in result order
    pub const ALL: [Ear; 2] = [Ear::Left, Ear::Right];

    /// Marker color used for this ear on the chart
    pub fn marker_color(&self) -> &'static str {
        match self {
            Ear::Left => "blue",
            Ear::Right => "red",
        }
    }
}

impl std::fmt::Display for Ear {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Ear::Left => write!(f, "left"),
            Ear::Right => write!(f, "right"),
        }
    }
}

/// Rectangular pixel region occupied by the plot.
///
/// `x_max` and `y_max` are exclusive. Construction guarantees
/// `x_max > x_min` and `y_max > y_min`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphBounds {
    pub x_min: u32,
    pub x_max: u32,
    pub y_min: u32,
    pub y_max: u32,
}

impl GraphBounds {
    /// Create bounds, returning `None` if either axis is empty
    pub fn new(x_min: u32, x_max: u32, y_min: u32, y_max: u32) -> Option<Self> {
        if x_max > x_min && y_max > y_min {
            Some(Self { x_min, x_max, y_min, y_max })
        } else {
            None
        }
    }

    /// Bounds covering a whole image.
    ///
    /// Zero dimensions are widened to one pixel so the invariant holds.
    pub fn full_image(width: u32, height: u32) -> Self {
        Self {
            x_min: 0,
            x_max: width.max(1),
            y_min: 0,
            y_max: height.max(1),
        }
    }

    /// Width in pixels
    pub fn width(&self) -> u32 {
        self.x_max - self.x_min
    }

    /// Height in pixels
    pub fn height(&self) -> u32 {
        self.y_max - self.y_min
    }

    /// Restrict the bounds to an image of the given size.
    ///
    /// Falls back to the full image if nothing of the region remains.
    pub fn clamped_to(&self, width: u32, height: u32) -> Self {
        let x_max = self.x_max.min(width);
        let y_max = self.y_max.min(height);
        GraphBounds::new(self.x_min, x_max, self.y_min, y_max)
            .unwrap_or_else(|| GraphBounds::full_image(width, height))
    }
}

/// One detected marker centroid, in pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarkerPoint {
    /// Centroid x (pixels, sub-pixel precision)
    pub x: f64,
    /// Centroid y (pixels, sub-pixel precision)
    pub y: f64,
    /// Color class of the blob
    pub ear: Ear,
    /// Number of pixels in the blob
    pub area: u32,
}

/// One (frequency, threshold) reading for one ear
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    /// Standard audiometric frequency in Hz
    pub frequency_hz: u32,
    /// Hearing threshold in dB HL, within 0..=120, one decimal
    pub threshold_db: f64,
    /// Raw threshold fell outside 0..=120 and was clamped to the boundary
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub clamped: bool,
}

impl Measurement {
    /// Create an unclamped measurement
    pub fn new(frequency_hz: u32, threshold_db: f64) -> Self {
        Self {
            frequency_hz,
            threshold_db,
            clamped: false,
        }
    }
}

/// Test metadata read from the chart's printed text
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    /// Test date, `YYYY-MM-DD`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    /// Test time, `HH:MM`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    /// Device or application that produced the chart
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,
    /// Test location
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl Metadata {
    /// True when no field was extracted
    pub fn is_empty(&self) -> bool {
        self.date.is_none() && self.time.is_none() && self.device.is_none() && self.location.is_none()
    }
}

/// Final structured output of the pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    /// Left ear measurements, ordered by frequency
    pub left_ear: Vec<Measurement>,
    /// Right ear measurements, ordered by frequency
    pub right_ear: Vec<Measurement>,
    /// Extraction reliability (0.0 - 1.0)
    pub confidence: f64,
    /// Best-effort text metadata
    #[serde(default)]
    pub metadata: Metadata,
}

impl ExtractionResult {
    /// Measurements for one ear
    pub fn ear(&self, ear: Ear) -> &[Measurement] {
        match ear {
            Ear::Left => &self.left_ear,
            Ear::Right => &self.right_ear,
        }
    }

    /// Whether the result should be routed to manual review.
    ///
    /// The cutoff is the caller's policy; 0.8 is the usual convention.
    pub fn needs_review(&self, threshold: f64) -> bool {
        self.confidence < threshold
    }

    /// Total number of measurements across both ears
    pub fn measurement_count(&self) -> usize {
        self.left_ear.len() + self.right_ear.len()
    }
}
