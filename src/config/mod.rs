//! Pipeline Configuration
//!
//! Tunable parameters for every stage, stored in TOML format.
//! Every section and key is optional; missing values take their defaults.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::shared::STANDARD_FREQUENCY_COUNT;
use crate::vision::detection::{HsvRange, LEFT_EAR_BLUE, RIGHT_EAR_RED_HIGH, RIGHT_EAR_RED_LOW};

/// Confidence below which results are conventionally sent to manual review
pub const DEFAULT_REVIEW_THRESHOLD: f64 = 0.8;

/// Complete pipeline settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Image preprocessing and graph-region detection
    pub preprocess: PreprocessConfig,
    /// Marker color detection
    pub markers: MarkerConfig,
    /// Pixel to measurement conversion
    pub transform: TransformConfig,
    /// Confidence scoring
    pub scoring: ScoringConfig,
    /// Text metadata extraction
    pub metadata: MetadataConfig,
}

/// Preprocessing settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessConfig {
    /// Side of the adaptive threshold window in pixels (odd)
    pub threshold_block_size: u32,
    /// Constant subtracted from the local mean before comparison
    pub threshold_offset: f32,
    /// Canny hysteresis low threshold
    pub canny_low: f32,
    /// Canny hysteresis high threshold
    pub canny_high: f32,
    /// Minimum Hough accumulator votes for a line
    pub hough_vote_threshold: u32,
    /// Non-maximum suppression radius in the Hough accumulator
    pub hough_suppression_radius: u32,
    /// Enable skew correction
    pub deskew: bool,
    /// Skew below this many degrees is left uncorrected
    pub deskew_dead_zone_degrees: f32,
    /// Lines deviating more than this from the axes are ignored
    pub max_skew_degrees: f32,
    /// Pixels at least this saturated (0-255) do not count toward the graph bounds
    pub chroma_saturation_min: u8,
    /// ...and at least this bright (0-255)
    pub chroma_value_min: u8,
    /// Extra pixels excluded around colored pixels (anti-aliased fringes)
    pub chroma_margin: u8,
    /// Smallest accepted graph region, as a fraction of each image dimension
    pub min_region_fraction: f32,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            threshold_block_size: 11,
            threshold_offset: 2.0,
            canny_low: 50.0,
            canny_high: 150.0,
            hough_vote_threshold: 200,
            hough_suppression_radius: 8,
            deskew: true,
            deskew_dead_zone_degrees: 0.5,
            max_skew_degrees: 15.0,
            chroma_saturation_min: 80,
            chroma_value_min: 60,
            chroma_margin: 2,
            min_region_fraction: 0.2,
        }
    }
}

/// Marker detection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkerConfig {
    /// Hue ranges matching right-ear (red) markers; unioned
    pub right_ear: Vec<HsvRange>,
    /// Hue ranges matching left-ear (blue) markers; unioned
    pub left_ear: Vec<HsvRange>,
    /// Blobs with fewer pixels are discarded as degenerate
    pub min_blob_pixels: u32,
}

impl Default for MarkerConfig {
    fn default() -> Self {
        Self {
            right_ear: vec![RIGHT_EAR_RED_LOW, RIGHT_EAR_RED_HIGH],
            left_ear: vec![LEFT_EAR_BLUE],
            min_blob_pixels: 4,
        }
    }
}

/// Coordinate transform settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformConfig {
    /// Thresholds up to this far outside 0..=120 dB are clamped; farther ones are rejected
    pub max_db_overshoot: f64,
    /// Frequency estimates up to this many octaves outside the standard range are snapped
    pub max_snap_octaves: f64,
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            max_db_overshoot: 10.0,
            max_snap_octaves: 0.5,
        }
    }
}

/// Confidence scoring settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Markers expected per ear on a complete chart
    pub expected_count: usize,
    /// Review cutoff used by callers that do not bring their own policy
    pub review_threshold: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            expected_count: STANDARD_FREQUENCY_COUNT,
            review_threshold: DEFAULT_REVIEW_THRESHOLD,
        }
    }
}

/// Text metadata settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataConfig {
    /// Height of the footer strip as a fraction of the image height
    pub footer_fraction: f32,
    /// Height of the header strip as a fraction of the image height
    pub header_fraction: f32,
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            footer_fraction: 0.1,
            header_fraction: 0.1,
        }
    }
}

/// Load configuration from file
pub fn load_config(path: &Path) -> Result<PipelineConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;
    let config: PipelineConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;
    Ok(config)
}

/// Save configuration to file
pub fn save_config(config: &PipelineConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content)?;
    Ok(())
}

/// Get the configuration directory
pub fn get_config_dir() -> Result<PathBuf> {
    let proj_dirs = directories::ProjectDirs::from("org", "audiogram", "audiogram-digitizer")
        .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;

    Ok(proj_dirs.config_dir().to_path_buf())
}

/// Default location of the configuration file
pub fn default_config_path() -> Result<PathBuf> {
    Ok(get_config_dir()?.join("config.toml"))
}
