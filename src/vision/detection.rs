//! Marker detection module
//!
//! Finds colored audiogram markers by hue-saturation-value thresholding and
//! reduces each connected blob to its centroid. HSV is used instead of raw
//! RGB thresholds so that detection tolerates photographed lighting.

use image::{GrayImage, Luma, Rgb, RgbImage};
use imageproc::region_labelling::{connected_components, Connectivity};
use palette::{FromColor, Hsv, Srgb};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::MarkerConfig;
use crate::shared::{Ear, MarkerPoint};

/// Inclusive HSV range. Hue is in degrees (0-360), saturation and value
/// on the 0-255 scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HsvRange {
    pub hue_min: f32,
    pub hue_max: f32,
    pub saturation_min: u8,
    pub saturation_max: u8,
    pub value_min: u8,
    pub value_max: u8,
}

impl HsvRange {
    /// Check whether a color falls inside the range
    pub fn contains(&self, hsv: &Hsv) -> bool {
        let hue = hsv.hue.into_positive_degrees();
        let saturation = hsv.saturation * 255.0;
        let value = hsv.value * 255.0;

        hue >= self.hue_min
            && hue <= self.hue_max
            && saturation >= f32::from(self.saturation_min)
            && saturation <= f32::from(self.saturation_max)
            && value >= f32::from(self.value_min)
            && value <= f32::from(self.value_max)
    }
}

/// Right-ear red, low side of the hue wrap (0-20 degrees)
pub const RIGHT_EAR_RED_LOW: HsvRange = HsvRange {
    hue_min: 0.0,
    hue_max: 20.0,
    saturation_min: 100,
    saturation_max: 255,
    value_min: 100,
    value_max: 255,
};

/// Right-ear red, high side of the hue wrap (340-360 degrees)
pub const RIGHT_EAR_RED_HIGH: HsvRange = HsvRange {
    hue_min: 340.0,
    hue_max: 360.0,
    saturation_min: 100,
    saturation_max: 255,
    value_min: 100,
    value_max: 255,
};

/// Left-ear blue (200-260 degrees)
pub const LEFT_EAR_BLUE: HsvRange = HsvRange {
    hue_min: 200.0,
    hue_max: 260.0,
    saturation_min: 100,
    saturation_max: 255,
    value_min: 100,
    value_max: 255,
};

/// Convert an 8-bit sRGB pixel to HSV
pub fn pixel_hsv(pixel: &Rgb<u8>) -> Hsv {
    let [r, g, b] = pixel.0;
    Hsv::from_color(Srgb::new(r, g, b).into_format::<f32>())
}

/// Build a binary mask (255 = match) of pixels inside any of the ranges
pub fn color_mask(image: &RgbImage, ranges: &[HsvRange]) -> GrayImage {
    let mut mask = GrayImage::new(image.width(), image.height());

    for (x, y, pixel) in image.enumerate_pixels() {
        let hsv = pixel_hsv(pixel);
        if ranges.iter().any(|range| range.contains(&hsv)) {
            mask.put_pixel(x, y, Luma([255]));
        }
    }

    mask
}

/// Running pixel sums for one connected blob
#[derive(Debug, Clone, Copy, Default)]
struct BlobAccumulator {
    sum_x: f64,
    sum_y: f64,
    count: u32,
}

/// Reduce every connected blob in a mask to its centroid.
///
/// Blobs smaller than `min_pixels` are dropped. Masks narrower or shorter
/// than two pixels hold no markers.
pub fn blob_centroids(mask: &GrayImage, ear: Ear, min_pixels: u32) -> Vec<MarkerPoint> {
    if mask.width() < 2 || mask.height() < 2 {
        return Vec::new();
    }

    let labels = connected_components(mask, Connectivity::Eight, Luma([0u8]));

    let mut blobs: Vec<BlobAccumulator> = Vec::new();
    for (x, y, label) in labels.enumerate_pixels() {
        let label = label.0[0] as usize;
        if label == 0 {
            continue;
        }
        if label >= blobs.len() {
            blobs.resize(label + 1, BlobAccumulator::default());
        }
        let blob = &mut blobs[label];
        blob.sum_x += f64::from(x);
        blob.sum_y += f64::from(y);
        blob.count += 1;
    }

    let min_pixels = min_pixels.max(1);
    let mut markers: Vec<MarkerPoint> = blobs
        .into_iter()
        .filter(|blob| blob.count >= min_pixels)
        .map(|blob| MarkerPoint {
            x: blob.sum_x / f64::from(blob.count),
            y: blob.sum_y / f64::from(blob.count),
            ear,
            area: blob.count,
        })
        .collect();

    markers.sort_by(|a, b| a.x.total_cmp(&b.x).then(a.y.total_cmp(&b.y)));
    markers
}

/// Detects colored markers for each ear
#[derive(Debug, Clone, Default)]
pub struct MarkerDetector {
    config: MarkerConfig,
}

impl MarkerDetector {
    /// Create a detector with the default color ranges
    pub fn new() -> Self {
        Self::with_config(MarkerConfig::default())
    }

    /// Create a detector with custom settings
    pub fn with_config(config: MarkerConfig) -> Self {
        Self { config }
    }

    /// Color ranges used for an ear
    pub fn ranges_for(&self, ear: Ear) -> &[HsvRange] {
        match ear {
            Ear::Left => &self.config.left_ear,
            Ear::Right => &self.config.right_ear,
        }
    }

    /// Find all markers of one ear's color.
    ///
    /// No upper bound is applied; duplicates and specks are left for the
    /// scoring and deduplication stages.
    pub fn detect(&self, image: &RgbImage, ear: Ear) -> Vec<MarkerPoint> {
        let mask = color_mask(image, self.ranges_for(ear));
        let markers = blob_centroids(&mask, ear, self.config.min_blob_pixels);

        debug!(
            "Detected {} {} markers for {} ear",
            markers.len(),
            ear.marker_color(),
            ear
        );

        markers
    }
}
