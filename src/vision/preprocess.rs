//! Image preprocessing for chart digitization
//!
//! Decodes the raw upload, builds a binary ink view with adaptive
//! thresholding, corrects small rotations and locates the plot region.
//!
//! Ink polarity: in the thresholded view, strokes darker than their
//! neighborhood are 255 and paper is 0.

use image::imageops::grayscale;
use image::{DynamicImage, GrayImage, Luma, Rgb, RgbImage};
use imageproc::distance_transform::Norm;
use imageproc::edges::canny;
use imageproc::filter::gaussian_blur_f32;
use imageproc::geometric_transformations::{rotate_about_center, Interpolation};
use imageproc::hough::{detect_lines, LineDetectionOptions};
use imageproc::morphology::dilate;
use imageproc::region_labelling::{connected_components, Connectivity};
use tracing::{debug, info, warn};

use crate::config::PreprocessConfig;
use crate::error::{ExtractionError, Result};
use crate::shared::GraphBounds;
use crate::vision::detection::pixel_hsv;

/// Where the graph bounds came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphRegion {
    /// Bounding box of the largest connected ink structure
    Detected(GraphBounds),
    /// No usable region was found; the whole image is used
    Fallback(GraphBounds),
}

impl GraphRegion {
    /// The bounds regardless of origin
    pub fn bounds(&self) -> GraphBounds {
        match self {
            GraphRegion::Detected(bounds) | GraphRegion::Fallback(bounds) => *bounds,
        }
    }

    /// True when detection failed and full-image bounds are used
    pub fn is_fallback(&self) -> bool {
        matches!(self, GraphRegion::Fallback(_))
    }
}

/// Output of the preprocessing stage
#[derive(Debug, Clone)]
pub struct PreprocessedImage {
    /// Color view, rotated by the same correction as `grayscale`
    pub color: RgbImage,
    /// Binary ink view (255 = ink)
    pub grayscale: GrayImage,
    /// Plot region within both views
    pub region: GraphRegion,
    /// Rotation that was applied, in degrees (0.0 when none)
    pub skew_correction_degrees: f32,
}

impl PreprocessedImage {
    /// Image dimensions as (width, height)
    pub fn dimensions(&self) -> (u32, u32) {
        self.grayscale.dimensions()
    }

    /// The plot bounds
    pub fn bounds(&self) -> GraphBounds {
        self.region.bounds()
    }
}

/// Decode raw bytes into an image
pub fn decode(raw: &[u8]) -> Result<DynamicImage> {
    if raw.is_empty() {
        return Err(ExtractionError::EmptyInput);
    }
    let image = image::load_from_memory(raw)?;
    debug!("Decoded {}x{} image", image.width(), image.height());
    Ok(image)
}

/// Preprocess raw bytes with default settings
pub fn preprocess(raw: &[u8]) -> Result<PreprocessedImage> {
    Preprocessor::new().process(raw)
}

/// Image preprocessing stage
#[derive(Debug, Clone, Default)]
pub struct Preprocessor {
    config: PreprocessConfig,
}

impl Preprocessor {
    /// Create a preprocessor with default settings
    pub fn new() -> Self {
        Self::with_config(PreprocessConfig::default())
    }

    /// Create a preprocessor with custom settings
    pub fn with_config(config: PreprocessConfig) -> Self {
        Self { config }
    }

    /// Decode and preprocess raw image bytes
    pub fn process(&self, raw: &[u8]) -> Result<PreprocessedImage> {
        let image = decode(raw)?;
        Ok(self.process_image(image.to_rgb8()))
    }

    /// Preprocess an already decoded color image
    pub fn process_image(&self, color: RgbImage) -> PreprocessedImage {
        let config = &self.config;

        let luma = grayscale(&color);
        let mut ink = adaptive_threshold(&luma, config.threshold_block_size, config.threshold_offset);
        let mut color = color;
        let mut applied = 0.0;

        if config.deskew {
            match estimate_skew(&ink, config) {
                Some(skew) if skew.abs() >= config.deskew_dead_zone_degrees => {
                    info!("Correcting {:.1} degree skew", skew);
                    let theta = (-skew).to_radians();
                    let luma = rotate_about_center(&luma, theta, Interpolation::Bilinear, Luma([255]));
                    ink = adaptive_threshold(&luma, config.threshold_block_size, config.threshold_offset);
                    color = rotate_about_center(&color, theta, Interpolation::Bilinear, Rgb([255, 255, 255]));
                    applied = -skew;
                }
                Some(skew) => debug!("Skew {:.2} degrees within dead zone, not rotating", skew),
                None => debug!("No straight lines found, skipping deskew"),
            }
        }

        let chroma = chroma_mask(&color, config);
        let region = find_graph_region(&ink, &chroma, config.min_region_fraction);
        match region {
            GraphRegion::Detected(bounds) => debug!("Graph region detected: {:?}", bounds),
            GraphRegion::Fallback(bounds) => warn!("No graph region found, using full image {:?}", bounds),
        }

        PreprocessedImage {
            color,
            grayscale: ink,
            region,
            skew_correction_degrees: applied,
        }
    }
}

/// Mask (255) of strongly colored pixels, widened by `chroma_margin`.
///
/// Frame and grid are printed in neutral ink. Colored pixels are markers,
/// which sit on top of the plot structure and may overhang the frame. The
/// margin covers anti-aliased fringes.
pub fn chroma_mask(color: &RgbImage, config: &PreprocessConfig) -> GrayImage {
    let saturation_min = f32::from(config.chroma_saturation_min) / 255.0;
    let value_min = f32::from(config.chroma_value_min) / 255.0;
    let mut mask = GrayImage::new(color.width(), color.height());

    for (x, y, pixel) in color.enumerate_pixels() {
        let hsv = pixel_hsv(pixel);
        if hsv.saturation >= saturation_min && hsv.value >= value_min {
            mask.put_pixel(x, y, Luma([255]));
        }
    }

    if config.chroma_margin > 0 {
        mask = dilate(&mask, Norm::LInf, config.chroma_margin);
    }
    mask
}

/// Gaussian-weighted adaptive threshold.
///
/// A pixel is ink (255) when it is at least `offset` darker than the
/// Gaussian-weighted mean of its `block_size` window. Flat regions of any
/// brightness come out as paper, which flattens uneven lighting.
pub fn adaptive_threshold(gray: &GrayImage, block_size: u32, offset: f32) -> GrayImage {
    let block_size = block_size.max(3) | 1;
    // Same kernel-size to sigma relation as the common OpenCV convention
    let sigma = 0.3 * ((block_size as f32 - 1.0) * 0.5 - 1.0) + 0.8;
    let mean = gaussian_blur_f32(gray, sigma);

    let mut ink = GrayImage::new(gray.width(), gray.height());
    for (x, y, pixel) in gray.enumerate_pixels() {
        let local = f32::from(mean.get_pixel(x, y).0[0]);
        if f32::from(pixel.0[0]) <= local - offset {
            ink.put_pixel(x, y, Luma([255]));
        }
    }

    ink
}

/// Deviation of a Hough line from the nearest image axis, in degrees.
///
/// `angle` is the direction of the line normal (0-179). Positive values mean
/// the content is rotated clockwise on screen.
pub fn axis_deviation(angle: u32) -> f32 {
    let folded = (angle % 90) as f32;
    if folded > 45.0 {
        folded - 90.0
    } else {
        folded
    }
}

/// Estimate content rotation from straight edges.
///
/// Returns the median deviation of near-axis lines, or `None` if no
/// qualifying line is found.
pub fn estimate_skew(ink: &GrayImage, config: &PreprocessConfig) -> Option<f32> {
    let edges = canny(ink, config.canny_low, config.canny_high);
    let lines = detect_lines(
        &edges,
        LineDetectionOptions {
            vote_threshold: config.hough_vote_threshold,
            suppression_radius: config.hough_suppression_radius,
        },
    );

    let deviations: Vec<f32> = lines
        .iter()
        .map(|line| axis_deviation(line.angle_in_degrees))
        .filter(|deviation| deviation.abs() <= config.max_skew_degrees)
        .collect();

    debug!(
        "Hough transform found {} lines, {} near-axis",
        lines.len(),
        deviations.len()
    );

    median(deviations)
}

fn median(mut values: Vec<f32>) -> Option<f32> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(f32::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        Some((values[mid - 1] + values[mid]) / 2.0)
    } else {
        Some(values[mid])
    }
}

/// Bounding box accumulated for one connected component
#[derive(Debug, Clone, Copy)]
struct ComponentBox {
    min_x: u32,
    max_x: u32,
    min_y: u32,
    max_y: u32,
}

impl ComponentBox {
    fn area(&self) -> u64 {
        u64::from(self.max_x - self.min_x + 1) * u64::from(self.max_y - self.min_y + 1)
    }
}

/// Locate the plot as the connected ink structure with the largest
/// bounding box.
///
/// Frame and grid lines form one connected component on a well-formed
/// chart. Markers drawn across those lines stay in `ink` so they do not
/// split it, but pixels set in `excluded` are skipped when the box is
/// measured. Regions smaller than `min_fraction` of the image on either
/// axis are rejected in favor of the full image.
pub fn find_graph_region(ink: &GrayImage, excluded: &GrayImage, min_fraction: f32) -> GraphRegion {
    let (width, height) = ink.dimensions();
    let fallback = GraphRegion::Fallback(GraphBounds::full_image(width, height));

    if width < 2 || height < 2 {
        return fallback;
    }

    let labels = connected_components(ink, Connectivity::Eight, Luma([0u8]));
    let mut boxes: Vec<Option<ComponentBox>> = Vec::new();

    for (x, y, label) in labels.enumerate_pixels() {
        let label = label.0[0] as usize;
        if label == 0 || excluded.get_pixel_checked(x, y).is_some_and(|p| p.0[0] > 0) {
            continue;
        }
        if label >= boxes.len() {
            boxes.resize(label + 1, None);
        }
        let entry = boxes[label].get_or_insert(ComponentBox {
            min_x: x,
            max_x: x,
            min_y: y,
            max_y: y,
        });
        entry.min_x = entry.min_x.min(x);
        entry.max_x = entry.max_x.max(x);
        entry.min_y = entry.min_y.min(y);
        entry.max_y = entry.max_y.max(y);
    }

    let Some(largest) = boxes.into_iter().flatten().max_by_key(ComponentBox::area) else {
        return fallback;
    };

    let region_width = largest.max_x - largest.min_x + 1;
    let region_height = largest.max_y - largest.min_y + 1;
    if (region_width as f32) < min_fraction * width as f32
        || (region_height as f32) < min_fraction * height as f32
    {
        debug!(
            "Largest ink region {}x{} is too small for a {}x{} image",
            region_width, region_height, width, height
        );
        return fallback;
    }

    match GraphBounds::new(largest.min_x, largest.max_x + 1, largest.min_y, largest.max_y + 1) {
        Some(bounds) => GraphRegion::Detected(bounds),
        None => fallback,
    }
}
